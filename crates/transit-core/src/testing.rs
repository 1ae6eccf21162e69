//! In-memory gateway fakes shared by the controller tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::api::{NotificationApi, TicketApi};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    CreateNotification, Notification, NotificationStatus, NotificationType, Page, Ticket,
    ValidationOutcome,
};
use crate::session::{Identity, Role, Session};

pub fn session(id: i64, role: Role) -> Session {
    Session::new(
        Identity {
            id,
            role,
            display_name: None,
        },
        "test-token",
    )
}

pub fn notification(id: i64, status: NotificationStatus) -> Notification {
    Notification {
        id,
        recipient_id: 42,
        sender_id: Some(5),
        title: format!("Notification {}", id),
        message: "body".to_string(),
        notification_type: NotificationType::SystemAlert,
        status,
        created_at: NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
        read_at: None,
        metadata: None,
    }
}

pub fn unread(id: i64) -> Notification {
    notification(id, NotificationStatus::Unread)
}

pub fn read(id: i64) -> Notification {
    notification(id, NotificationStatus::Read)
}

pub fn server_error(message: &str) -> ApiError {
    ApiError::Http {
        status: 500,
        message: message.to_string(),
    }
}

/// Holds calls open until [`Gate::release`] when armed.
#[derive(Default)]
pub struct Gate {
    armed: Mutex<Option<Arc<Notify>>>,
}

impl Gate {
    pub fn hold(&self) {
        *self.armed.lock() = Some(Arc::new(Notify::new()));
    }

    pub fn release(&self) {
        if let Some(notify) = self.armed.lock().take() {
            notify.notify_one();
        }
    }

    async fn pass(&self) {
        let notify = self.armed.lock().clone();
        if let Some(notify) = notify {
            notify.notified().await;
        }
    }
}

pub struct FakeNotifications {
    pub pages: Mutex<Vec<Vec<Notification>>>,
    pub count: Mutex<ApiResult<u64>>,
    pub fail_list: Mutex<Option<ApiError>>,
    pub fail_mutations: Mutex<Option<ApiError>>,
    pub calls: Mutex<Vec<String>>,
    pub count_calls: AtomicUsize,
    pub gate: Gate,
}

impl FakeNotifications {
    pub fn with_pages(pages: Vec<Vec<Notification>>) -> Self {
        Self {
            pages: Mutex::new(pages),
            count: Mutex::new(Ok(0)),
            fail_list: Mutex::new(None),
            fail_mutations: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            count_calls: AtomicUsize::new(0),
            gate: Gate::default(),
        }
    }

    pub fn set_count(&self, count: ApiResult<u64>) {
        *self.count.lock() = count;
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn mutation_result(&self) -> ApiResult<()> {
        match self.fail_mutations.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NotificationApi for FakeNotifications {
    async fn list(
        &self,
        _session: &Session,
        recipient_id: i64,
        page: u32,
        _size: u32,
    ) -> ApiResult<Page<Notification>> {
        self.record(format!("list {} {}", recipient_id, page));
        self.gate.pass().await;
        if let Some(err) = self.fail_list.lock().clone() {
            return Err(err);
        }
        let pages = self.pages.lock();
        let content = pages.get(page as usize).cloned().unwrap_or_default();
        let last = page as usize + 1 >= pages.len();
        Ok(Page::new(content, last))
    }

    async fn unread(&self, _session: &Session, _recipient_id: i64) -> ApiResult<Vec<Notification>> {
        let pages = self.pages.lock();
        Ok(pages.iter().flatten().filter(|n| n.is_unread()).cloned().collect())
    }

    async fn unread_count(&self, _session: &Session, _recipient_id: i64) -> ApiResult<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.count.lock().clone()
    }

    async fn mark_read(
        &self,
        _session: &Session,
        notification_id: i64,
        user_id: i64,
    ) -> ApiResult<Option<Notification>> {
        self.record(format!("mark_read {} {}", notification_id, user_id));
        self.gate.pass().await;
        self.mutation_result().map(|_| None)
    }

    async fn mark_all_read(&self, _session: &Session, recipient_id: i64) -> ApiResult<()> {
        self.record(format!("mark_all_read {}", recipient_id));
        self.gate.pass().await;
        self.mutation_result()
    }

    async fn delete(&self, _session: &Session, notification_id: i64, user_id: i64) -> ApiResult<()> {
        self.record(format!("delete {} {}", notification_id, user_id));
        self.gate.pass().await;
        self.mutation_result()
    }

    async fn create(
        &self,
        _session: &Session,
        payload: &CreateNotification,
    ) -> ApiResult<Notification> {
        self.record(format!("create {}", payload.recipient_id));
        self.gate.pass().await;
        self.mutation_result()?;
        let mut created = unread(1000);
        created.recipient_id = payload.recipient_id;
        created.sender_id = Some(payload.sender_id);
        created.title = payload.title.clone();
        created.message = payload.message.clone();
        created.notification_type = payload.notification_type.clone();
        Ok(created)
    }
}

pub struct FakeTickets {
    pub outcome: Mutex<ApiResult<ValidationOutcome>>,
    pub ticket: Mutex<ApiResult<Ticket>>,
    pub calls: Mutex<Vec<(String, i64, i64)>>,
    pub gate: Gate,
}

impl FakeTickets {
    pub fn returning(outcome: ApiResult<ValidationOutcome>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            ticket: Mutex::new(Err(ApiError::Http {
                status: 404,
                message: "Ticket not found".to_string(),
            })),
            calls: Mutex::new(Vec::new()),
            gate: Gate::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, i64, i64)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TicketApi for FakeTickets {
    async fn validate(
        &self,
        _session: &Session,
        qr_code: &str,
        route_id: i64,
        controller_id: i64,
    ) -> ApiResult<ValidationOutcome> {
        self.calls
            .lock()
            .push((qr_code.to_string(), route_id, controller_id));
        self.gate.pass().await;
        self.outcome.lock().clone()
    }

    async fn by_qr_code(&self, _session: &Session, _qr_code: &str) -> ApiResult<Ticket> {
        self.ticket.lock().clone()
    }
}

pub fn controller_session() -> Session {
    session(5, Role::Controller)
}

pub fn passenger_session() -> Session {
    session(42, Role::Passenger)
}
