//! Notification inbox controller
//!
//! Owns the paginated notification list plus the page-local unread count and
//! reconciles both after every gateway call. Mutations (read, read-all,
//! delete) are optimistic: the local change is applied before the request
//! is issued and is not rolled back when the request fails; the failure
//! surfaces as an error notice instead.
//!
//! All state changes happen synchronously before an operation's first await
//! point, so anything polling the operation once already observes them.

pub mod compose;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::NotificationApi;
use crate::constants::inbox as text;
use crate::error::{ApiError, ApiResult};
use crate::models::Notification;
use crate::notices::{Notice, NoticeQueue};
use crate::session::Session;

pub use compose::ComposeForm;

/// Render-ready inbox state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxState {
    /// Server page order, pages concatenated
    pub items: Vec<Notification>,
    /// Highest page successfully loaded (zero-based)
    pub page: u32,
    pub has_more: bool,
    /// Set from the server or adjusted locally; never recomputed from `items`
    pub unread_count: u64,
    pub loading: bool,
    pub error: Option<String>,
    pub sending: bool,
}

impl InboxState {
    pub fn get(&self, id: i64) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn ids(&self) -> Vec<i64> {
        self.items.iter().map(|n| n.id).collect()
    }

    pub fn local_unread(&self) -> usize {
        self.items.iter().filter(|n| n.is_unread()).count()
    }

    /// Header line, e.g. "1 unread notification" / "3 unread notifications"
    pub fn unread_summary(&self) -> String {
        let n = self.unread_count;
        format!("{} unread notification{}", n, if n == 1 { "" } else { "s" })
    }

    /// "Load more" is offered only when another page exists and nothing is loading
    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.loading
    }
}

#[derive(Default)]
struct Inner {
    state: InboxState,
    /// Pages with a list request outstanding
    in_flight: HashSet<u32>,
    /// Bumped on every reload from page 0; responses from older generations are dropped
    generation: u64,
    closed: bool,
}

impl Inner {
    fn finish_load(&mut self, page: u32) {
        self.in_flight.remove(&page);
        self.state.loading = !self.in_flight.is_empty();
    }
}

pub struct InboxController<A: NotificationApi> {
    api: Arc<A>,
    session: Session,
    page_size: u32,
    inner: Arc<Mutex<Inner>>,
    notices: Arc<Mutex<NoticeQueue>>,
}

impl<A: NotificationApi> Clone for InboxController<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            session: self.session.clone(),
            page_size: self.page_size,
            inner: self.inner.clone(),
            notices: self.notices.clone(),
        }
    }
}

impl<A: NotificationApi> InboxController<A> {
    pub fn new(api: Arc<A>, session: Session, page_size: u32) -> Self {
        Self {
            api,
            session,
            page_size: page_size.max(1),
            inner: Arc::new(Mutex::new(Inner::default())),
            notices: Arc::new(Mutex::new(NoticeQueue::new())),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn recipient_id(&self) -> i64 {
        self.session.user_id()
    }

    // ===== Getters =====

    pub fn snapshot(&self) -> InboxState {
        self.inner.lock().state.clone()
    }

    pub fn unread_count(&self) -> u64 {
        self.inner.lock().state.unread_count
    }

    /// Take every pending toast, most important first.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.lock().drain()
    }

    pub fn dismiss_error(&self) {
        self.inner.lock().state.error = None;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Tear the view down. Responses that arrive afterwards are discarded.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.state.loading = false;
        inner.in_flight.clear();
        debug!("inbox closed");
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    // ===== Loading =====

    /// Fetch one page: page 0 replaces the list, later pages append.
    ///
    /// A load of a page that is already in flight is a no-op. On failure
    /// the existing items are kept and `error` is set.
    pub async fn load(&self, page: u32) -> ApiResult<()> {
        let generation = {
            let mut inner = self.inner.lock();
            if inner.closed || !inner.in_flight.insert(page) {
                debug!(page, "load skipped");
                return Ok(());
            }
            if page == 0 {
                inner.generation += 1;
            }
            inner.state.loading = true;
            inner.generation
        };

        let result = self
            .api
            .list(&self.session, self.recipient_id(), page, self.page_size)
            .await;

        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.finish_load(page);
        if inner.generation != generation {
            debug!(page, "dropping page from a superseded reload");
            return Ok(());
        }

        match result {
            Ok(response) => {
                let state = &mut inner.state;
                if page == 0 {
                    state.items = response.content;
                } else {
                    let known: HashSet<i64> = state.items.iter().map(|n| n.id).collect();
                    state
                        .items
                        .extend(response.content.into_iter().filter(|n| !known.contains(&n.id)));
                }
                state.page = page;
                state.has_more = !response.last;
                state.error = None;
                debug!(page, total = state.items.len(), has_more = state.has_more, "page loaded");
                Ok(())
            }
            Err(err) => {
                warn!(page, error = %err, "failed to load notifications");
                inner.state.error = Some(err.message_or(text::LOAD_FAILED));
                drop(inner);
                self.notify(Notice::error(text::LOAD_FAILED));
                Err(err)
            }
        }
    }

    /// Reload from the first page and refresh the unread count.
    pub async fn refresh(&self) -> ApiResult<()> {
        let (loaded, _) = futures::join!(self.load(0), self.refresh_count());
        loaded
    }

    /// Advance to the next page. Returns false (and does nothing) unless
    /// another page exists and no load is running.
    pub async fn load_more(&self) -> ApiResult<bool> {
        let next = {
            let inner = self.inner.lock();
            if inner.closed || !inner.state.can_load_more() {
                return Ok(false);
            }
            inner.state.page + 1
        };
        self.load(next).await.map(|_| true)
    }

    /// Secondary signal: a failure is logged and the previous count kept.
    pub async fn refresh_count(&self) -> Option<u64> {
        let result = self
            .api
            .unread_count(&self.session, self.recipient_id())
            .await;

        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        match result {
            Ok(count) => {
                inner.state.unread_count = count;
                Some(count)
            }
            Err(err) => {
                warn!(error = %err, "failed to load unread count");
                None
            }
        }
    }

    // ===== Mutations =====

    pub async fn mark_read(&self, id: i64) -> ApiResult<()> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Ok(());
            }
            let now = chrono::Local::now().naive_local();
            let state = &mut inner.state;
            let flipped = state
                .items
                .iter_mut()
                .find(|n| n.id == id)
                .map(|n| n.mark_read_at(now))
                .unwrap_or(false);
            if flipped {
                state.unread_count = state.unread_count.saturating_sub(1);
            }
        }

        let result = self
            .api
            .mark_read(&self.session, id, self.session.user_id())
            .await;

        let mut inner = self.inner.lock();
        if inner.closed {
            return result.map(|_| ());
        }
        match result {
            Ok(updated) => {
                if let Some(updated) = updated {
                    if let Some(entry) = inner.state.items.iter_mut().find(|n| n.id == id) {
                        *entry = updated;
                    }
                }
                drop(inner);
                self.notify(Notice::success(text::MARK_READ_OK));
                Ok(())
            }
            Err(err) => {
                drop(inner);
                warn!(id, error = %err, "mark as read failed; keeping local state");
                self.notify(Notice::error(text::MARK_READ_FAILED));
                Err(err)
            }
        }
    }

    pub async fn mark_all_read(&self) -> ApiResult<()> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Ok(());
            }
            let now = chrono::Local::now().naive_local();
            for item in inner.state.items.iter_mut() {
                item.mark_read_at(now);
            }
            inner.state.unread_count = 0;
        }

        let result = self
            .api
            .mark_all_read(&self.session, self.recipient_id())
            .await;
        self.report(result, text::MARK_ALL_OK, text::MARK_ALL_FAILED)
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Ok(());
            }
            let state = &mut inner.state;
            if let Some(pos) = state.items.iter().position(|n| n.id == id) {
                let removed = state.items.remove(pos);
                if removed.is_unread() {
                    state.unread_count = state.unread_count.saturating_sub(1);
                }
            }
        }

        let result = self
            .api
            .delete(&self.session, id, self.session.user_id())
            .await;
        self.report(result, text::DELETE_OK, text::DELETE_FAILED)
    }

    /// Send a notification to a passenger (controllers only).
    pub async fn send(&self, form: &ComposeForm) -> ApiResult<Notification> {
        if !self.session.role().can_send_notifications() {
            return Err(ApiError::Validation(text::SEND_FORBIDDEN.to_string()));
        }
        let payload = match form.to_payload(self.session.user_id()) {
            Ok(payload) => payload,
            Err(err) => {
                self.notify(Notice::error(err.user_message()));
                return Err(err);
            }
        };

        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(ApiError::Validation("Inbox is closed".to_string()));
            }
            if inner.state.sending {
                return Err(ApiError::Validation(
                    "A notification is already being sent".to_string(),
                ));
            }
            inner.state.sending = true;
        }

        let result = self.api.create(&self.session, &payload).await;

        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return result;
            }
            inner.state.sending = false;
        }

        match &result {
            Ok(created) => {
                debug!(id = created.id, "notification sent");
                self.notify(Notice::success(text::SEND_OK));
            }
            Err(err) => {
                warn!(error = %err, "send notification failed");
                self.notify(Notice::error(text::SEND_FAILED));
            }
        }
        result
    }

    /// Turn a mutation result into a notice (skipped after teardown).
    fn report(&self, result: ApiResult<()>, ok: &str, failed: &str) -> ApiResult<()> {
        if self.is_closed() {
            return result;
        }
        match &result {
            Ok(()) => self.notify(Notice::success(ok)),
            Err(err) => {
                warn!(error = %err, "{}", failed);
                self.notify(Notice::error(failed));
            }
        }
        result
    }
}
