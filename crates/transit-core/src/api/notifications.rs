use async_trait::async_trait;
use tracing::info;

use super::transport::HttpTransport;
use crate::error::ApiResult;
use crate::models::{CreateNotification, Notification, Page};
use crate::session::Session;

const NOTIFICATIONS: &str = "notifications";

/// Domain operations of the notification service.
///
/// Each call maps to exactly one HTTP request and reports its outcome as an
/// [`ApiResult`]; nothing is retried.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list(
        &self,
        session: &Session,
        recipient_id: i64,
        page: u32,
        size: u32,
    ) -> ApiResult<Page<Notification>>;

    async fn unread(&self, session: &Session, recipient_id: i64) -> ApiResult<Vec<Notification>>;

    async fn unread_count(&self, session: &Session, recipient_id: i64) -> ApiResult<u64>;

    /// The server may answer with the updated notification or an empty body.
    async fn mark_read(
        &self,
        session: &Session,
        notification_id: i64,
        user_id: i64,
    ) -> ApiResult<Option<Notification>>;

    async fn mark_all_read(&self, session: &Session, recipient_id: i64) -> ApiResult<()>;

    async fn delete(&self, session: &Session, notification_id: i64, user_id: i64) -> ApiResult<()>;

    async fn create(&self, session: &Session, payload: &CreateNotification)
        -> ApiResult<Notification>;
}

/// HTTP implementation of [`NotificationApi`].
#[derive(Debug, Clone)]
pub struct NotificationGateway {
    transport: HttpTransport,
}

impl NotificationGateway {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl NotificationApi for NotificationGateway {
    async fn list(
        &self,
        session: &Session,
        recipient_id: i64,
        page: u32,
        size: u32,
    ) -> ApiResult<Page<Notification>> {
        let path = format!("{}/recipient/{}", NOTIFICATIONS, recipient_id);
        let query = [("page", page.to_string()), ("size", size.to_string())];
        self.transport.get_json(session, &path, &query).await
    }

    async fn unread(&self, session: &Session, recipient_id: i64) -> ApiResult<Vec<Notification>> {
        let path = format!("{}/recipient/{}/unread", NOTIFICATIONS, recipient_id);
        self.transport.get_json(session, &path, &[]).await
    }

    async fn unread_count(&self, session: &Session, recipient_id: i64) -> ApiResult<u64> {
        let path = format!("{}/recipient/{}/unread/count", NOTIFICATIONS, recipient_id);
        self.transport.get_json(session, &path, &[]).await
    }

    async fn mark_read(
        &self,
        session: &Session,
        notification_id: i64,
        user_id: i64,
    ) -> ApiResult<Option<Notification>> {
        let path = format!("{}/{}/read", NOTIFICATIONS, notification_id);
        let query = [("userId", user_id.to_string())];
        self.transport.put_optional(session, &path, &query).await
    }

    async fn mark_all_read(&self, session: &Session, recipient_id: i64) -> ApiResult<()> {
        let path = format!("{}/recipient/{}/read-all", NOTIFICATIONS, recipient_id);
        self.transport.put_empty(session, &path, &[]).await
    }

    async fn delete(&self, session: &Session, notification_id: i64, user_id: i64) -> ApiResult<()> {
        let path = format!("{}/{}", NOTIFICATIONS, notification_id);
        let query = [("userId", user_id.to_string())];
        self.transport.delete(session, &path, &query).await
    }

    async fn create(
        &self,
        session: &Session,
        payload: &CreateNotification,
    ) -> ApiResult<Notification> {
        payload.validate()?;
        info!(
            recipient_id = payload.recipient_id,
            kind = %payload.notification_type,
            "sending notification"
        );
        self.transport.post_json(session, NOTIFICATIONS, payload).await
    }
}
