use async_trait::async_trait;

use super::transport::HttpTransport;
use crate::error::{ApiError, ApiResult};
use crate::models::{Ticket, ValidateTicket, ValidationOutcome};
use crate::session::Session;

#[async_trait]
pub trait TicketApi: Send + Sync {
    async fn validate(
        &self,
        session: &Session,
        qr_code: &str,
        route_id: i64,
        controller_id: i64,
    ) -> ApiResult<ValidationOutcome>;

    async fn by_qr_code(&self, session: &Session, qr_code: &str) -> ApiResult<Ticket>;
}

/// HTTP implementation of [`TicketApi`].
#[derive(Debug, Clone)]
pub struct TicketGateway {
    transport: HttpTransport,
}

impl TicketGateway {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TicketApi for TicketGateway {
    async fn validate(
        &self,
        session: &Session,
        qr_code: &str,
        route_id: i64,
        controller_id: i64,
    ) -> ApiResult<ValidationOutcome> {
        let body = ValidateTicket {
            qr_code: qr_code.to_string(),
            route_id,
            controller_id,
            schedule_id: None,
        };
        self.transport
            .post_json(session, "tickets/validate", &body)
            .await
    }

    async fn by_qr_code(&self, session: &Session, qr_code: &str) -> ApiResult<Ticket> {
        let code = qr_code.trim();
        // The code is a single path segment
        if code.is_empty() || code.contains('/') {
            return Err(ApiError::Validation(format!("Invalid QR code: {:?}", qr_code)));
        }
        let path = format!("tickets/qr/{}", code);
        self.transport.get_json(session, &path, &[]).await
    }
}
