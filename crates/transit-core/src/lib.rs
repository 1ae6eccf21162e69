pub mod api;
pub mod badge;
pub mod config;
pub mod constants;
pub mod error;
pub mod inbox;
pub mod models;
pub mod notices;
pub mod scanner;
pub mod secure_storage;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the types most callers need at crate root
pub use api::{HttpTransport, NotificationApi, NotificationGateway, TicketApi, TicketGateway};
pub use badge::{BadgePoller, UnreadBadge};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult, ErrorKind};
pub use inbox::{ComposeForm, InboxController, InboxState};
pub use scanner::{ValidatorFlow, ValidatorState};
pub use session::{Identity, Role, Session, SessionStore};
