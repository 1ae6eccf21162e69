pub mod notifications;
pub mod tickets;
pub mod transport;

pub use notifications::{NotificationApi, NotificationGateway};
pub use tickets::{TicketApi, TicketGateway};
pub use transport::HttpTransport;
