pub mod notification;
pub mod page;
pub mod ticket;

pub use notification::{
    CreateNotification, Notification, NotificationStatus, NotificationType, Tone,
};
pub use page::Page;
pub use ticket::{Ticket, ValidateTicket, ValidationOutcome};
