use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ApiError, ApiResult};

/// A notification as returned by the notification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub read_at: Option<NaiveDateTime>,
    /// Opaque JSON string attached by the producing service (ticket id, route id, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }

    /// Flip to READ, stamping `read_at` only on the first transition.
    /// Returns true when the status actually changed.
    pub fn mark_read_at(&mut self, at: NaiveDateTime) -> bool {
        if self.status == NotificationStatus::Read {
            return false;
        }
        self.status = NotificationStatus::Read;
        self.read_at = Some(at);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Unread,
    Read,
}

/// Notification category. Open-ended: values this client does not know are
/// kept verbatim in `Other` and round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationType {
    TicketValidationSuccess,
    TicketValidationFailed,
    TicketPurchased,
    SubscriptionActivated,
    TicketViolation,
    ControllerWarning,
    SystemAlert,
    PassengerReport,
    TicketReminder,
    Other(String),
}

/// Presentation tone of a notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Info,
}

impl Tone {
    pub fn icon(&self) -> &'static str {
        match self {
            Tone::Success => "✓",
            Tone::Error => "✗",
            Tone::Warning => "⚠",
            Tone::Info => "ℹ",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Tone::Success => "success",
            Tone::Error => "error",
            Tone::Warning => "warning",
            Tone::Info => "info",
        }
    }
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::TicketValidationSuccess => "TICKET_VALIDATION_SUCCESS",
            Self::TicketValidationFailed => "TICKET_VALIDATION_FAILED",
            Self::TicketPurchased => "TICKET_PURCHASED",
            Self::SubscriptionActivated => "SUBSCRIPTION_ACTIVATED",
            Self::TicketViolation => "TICKET_VIOLATION",
            Self::ControllerWarning => "CONTROLLER_WARNING",
            Self::SystemAlert => "SYSTEM_ALERT",
            Self::PassengerReport => "PASSENGER_REPORT",
            Self::TicketReminder => "TICKET_REMINDER",
            Self::Other(raw) => raw,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "TICKET_VALIDATION_SUCCESS" => Self::TicketValidationSuccess,
            "TICKET_VALIDATION_FAILED" => Self::TicketValidationFailed,
            "TICKET_PURCHASED" => Self::TicketPurchased,
            "SUBSCRIPTION_ACTIVATED" => Self::SubscriptionActivated,
            "TICKET_VIOLATION" => Self::TicketViolation,
            "CONTROLLER_WARNING" => Self::ControllerWarning,
            "SYSTEM_ALERT" => Self::SystemAlert,
            "PASSENGER_REPORT" => Self::PassengerReport,
            "TICKET_REMINDER" => Self::TicketReminder,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::TicketValidationSuccess | Self::TicketPurchased | Self::SubscriptionActivated => {
                Tone::Success
            }
            Self::TicketValidationFailed | Self::TicketViolation => Tone::Error,
            Self::ControllerWarning => Tone::Warning,
            _ => Tone::Info,
        }
    }

    pub fn icon(&self) -> &'static str {
        self.tone().icon()
    }

    /// Wire name with underscores shown as spaces ("CONTROLLER WARNING")
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Types a controller may pick when sending to a passenger
    pub fn sendable() -> [NotificationType; 3] {
        [
            Self::ControllerWarning,
            Self::TicketViolation,
            Self::SystemAlert,
        ]
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NotificationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NotificationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Body of `POST /notifications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotification {
    pub recipient_id: i64,
    pub sender_id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl CreateNotification {
    /// Every field is required; text fields must not be blank.
    pub fn validate(&self) -> ApiResult<()> {
        if self.recipient_id <= 0 {
            return Err(ApiError::Validation("Recipient ID is required".to_string()));
        }
        if self.sender_id <= 0 {
            return Err(ApiError::Validation("Sender ID is required".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("Title is required".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(ApiError::Validation("Message is required".to_string()));
        }
        if self.notification_type.as_str().trim().is_empty() {
            return Err(ApiError::Validation("Type is required".to_string()));
        }
        Ok(())
    }
}
