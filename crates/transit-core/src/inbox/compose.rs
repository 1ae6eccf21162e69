use crate::constants::inbox as text;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateNotification, NotificationType};

/// Controller-side "send notification" form, kept as raw text until submit.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeForm {
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
}

impl Default for ComposeForm {
    fn default() -> Self {
        Self {
            recipient_id: String::new(),
            title: String::new(),
            message: String::new(),
            notification_type: NotificationType::ControllerWarning,
        }
    }
}

impl ComposeForm {
    pub fn new(
        recipient_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            title: title.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = notification_type;
        self
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Build the request body, rejecting incomplete or malformed input.
    pub fn to_payload(&self, sender_id: i64) -> ApiResult<CreateNotification> {
        let recipient = self.recipient_id.trim();
        if recipient.is_empty() || self.title.trim().is_empty() || self.message.trim().is_empty() {
            return Err(ApiError::Validation(text::SEND_INCOMPLETE.to_string()));
        }
        let recipient_id = recipient
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ApiError::Validation("Recipient ID must be a positive number".to_string()))?;
        if !NotificationType::sendable().contains(&self.notification_type) {
            return Err(ApiError::Validation(format!(
                "{} notifications cannot be sent manually",
                self.notification_type.label()
            )));
        }

        let payload = CreateNotification {
            recipient_id,
            sender_id,
            title: self.title.trim().to_string(),
            message: self.message.trim().to_string(),
            notification_type: self.notification_type.clone(),
            metadata: None,
        };
        payload.validate()?;
        Ok(payload)
    }
}
