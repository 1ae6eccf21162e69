//! Application-wide constants
//!
//! Centralized location for user-facing strings and default values
//! that are used across multiple modules.

/// Default API base URL (version prefix included)
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Notifications fetched per inbox page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Seconds between unread-count refreshes in the navbar badge
pub const BADGE_POLL_INTERVAL_SECS: u64 = 30;

pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Route preselected in the validator
pub const DEFAULT_ROUTE_ID: i64 = 1;

// Validator messages
pub mod validator {
    pub const EMPTY_CODE: &str = "Please enter or scan a QR code";
    pub const NOT_SIGNED_IN: &str = "You must be logged in to validate tickets";
    pub const VALIDATE_FAILED: &str = "Failed to validate ticket";
    pub const IN_PROGRESS: &str = "A ticket is already being validated";
    pub const LOOKUP_FAILED: &str = "Failed to load ticket";
    pub const CAMERA_UNAVAILABLE: &str = "Camera access denied or not available";
}

// Inbox notices
pub mod inbox {
    pub const LOAD_FAILED: &str = "Failed to load notifications";
    pub const MARK_READ_OK: &str = "Notification marked as read";
    pub const MARK_READ_FAILED: &str = "Failed to mark notification as read";
    pub const MARK_ALL_OK: &str = "All notifications marked as read";
    pub const MARK_ALL_FAILED: &str = "Failed to mark all as read";
    pub const DELETE_OK: &str = "Notification deleted";
    pub const DELETE_FAILED: &str = "Failed to delete notification";
    pub const SEND_OK: &str = "Notification sent successfully";
    pub const SEND_FAILED: &str = "Failed to send notification";
    pub const SEND_INCOMPLETE: &str = "Please fill in all fields";
    pub const SEND_FORBIDDEN: &str = "Only controllers can send notifications";
}
