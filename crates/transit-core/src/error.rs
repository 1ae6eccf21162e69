/// Failure half of every gateway call.
///
/// Gateways never retry; each variant reaches the calling controller which
/// decides whether to surface it or only log it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Rejected locally before any request was made
    #[error("{0}")]
    Validation(String),
    /// Missing token or a 401/403 response
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Http,
    Transport,
    Decode,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::Http { .. } => ErrorKind::Http,
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Text suitable for an inline banner: the server's own message when it sent one.
    pub fn user_message(&self) -> &str {
        match self {
            ApiError::Validation(message)
            | ApiError::Unauthorized(message)
            | ApiError::Transport(message)
            | ApiError::Decode(message)
            | ApiError::Http { message, .. } => message,
        }
    }

    /// Like [`user_message`](Self::user_message) but falls back when the
    /// message carries nothing useful. Transport and decode failures have no
    /// server message, so they always use the fallback.
    pub fn message_or(&self, fallback: &str) -> String {
        if matches!(self, ApiError::Transport(_) | ApiError::Decode(_)) {
            return fallback.to_string();
        }
        let message = self.user_message().trim();
        if message.is_empty() {
            fallback.to_string()
        } else {
            message.to_string()
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
