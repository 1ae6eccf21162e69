//! Ticket validator flow (controller scanner screen)
//!
//! A code typed by hand or decoded from the camera is submitted to the
//! ticket service together with the selected route and the signed-in
//! controller. Blank input and a missing identity are rejected locally
//! without any request.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::TicketApi;
use crate::constants::validator as text;
use crate::constants::DEFAULT_ROUTE_ID;
use crate::error::{ApiError, ApiResult};
use crate::models::{Ticket, ValidationOutcome};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorState {
    pub code: String,
    pub route_id: i64,
    pub loading: bool,
    pub result: Option<ValidationOutcome>,
    pub error: Option<String>,
    pub camera_open: bool,
}

impl Default for ValidatorState {
    fn default() -> Self {
        Self {
            code: String::new(),
            route_id: DEFAULT_ROUTE_ID,
            loading: false,
            result: None,
            error: None,
            camera_open: false,
        }
    }
}

#[derive(Default)]
struct Inner {
    state: ValidatorState,
    closed: bool,
}

pub struct ValidatorFlow<T: TicketApi> {
    api: Arc<T>,
    session: Option<Session>,
    inner: Arc<Mutex<Inner>>,
}

impl<T: TicketApi> Clone for ValidatorFlow<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            session: self.session.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T: TicketApi> ValidatorFlow<T> {
    /// `session` is `None` when nobody is signed in; submits are then refused.
    pub fn new(api: Arc<T>, session: Option<Session>) -> Self {
        Self {
            api,
            session,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn snapshot(&self) -> ValidatorState {
        self.inner.lock().state.clone()
    }

    pub fn set_code(&self, code: impl Into<String>) {
        self.inner.lock().state.code = code.into();
    }

    pub fn set_route_id(&self, route_id: i64) {
        self.inner.lock().state.route_id = route_id;
    }

    pub fn open_camera(&self) {
        let mut inner = self.inner.lock();
        inner.state.camera_open = true;
        inner.state.error = None;
    }

    pub fn close_camera(&self) {
        self.inner.lock().state.camera_open = false;
    }

    pub fn on_camera_error(&self) {
        let mut inner = self.inner.lock();
        inner.state.camera_open = false;
        inner.state.error = Some(text::CAMERA_UNAVAILABLE.to_string());
    }

    /// Clear the code and any previous outcome; the route stays selected.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let route_id = inner.state.route_id;
        inner.state = ValidatorState {
            route_id,
            ..ValidatorState::default()
        };
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.state.loading = false;
    }

    /// A decoded QR payload behaves exactly like typing it and pressing validate.
    pub async fn on_camera_decoded(&self, text: &str) -> ApiResult<ValidationOutcome> {
        self.submit(text).await
    }

    /// Submit whatever is currently in the code field.
    pub async fn submit_current(&self) -> ApiResult<ValidationOutcome> {
        let code = self.inner.lock().state.code.clone();
        self.submit(&code).await
    }

    pub async fn submit(&self, code: &str) -> ApiResult<ValidationOutcome> {
        let (trimmed, route_id, session) = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(ApiError::Validation("Validator is closed".to_string()));
            }
            let state = &mut inner.state;
            // One validation at a time; the pending one keeps its code and state
            if state.loading {
                return Err(ApiError::Validation(text::IN_PROGRESS.to_string()));
            }
            state.code = code.to_string();

            let trimmed = code.trim().to_string();
            if trimmed.is_empty() {
                state.error = Some(text::EMPTY_CODE.to_string());
                return Err(ApiError::Validation(text::EMPTY_CODE.to_string()));
            }
            let Some(session) = &self.session else {
                state.error = Some(text::NOT_SIGNED_IN.to_string());
                return Err(ApiError::Validation(text::NOT_SIGNED_IN.to_string()));
            };

            state.result = None;
            state.error = None;
            state.loading = true;
            (trimmed, state.route_id, session)
        };

        let controller_id = session.user_id();
        debug!(route_id, controller_id, "validating ticket");
        let result = self
            .api
            .validate(session, &trimmed, route_id, controller_id)
            .await;

        let mut inner = self.inner.lock();
        if inner.closed {
            return result;
        }
        let state = &mut inner.state;
        state.loading = false;
        match &result {
            Ok(outcome) => {
                info!(valid = outcome.valid, "ticket validated");
                state.result = Some(outcome.clone());
                state.camera_open = false;
            }
            Err(err) => {
                warn!(error = %err, "ticket validation failed");
                state.error = Some(err.message_or(text::VALIDATE_FAILED));
            }
        }
        result
    }

    /// Look a ticket up by QR code without validating it.
    pub async fn lookup(&self, code: &str) -> ApiResult<Ticket> {
        let Some(session) = &self.session else {
            return Err(ApiError::Validation(text::NOT_SIGNED_IN.to_string()));
        };
        let result = self.api.by_qr_code(session, code).await;
        if let Err(err) = &result {
            warn!(error = %err, "{}", text::LOOKUP_FAILED);
        }
        result
    }
}
