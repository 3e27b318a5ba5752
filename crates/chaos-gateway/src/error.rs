//! Error types for the gateway.
//!
//! [`GatewayError`] is returned by every REST handler and renders as a
//! JSON body of the form `{"error": "...", "status": 404}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chaos_core::error::SessionError;

/// Errors surfaced to REST callers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The session rejected the command.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The control thread is not running.
    #[error("control loop unavailable")]
    Unavailable,
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Session(SessionError::UnknownEvent(_) | SessionError::NoSuchEvent { .. }) => {
                StatusCode::NOT_FOUND
            }
            Self::Session(SessionError::Ineligible(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Session(SessionError::NoSession) => StatusCode::CONFLICT,
            Self::Session(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}
