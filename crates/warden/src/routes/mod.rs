//! HTTP route handlers for Warden.

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use warden_common::WardenError;

mod captcha;
mod health;
mod login;
mod session;

pub use session::{issue_session_id, session_cookie, session_from_headers};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // Challenge endpoints: GET serves icon images, POST carries the
        // action payload (request data / submit selection / expire)
        .route(
            "/captcha",
            get(captcha::icon_image).post(captcha::captcha_action),
        )

        // Final credential submission, gated on a consumed challenge
        .route("/login", get(login::submit_credentials))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP-facing error wrapper.
///
/// Every client-caused failure collapses into a bare status line:
/// malformed payloads, unknown challenges, and foreign challenges are
/// all the same 400, so responses cannot be used as an existence
/// oracle. Only backend-reported ban/rate-limit states carry a body.
pub struct ApiError(pub WardenError);

impl From<WardenError> for ApiError {
    fn from(err: WardenError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match self.0 {
            WardenError::Banned(message) | WardenError::RateLimited(message) => {
                (status, message).into_response()
            }
            err => {
                tracing::debug!(error = %err, status = status.as_u16(), "Request rejected");
                status.into_response()
            }
        }
    }
}
