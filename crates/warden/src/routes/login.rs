//! Final credential submission, gated on a consumed challenge.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::state::AppState;
use warden_common::constants::LOGIN_FORM_KEY;
use warden_common::{LoginOutcome, WardenError, banned_message};

use super::{ApiError, session_from_headers};

#[derive(Deserialize)]
pub struct LoginQuery {
    username: String,
    password: String,
}

/// Validate a credential submission.
///
/// Two independent gates, both decided from server-held state: the
/// session's challenge must be consumable (Solved, unexpired, never
/// consumed before), and the external backend must accept the
/// credentials. Any store failure on the way denies the attempt.
pub async fn submit_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(credentials): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    let session_id = session_from_headers(&headers).ok_or(WardenError::NotFound)?;

    let authorized = state
        .challenges
        .authorize_credential_submission(&session_id, LOGIN_FORM_KEY)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Authorization check failed; denying");
            false
        });

    if !authorized {
        return Err(WardenError::NotFound.into());
    }

    match state
        .login_backend
        .authenticate(&credentials.username, &credentials.password)
    {
        LoginOutcome::Accepted => {
            tracing::info!(session_id = %session_id, "Login accepted");
            Ok(StatusCode::OK.into_response())
        }
        LoginOutcome::Rejected => Err(WardenError::BadRequest.into()),
        LoginOutcome::Banned { reason, until } => {
            Err(WardenError::Banned(banned_message(&reason, until)).into())
        }
    }
}
