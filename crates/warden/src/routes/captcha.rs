//! Challenge endpoints: icon image serving and the action payload.

use axum::{
    extract::{Form, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::state::AppState;
use warden_common::constants::{LOGIN_FORM_KEY, headers as wire_headers};
use warden_common::{ImageRequest, Payload, SelectionResult, Theme, WardenError};

use super::{ApiError, issue_session_id, session_cookie, session_from_headers};

#[derive(Deserialize)]
pub struct ImageQuery {
    payload: String,
}

#[derive(Deserialize)]
pub struct PayloadForm {
    payload: String,
}

/// True when the request carries the AJAX marker header.
fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get(wire_headers::X_REQUESTED_WITH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case(wire_headers::XML_HTTP_REQUEST))
}

/// Serve one icon image of the session's challenge.
///
/// Plain browser navigation only: an AJAX-marked request is rejected,
/// the mirror image of the POST endpoint's requirement.
pub async fn icon_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ImageQuery>,
) -> Result<Response, ApiError> {
    if is_ajax(&headers) {
        return Err(WardenError::BadRequest.into());
    }
    let session_id = session_from_headers(&headers).ok_or(WardenError::NotFound)?;

    let request = ImageRequest::decode(&query.payload)?;
    let image = state
        .challenges
        .icon_image(&session_id, LOGIN_FORM_KEY, request.challenge_id, request.position)
        .await?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], image).into_response())
}

/// Dispatch a POST action payload.
pub async fn captcha_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PayloadForm>,
) -> Result<Response, ApiError> {
    if !is_ajax(&headers) {
        return Err(WardenError::BadRequest.into());
    }

    match Payload::decode(&form.payload)? {
        Payload::RequestData { widget, theme } => {
            // First contact may arrive without a session; issue one
            let (session_id, issued) = match session_from_headers(&headers) {
                Some(existing) => (existing, false),
                None => (issue_session_id(), true),
            };

            let theme = Theme::from_name(theme.as_deref().unwrap_or("light"));
            let descriptor = state
                .challenges
                .create_challenge(&session_id, LOGIN_FORM_KEY, theme)
                .await?;
            tracing::debug!(widget, challenge_id = descriptor.challenge_id, "Challenge data served");

            let mut response =
                ([(header::CONTENT_TYPE, "text/plain")], descriptor.encode()).into_response();
            if issued {
                let cookie = HeaderValue::from_str(&session_cookie(&session_id))
                    .map_err(|_| WardenError::Internal("invalid session cookie".into()))?;
                response.headers_mut().insert(header::SET_COOKIE, cookie);
            }
            Ok(response)
        }

        Payload::SubmitSelection {
            challenge_id,
            position,
        } => {
            let session_id = session_from_headers(&headers).ok_or(WardenError::NotFound)?;
            let success = state
                .challenges
                .submit_selection(&session_id, LOGIN_FORM_KEY, challenge_id, position)
                .await?;

            Ok((
                [(header::CONTENT_TYPE, "text/plain")],
                SelectionResult { success }.encode(),
            )
                .into_response())
        }

        Payload::ExpireNotice { challenge_id } => {
            // Always 200: the notice is advisory and idempotent
            if let Some(session_id) = session_from_headers(&headers) {
                state
                    .challenges
                    .invalidate(&session_id, LOGIN_FORM_KEY, challenge_id)
                    .await?;
            }
            Ok(StatusCode::OK.into_response())
        }
    }
}
