//! Payload builders for the widget's requests, and decoders for the
//! server's plain-text responses. Thin wrappers over the shared codec
//! so the embedding UI never touches the envelope format directly.

use warden_common::error::Result;
use warden_common::{ChallengeDescriptor, ImageRequest, Payload, SelectionResult, Theme};

/// Action-1 payload: request fresh challenge data for a widget instance.
pub fn challenge_request(widget: u32, theme: Theme) -> String {
    Payload::RequestData {
        widget,
        theme: Some(theme.name().to_string()),
    }
    .encode()
}

/// Action-2 payload: submit the selected position.
pub fn selection_submission(challenge_id: u32, position: u8) -> String {
    Payload::SubmitSelection {
        challenge_id,
        position,
    }
    .encode()
}

/// Action-3 payload: report an interaction timeout.
pub fn expire_notice(challenge_id: u32) -> String {
    Payload::ExpireNotice { challenge_id }.encode()
}

/// GET payload for one icon image.
pub fn image_request(challenge_id: u32, position: u8) -> String {
    ImageRequest {
        challenge_id,
        position,
    }
    .encode()
}

/// Decode an action-1 response body.
pub fn parse_descriptor(body: &str) -> Result<ChallengeDescriptor> {
    ChallengeDescriptor::decode(body)
}

/// Decode an action-2 response body.
pub fn parse_selection_result(body: &str) -> Result<SelectionResult> {
    SelectionResult::decode(body)
}
