//! The client<->server payload envelope.
//!
//! A payload is a JSON object wrapped in base64, carrying a numeric
//! action code `a` and an id `i`, plus action-specific fields. Decoding
//! is all-or-nothing: any malformed base64, malformed JSON, missing
//! field, or wrong-typed field is `BadRequest`, with no detail leaked
//! about which check tripped.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WardenError};
use crate::types::{ChallengeDescriptor, SelectionResult};

/// A decoded POST action payload, one variant per action code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// `a=1` - request challenge data for a form widget instance
    RequestData {
        /// Client-side widget instance id (`i`); echoed in logs only,
        /// the server binds challenges to the session instead
        widget: u32,
        /// Requested theme name (`t`); unknown names fall back to light
        theme: Option<String>,
    },
    /// `a=2` - submit the selected position for a challenge
    SubmitSelection {
        /// Challenge id (`i`)
        challenge_id: u32,
        /// Selected position (`s`), zero-based
        position: u8,
    },
    /// `a=3` - client-reported interaction timeout; invalidate the challenge
    ExpireNotice {
        /// Challenge id (`i`)
        challenge_id: u32,
    },
}

/// A decoded GET image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Challenge id (`i`)
    pub challenge_id: u32,
    /// Icon position to fetch (`p`), zero-based
    pub position: u8,
}

/// Raw envelope fields; every field optional so presence checks happen
/// per action code, while a wrong-typed field still fails the whole decode.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    a: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    i: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    t: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    s: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p: Option<u8>,
}

fn decode_envelope(raw: &str) -> Result<RawEnvelope> {
    let bytes = STANDARD.decode(raw).map_err(|_| WardenError::BadRequest)?;
    serde_json::from_slice(&bytes).map_err(|_| WardenError::BadRequest)
}

fn encode_envelope(envelope: &RawEnvelope) -> String {
    // RawEnvelope always serializes; the panic path is unreachable
    let json = serde_json::to_vec(envelope).unwrap_or_default();
    STANDARD.encode(json)
}

impl Payload {
    /// Decode a POST action payload.
    pub fn decode(raw: &str) -> Result<Self> {
        let env = decode_envelope(raw)?;
        let id = env.i.ok_or(WardenError::BadRequest)?;

        match env.a {
            Some(1) => Ok(Self::RequestData {
                widget: id,
                theme: env.t,
            }),
            Some(2) => Ok(Self::SubmitSelection {
                challenge_id: id,
                position: env.s.ok_or(WardenError::BadRequest)?,
            }),
            Some(3) => Ok(Self::ExpireNotice { challenge_id: id }),
            _ => Err(WardenError::BadRequest),
        }
    }

    /// Encode this payload; inverse of [`Payload::decode`].
    pub fn encode(&self) -> String {
        let envelope = match self {
            Self::RequestData { widget, theme } => RawEnvelope {
                a: Some(1),
                i: Some(*widget),
                t: theme.clone(),
                ..Default::default()
            },
            Self::SubmitSelection {
                challenge_id,
                position,
            } => RawEnvelope {
                a: Some(2),
                i: Some(*challenge_id),
                s: Some(*position),
                ..Default::default()
            },
            Self::ExpireNotice { challenge_id } => RawEnvelope {
                a: Some(3),
                i: Some(*challenge_id),
                ..Default::default()
            },
        };
        encode_envelope(&envelope)
    }
}

impl ImageRequest {
    /// Decode a GET image payload.
    pub fn decode(raw: &str) -> Result<Self> {
        let env = decode_envelope(raw)?;
        Ok(Self {
            challenge_id: env.i.ok_or(WardenError::BadRequest)?,
            position: env.p.ok_or(WardenError::BadRequest)?,
        })
    }

    /// Encode this request; inverse of [`ImageRequest::decode`].
    pub fn encode(&self) -> String {
        encode_envelope(&RawEnvelope {
            i: Some(self.challenge_id),
            p: Some(self.position),
            ..Default::default()
        })
    }
}

impl ChallengeDescriptor {
    /// Encode the descriptor the way action-1 responses are transported:
    /// base64 over JSON, as plain text.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// Decode an action-1 response body.
    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = STANDARD.decode(raw).map_err(|_| WardenError::BadRequest)?;
        serde_json::from_slice(&bytes).map_err(|_| WardenError::BadRequest)
    }
}

impl SelectionResult {
    /// Encode an action-2 response body.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// Decode an action-2 response body.
    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = STANDARD.decode(raw).map_err(|_| WardenError::BadRequest)?;
        serde_json::from_slice(&bytes).map_err(|_| WardenError::BadRequest)
    }
}
