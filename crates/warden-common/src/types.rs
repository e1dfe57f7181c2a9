//! Core types shared across Warden components.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a challenge.
///
/// Transitions are monotonic: a challenge never returns to `Pending`.
///
/// - `Pending`: issued, awaiting a selection
/// - `Solved`: correct position submitted
/// - `Failed`: wrong position submitted
/// - `Invalidated`: explicitly terminated by the client (expire-notice)
/// - `Expired`: outlived its TTL before being solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeState {
    Pending,
    Solved,
    Failed,
    Invalidated,
    Expired,
}

impl ChallengeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Solved => "solved",
            Self::Failed => "failed",
            Self::Invalidated => "invalidated",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "solved" => Some(Self::Solved),
            "failed" => Some(Self::Failed),
            "invalidated" => Some(Self::Invalidated),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Returns true once no further scoring transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Visual asset set a challenge is rendered with.
///
/// Presentational only: never affects which icons are picked or where
/// the least-frequent one lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Resolve a client-supplied theme name, falling back to `Light`
    /// for anything unknown.
    pub fn from_name(name: &str) -> Self {
        match name {
            "dark" => Self::Dark,
            _ => Self::Light,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Public view of a freshly created challenge, sent to the client.
///
/// Carries the per-position icon content hashes but never the correct
/// position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeDescriptor {
    /// Challenge id, referenced as `i` in subsequent payloads
    pub challenge_id: u32,

    /// Theme the icons are rendered with
    pub theme: Theme,

    /// Base64 SHA-256 of each position's rendered image, in display order
    pub icon_hashes: Vec<String>,
}

/// Result of recording a selection, sent back to the client.
///
/// Safe to disclose: it never narrows down the correct position beyond
/// what the single submitted guess already revealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResult {
    pub success: bool,
}

/// Outcome reported by the external credential backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted
    Accepted,
    /// Credentials rejected
    Rejected,
    /// Account is banned; surfaced verbatim to the user
    Banned {
        reason: String,
        /// Unix timestamp the ban lifts, if temporary
        until: Option<i64>,
    },
}

/// Format a ban for display, including the lift time when present.
pub fn banned_message(reason: &str, until: Option<i64>) -> String {
    match until.and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)) {
        Some(when) => format!("Banned until {}: {reason}", when.format("%Y-%m-%d %H:%M:%S UTC")),
        None => format!("Banned: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_str() {
        for state in [
            ChallengeState::Pending,
            ChallengeState::Solved,
            ChallengeState::Failed,
            ChallengeState::Invalidated,
            ChallengeState::Expired,
        ] {
            assert_eq!(ChallengeState::parse(state.as_str()), Some(state));
        }
        assert_eq!(ChallengeState::parse("unknown"), None);
    }

    #[test]
    fn test_only_pending_is_non_terminal() {
        assert!(!ChallengeState::Pending.is_terminal());
        assert!(ChallengeState::Solved.is_terminal());
        assert!(ChallengeState::Expired.is_terminal());
    }

    #[test]
    fn test_theme_falls_back_to_light() {
        assert_eq!(Theme::from_name("dark"), Theme::Dark);
        assert_eq!(Theme::from_name("light"), Theme::Light);
        assert_eq!(Theme::from_name("neon"), Theme::Light);
        assert_eq!(Theme::from_name(""), Theme::Light);
    }

    #[test]
    fn test_banned_message_formats() {
        assert_eq!(banned_message("spam", None), "Banned: spam");
        let msg = banned_message("spam", Some(0));
        assert_eq!(msg, "Banned until 1970-01-01 00:00:00 UTC: spam");
    }
}
