//! Challenge generation, storage, and scoring.

mod generator;
mod service;
mod store;

pub use generator::IconGenerator;
pub use service::ChallengeService;
pub use store::{CasOutcome, ChallengeStore, MemoryStore, RedisStore, challenge_key, expiry_worker};

use serde::{Deserialize, Serialize};
use warden_common::{ChallengeState, Theme};

/// Server-held challenge state, one per (session, form).
///
/// `correct_position` and `noise_seeds` never leave the store; the
/// client only ever sees rendered images and their content hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChallenge {
    /// Opaque id the client references as `i`
    pub id: u32,
    /// Theme the icons are rendered with (presentational only)
    pub theme: Theme,
    /// Icon identifier per display slot
    pub icons: Vec<String>,
    /// Position of the least-frequent icon
    pub correct_position: u8,
    /// Per-position render jitter, so identical icons differ byte-wise
    pub noise_seeds: Vec<u64>,
    /// Creation timestamp (Unix epoch seconds)
    pub issued_at: i64,
    /// Lifecycle state
    pub state: ChallengeState,
}

impl StoredChallenge {
    /// True once the challenge has outlived its TTL, measured from issue time.
    pub fn is_expired(&self, ttl_secs: u64, now: i64) -> bool {
        now.saturating_sub(self.issued_at) >= ttl_secs as i64
    }
}
