//! Per-session challenge persistence.
//!
//! Two backends behind one dispatch type: Redis for production and a
//! DashMap store for tests and single-node deployments. Both expose the
//! same atomic primitives: compare-and-set on the lifecycle state and a
//! take-if-state removal for one-shot consumption, so concurrent
//! duplicate submissions can never double-score a challenge.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use warden_common::error::{Result, WardenError};
use warden_common::{ChallengeState, constants::store_keys::CHALLENGE_PREFIX};

use super::StoredChallenge;

/// Result of a compare-and-set on a challenge's state.
#[derive(Debug, Clone)]
pub enum CasOutcome {
    /// No challenge stored under the key
    Missing,
    /// The state matched and was swapped; the challenge as it now stands
    Swapped(StoredChallenge),
    /// The state had already moved on; the challenge as it stands
    Conflict(StoredChallenge),
}

/// Store key for a session's challenge on a given form.
pub fn challenge_key(session_id: &str, form_key: &str) -> String {
    format!("{CHALLENGE_PREFIX}{session_id}:{form_key}")
}

/// Challenge store dispatch.
#[derive(Clone)]
pub enum ChallengeStore {
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl ChallengeStore {
    /// Connect the Redis backend (auto-reconnecting connection manager).
    pub async fn connect_redis(url: &str, ttl_secs: u64) -> Result<Self> {
        let client =
            redis::Client::open(url).map_err(|e| WardenError::Store(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| WardenError::Store(e.to_string()))?;
        Ok(Self::Redis(RedisStore {
            redis: manager,
            ttl_secs,
        }))
    }

    /// In-process backend, swept by [`expiry_worker`].
    pub fn memory(ttl_secs: u64) -> Self {
        Self::Memory(MemoryStore {
            entries: Arc::new(DashMap::new()),
            ttl_secs,
        })
    }

    /// Store a challenge, replacing (and thereby invalidating) whatever
    /// the session previously held under this key.
    pub async fn put(&self, key: &str, challenge: &StoredChallenge) -> Result<()> {
        match self {
            Self::Redis(store) => store.put(key, challenge).await,
            Self::Memory(store) => store.put(key, challenge),
        }
    }

    /// Load the session's challenge, if any.
    pub async fn load(&self, key: &str) -> Result<Option<StoredChallenge>> {
        match self {
            Self::Redis(store) => store.load(key).await,
            Self::Memory(store) => Ok(store.load(key)),
        }
    }

    /// Atomically swap `from -> to` on the stored state.
    pub async fn transition(
        &self,
        key: &str,
        from: ChallengeState,
        to: ChallengeState,
    ) -> Result<CasOutcome> {
        match self {
            Self::Redis(store) => store.transition(key, from, to).await,
            Self::Memory(store) => Ok(store.transition(key, from, to)),
        }
    }

    /// Atomically remove and return the challenge iff it is in `state`.
    /// This is the one-shot consumption primitive: of any number of
    /// concurrent callers, at most one gets the challenge back.
    pub async fn take_if(
        &self,
        key: &str,
        state: ChallengeState,
    ) -> Result<Option<StoredChallenge>> {
        match self {
            Self::Redis(store) => store.take_if(key, state).await,
            Self::Memory(store) => Ok(store.take_if(key, state)),
        }
    }

    /// Drop the session's challenge outright. Idempotent.
    pub async fn remove(&self, key: &str) -> Result<()> {
        match self {
            Self::Redis(store) => store.remove(key).await,
            Self::Memory(store) => {
                store.remove(key);
                Ok(())
            }
        }
    }

    /// Remove entries older than the TTL. Redis reaps via key expiry,
    /// so only the memory backend does work here.
    pub async fn sweep_expired(&self) -> Result<usize> {
        match self {
            Self::Redis(_) => Ok(0),
            Self::Memory(store) => Ok(store.sweep_expired()),
        }
    }

    /// Backend liveness, for the readiness endpoint.
    pub async fn ping(&self) -> bool {
        match self {
            Self::Redis(store) => store.ping().await,
            Self::Memory(_) => true,
        }
    }
}

/// Redis-backed store.
///
/// Each challenge is a HASH with a `data` field (serialized challenge)
/// and a separate `state` field, so state transitions can be
/// compare-and-set server-side in a Lua script without rewriting the
/// whole record. Key expiry handles TTL eviction.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
    ttl_secs: u64,
}

const TRANSITION_SCRIPT: &str = r#"
local s = redis.call('HGET', KEYS[1], 'state')
if not s then return nil end
if s == ARGV[1] then
  redis.call('HSET', KEYS[1], 'state', ARGV[2])
  return {1, ARGV[2], redis.call('HGET', KEYS[1], 'data')}
end
return {0, s, redis.call('HGET', KEYS[1], 'data')}
"#;

const TAKE_IF_SCRIPT: &str = r#"
local s = redis.call('HGET', KEYS[1], 'state')
if s == ARGV[1] then
  local d = redis.call('HGET', KEYS[1], 'data')
  redis.call('DEL', KEYS[1])
  return d
end
return false
"#;

impl RedisStore {
    async fn put(&self, key: &str, challenge: &StoredChallenge) -> Result<()> {
        let data =
            serde_json::to_string(challenge).map_err(|e| WardenError::Store(e.to_string()))?;
        let mut conn = self.redis.clone();

        redis::pipe()
            .atomic()
            .hset(key, "data", &data)
            .hset(key, "state", challenge.state.as_str())
            .expire(key, self.ttl_secs as i64)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| WardenError::Store(e.to_string()))?;

        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<StoredChallenge>> {
        let mut conn = self.redis.clone();
        let data: Option<String> = conn
            .hget(key, "data")
            .await
            .map_err(|e| WardenError::Store(e.to_string()))?;
        let state: Option<String> = conn
            .hget(key, "state")
            .await
            .map_err(|e| WardenError::Store(e.to_string()))?;

        match (data, state) {
            (Some(data), Some(state)) => Ok(Some(Self::rebuild(&data, &state)?)),
            _ => Ok(None),
        }
    }

    async fn transition(
        &self,
        key: &str,
        from: ChallengeState,
        to: ChallengeState,
    ) -> Result<CasOutcome> {
        let mut conn = self.redis.clone();
        let reply: Option<(u8, String, String)> = redis::Script::new(TRANSITION_SCRIPT)
            .key(key)
            .arg(from.as_str())
            .arg(to.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| WardenError::Store(e.to_string()))?;

        match reply {
            None => Ok(CasOutcome::Missing),
            Some((swapped, state, data)) => {
                let challenge = Self::rebuild(&data, &state)?;
                if swapped == 1 {
                    Ok(CasOutcome::Swapped(challenge))
                } else {
                    Ok(CasOutcome::Conflict(challenge))
                }
            }
        }
    }

    async fn take_if(
        &self,
        key: &str,
        state: ChallengeState,
    ) -> Result<Option<StoredChallenge>> {
        let mut conn = self.redis.clone();
        let data: Option<String> = redis::Script::new(TAKE_IF_SCRIPT)
            .key(key)
            .arg(state.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| WardenError::Store(e.to_string()))?;

        data.map(|d| Self::rebuild(&d, state.as_str())).transpose()
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| WardenError::Store(e.to_string()))?;
        Ok(())
    }

    async fn ping(&self) -> bool {
        let mut conn = self.redis.clone();
        let result: std::result::Result<String, _> =
            redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    /// Reassemble a challenge from the `data` field, with the separate
    /// `state` field authoritative.
    fn rebuild(data: &str, state: &str) -> Result<StoredChallenge> {
        let mut challenge: StoredChallenge =
            serde_json::from_str(data).map_err(|e| WardenError::Store(e.to_string()))?;
        challenge.state = ChallengeState::parse(state)
            .ok_or_else(|| WardenError::Store(format!("unknown stored state: {state}")))?;
        Ok(challenge)
    }
}

/// In-process store. Entry-level locking in the map makes the
/// read-modify-write in [`MemoryStore::transition`] atomic per key.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, StoredChallenge>>,
    ttl_secs: u64,
}

impl MemoryStore {
    fn put(&self, key: &str, challenge: &StoredChallenge) -> Result<()> {
        self.entries.insert(key.to_string(), challenge.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> Option<StoredChallenge> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    fn transition(&self, key: &str, from: ChallengeState, to: ChallengeState) -> CasOutcome {
        match self.entries.get_mut(key) {
            None => CasOutcome::Missing,
            Some(mut entry) => {
                if entry.state == from {
                    entry.state = to;
                    CasOutcome::Swapped(entry.clone())
                } else {
                    CasOutcome::Conflict(entry.clone())
                }
            }
        }
    }

    fn take_if(&self, key: &str, state: ChallengeState) -> Option<StoredChallenge> {
        self.entries
            .remove_if(key, |_, challenge| challenge.state == state)
            .map(|(_, challenge)| challenge)
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn sweep_expired(&self) -> usize {
        let now = chrono::Utc::now().timestamp();
        let before = self.entries.len();
        self.entries
            .retain(|_, challenge| !challenge.is_expired(self.ttl_secs, now));
        before - self.entries.len()
    }
}

/// Background sweep for the memory backend: periodically evicts
/// challenges past their TTL so abandoned sessions do not accumulate.
pub async fn expiry_worker(
    store: ChallengeStore,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Expiry sweep worker started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                match store.sweep_expired().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "Swept expired challenges"),
                    Err(e) => tracing::error!(error = %e, "Expiry sweep error"),
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Expiry sweep worker shutting down...");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_common::Theme;

    fn sample_challenge(id: u32, issued_at: i64) -> StoredChallenge {
        StoredChallenge {
            id,
            theme: Theme::Light,
            icons: vec!["bell".into(), "star".into(), "star".into()],
            correct_position: 0,
            noise_seeds: vec![1, 2, 3],
            issued_at,
            state: ChallengeState::Pending,
        }
    }

    #[tokio::test]
    async fn test_put_then_load() {
        let store = ChallengeStore::memory(60);
        let challenge = sample_challenge(1, chrono::Utc::now().timestamp());

        store.put("challenge:s1:login", &challenge).await.unwrap();
        let loaded = store.load("challenge:s1:login").await.unwrap().unwrap();
        assert_eq!(loaded.id, 1);
        assert_eq!(loaded.state, ChallengeState::Pending);

        assert!(store.load("challenge:s2:login").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_previous_challenge() {
        let store = ChallengeStore::memory(60);
        let now = chrono::Utc::now().timestamp();

        store.put("k", &sample_challenge(1, now)).await.unwrap();
        store.put("k", &sample_challenge(2, now)).await.unwrap();

        assert_eq!(store.load("k").await.unwrap().unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_transition_swaps_once() {
        let store = ChallengeStore::memory(60);
        let challenge = sample_challenge(1, chrono::Utc::now().timestamp());
        store.put("k", &challenge).await.unwrap();

        let first = store
            .transition("k", ChallengeState::Pending, ChallengeState::Solved)
            .await
            .unwrap();
        assert!(matches!(first, CasOutcome::Swapped(ref c) if c.state == ChallengeState::Solved));

        // Second CAS from Pending observes the terminal state instead
        let second = store
            .transition("k", ChallengeState::Pending, ChallengeState::Failed)
            .await
            .unwrap();
        assert!(matches!(second, CasOutcome::Conflict(ref c) if c.state == ChallengeState::Solved));

        let missing = store
            .transition("absent", ChallengeState::Pending, ChallengeState::Solved)
            .await
            .unwrap();
        assert!(matches!(missing, CasOutcome::Missing));
    }

    #[tokio::test]
    async fn test_take_if_consumes_exactly_once() {
        let store = ChallengeStore::memory(60);
        let mut challenge = sample_challenge(1, chrono::Utc::now().timestamp());
        challenge.state = ChallengeState::Solved;
        store.put("k", &challenge).await.unwrap();

        let taken = store.take_if("k", ChallengeState::Solved).await.unwrap();
        assert!(taken.is_some());

        // Gone; a replay gets nothing
        assert!(store.take_if("k", ChallengeState::Solved).await.unwrap().is_none());
        assert!(store.load("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_take_if_leaves_mismatched_state_in_place() {
        let store = ChallengeStore::memory(60);
        let challenge = sample_challenge(1, chrono::Utc::now().timestamp());
        store.put("k", &challenge).await.unwrap();

        assert!(store.take_if("k", ChallengeState::Solved).await.unwrap().is_none());
        assert!(store.load("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_aged_entries() {
        let store = ChallengeStore::memory(60);
        let now = chrono::Utc::now().timestamp();

        store.put("old", &sample_challenge(1, now - 120)).await.unwrap();
        store.put("fresh", &sample_challenge(2, now)).await.unwrap();

        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert!(store.load("old").await.unwrap().is_none());
        assert!(store.load("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = ChallengeStore::memory(60);
        store
            .put("k", &sample_challenge(1, chrono::Utc::now().timestamp()))
            .await
            .unwrap();

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.load("k").await.unwrap().is_none());
    }
}
