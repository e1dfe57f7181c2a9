//! Challenge lifecycle orchestration.
//!
//! Everything security-relevant is decided from server-held state: the
//! stored answer, the issue time, and the one-shot consumption flag.
//! Client-supplied fields only ever select which challenge to look at.

use rand::{Rng, rng};

use warden_common::error::{Result, WardenError};
use warden_common::{ChallengeDescriptor, ChallengeState, Theme};

use super::generator::IconGenerator;
use super::store::{CasOutcome, ChallengeStore, challenge_key};
use super::StoredChallenge;

/// Challenge service: creation, image serving, scoring, invalidation,
/// and login authorization.
#[derive(Clone)]
pub struct ChallengeService {
    store: ChallengeStore,
    generator: IconGenerator,
    ttl_secs: u64,
}

impl ChallengeService {
    pub fn new(store: ChallengeStore, ttl_secs: u64) -> Self {
        Self {
            store,
            generator: IconGenerator::new(),
            ttl_secs,
        }
    }

    /// Create a challenge for a session/form, replacing any previous one
    /// so a session never holds two concurrently valid challenges for
    /// the same form.
    ///
    /// Returns the public view: id plus per-position icon content
    /// hashes. The correct position stays server-side.
    pub async fn create_challenge(
        &self,
        session_id: &str,
        form_key: &str,
        theme: Theme,
    ) -> Result<ChallengeDescriptor> {
        let generated = self.generator.generate();

        let challenge = StoredChallenge {
            id: rng().random::<u32>(),
            theme,
            icons: generated.icons,
            correct_position: generated.correct_position,
            noise_seeds: generated.noise_seeds,
            issued_at: chrono::Utc::now().timestamp(),
            state: ChallengeState::Pending,
        };

        self.store
            .put(&challenge_key(session_id, form_key), &challenge)
            .await?;

        let icon_hashes = challenge
            .icons
            .iter()
            .zip(&challenge.noise_seeds)
            .map(|(icon, seed)| {
                let image = self.generator.render_icon(icon, theme, *seed);
                self.generator.icon_hash(&image)
            })
            .collect();

        tracing::debug!(
            challenge_id = challenge.id,
            session_id = %session_id,
            form_key = %form_key,
            theme = ?theme,
            "Created challenge"
        );

        Ok(ChallengeDescriptor {
            challenge_id: challenge.id,
            theme,
            icon_hashes,
        })
    }

    /// Raw image bytes for one position of the session's challenge.
    ///
    /// All positions render into the same size class, so neither length
    /// nor error shape hints at the answer.
    pub async fn icon_image(
        &self,
        session_id: &str,
        form_key: &str,
        challenge_id: u32,
        position: u8,
    ) -> Result<Vec<u8>> {
        let challenge = self.owned_challenge(session_id, form_key, challenge_id).await?;

        let slot = position as usize;
        if slot >= challenge.icons.len() {
            return Err(WardenError::BadRequest);
        }

        Ok(self.generator.render_icon(
            &challenge.icons[slot],
            challenge.theme,
            challenge.noise_seeds[slot],
        ))
    }

    /// Score the client's selected position.
    ///
    /// First submission on a Pending challenge compare-and-sets it to
    /// Solved or Failed; repeat submissions report the terminal result
    /// without re-scoring. Absent, foreign, expired, and invalidated
    /// challenges all surface as `NotFound`.
    pub async fn submit_selection(
        &self,
        session_id: &str,
        form_key: &str,
        challenge_id: u32,
        position: u8,
    ) -> Result<bool> {
        let key = challenge_key(session_id, form_key);
        let challenge = self.owned_challenge(session_id, form_key, challenge_id).await?;

        // Structural check before any state can move
        if position as usize >= challenge.icons.len() {
            return Err(WardenError::BadRequest);
        }

        match challenge.state {
            ChallengeState::Solved => Ok(true),
            ChallengeState::Failed => Ok(false),
            ChallengeState::Invalidated | ChallengeState::Expired => Err(WardenError::NotFound),
            ChallengeState::Pending => {
                let success = position == challenge.correct_position;
                let target = if success {
                    ChallengeState::Solved
                } else {
                    ChallengeState::Failed
                };

                match self.store.transition(&key, ChallengeState::Pending, target).await? {
                    CasOutcome::Swapped(_) => {
                        tracing::debug!(
                            challenge_id,
                            session_id = %session_id,
                            success,
                            "Selection scored"
                        );
                        Ok(success)
                    }
                    // A concurrent submission won the CAS; report its verdict
                    CasOutcome::Conflict(current) => match current.state {
                        ChallengeState::Solved => Ok(true),
                        ChallengeState::Failed => Ok(false),
                        _ => Err(WardenError::NotFound),
                    },
                    CasOutcome::Missing => Err(WardenError::NotFound),
                }
            }
        }
    }

    /// Client-reported interaction timeout: evict the challenge so it
    /// can never be scored or consumed. Idempotent; unknown ids are a
    /// silent no-op.
    pub async fn invalidate(
        &self,
        session_id: &str,
        form_key: &str,
        challenge_id: u32,
    ) -> Result<()> {
        let key = challenge_key(session_id, form_key);

        if let Some(challenge) = self.store.load(&key).await? {
            if challenge.id == challenge_id {
                self.store.remove(&key).await?;
                tracing::debug!(challenge_id, session_id = %session_id, "Challenge invalidated");
            }
        }

        Ok(())
    }

    /// Authorize one credential submission: true iff the session's
    /// challenge on this form is Solved, unexpired, and not yet
    /// consumed. Consumes it on success, so a solved challenge
    /// authorizes at most one login attempt.
    pub async fn authorize_credential_submission(
        &self,
        session_id: &str,
        form_key: &str,
    ) -> Result<bool> {
        let key = challenge_key(session_id, form_key);

        let Some(challenge) = self.store.load(&key).await? else {
            return Ok(false);
        };

        let now = chrono::Utc::now().timestamp();
        if challenge.is_expired(self.ttl_secs, now) {
            self.store.remove(&key).await?;
            return Ok(false);
        }

        let consumed = self
            .store
            .take_if(&key, ChallengeState::Solved)
            .await?
            .is_some();

        if consumed {
            tracing::info!(
                challenge_id = challenge.id,
                session_id = %session_id,
                "Solved challenge consumed for credential submission"
            );
        }

        Ok(consumed)
    }

    /// Load the session's challenge, enforcing ownership and lazy
    /// expiry. A foreign or missing id is `NotFound` - the caller can
    /// never learn whether a challenge exists elsewhere.
    async fn owned_challenge(
        &self,
        session_id: &str,
        form_key: &str,
        challenge_id: u32,
    ) -> Result<StoredChallenge> {
        let key = challenge_key(session_id, form_key);

        let challenge = self
            .store
            .load(&key)
            .await?
            .ok_or(WardenError::NotFound)?;

        if challenge.id != challenge_id {
            return Err(WardenError::NotFound);
        }

        let now = chrono::Utc::now().timestamp();
        if challenge.state == ChallengeState::Pending && challenge.is_expired(self.ttl_secs, now) {
            // Lazy expiry: mark and report as absent, never as "wrong answer"
            let _ = self
                .store
                .transition(&key, ChallengeState::Pending, ChallengeState::Expired)
                .await;
            tracing::debug!(challenge_id, session_id = %session_id, "Challenge expired");
            return Err(WardenError::NotFound);
        }

        Ok(challenge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_common::constants::CHALLENGE_TTL_SECS;

    const SESSION: &str = "session-a";
    const FORM: &str = "login";

    fn service() -> (ChallengeService, ChallengeStore) {
        let store = ChallengeStore::memory(CHALLENGE_TTL_SECS);
        (
            ChallengeService::new(store.clone(), CHALLENGE_TTL_SECS),
            store,
        )
    }

    fn expired_service() -> ChallengeService {
        // TTL of zero: everything is expired the moment it is issued
        let store = ChallengeStore::memory(0);
        ChallengeService::new(store, 0)
    }

    async fn stored(store: &ChallengeStore, session: &str, form: &str) -> StoredChallenge {
        store
            .load(&challenge_key(session, form))
            .await
            .unwrap()
            .expect("challenge should be stored")
    }

    #[tokio::test]
    async fn test_correct_selection_authorizes_exactly_once() {
        let (service, store) = service();
        let descriptor = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let answer = stored(&store, SESSION, FORM).await;

        let success = service
            .submit_selection(SESSION, FORM, descriptor.challenge_id, answer.correct_position)
            .await
            .unwrap();
        assert!(success);

        assert!(service
            .authorize_credential_submission(SESSION, FORM)
            .await
            .unwrap());

        // One-shot: the consumed challenge never authorizes again
        assert!(!service
            .authorize_credential_submission(SESSION, FORM)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_wrong_selection_never_authorizes() {
        let (service, store) = service();
        let descriptor = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let answer = stored(&store, SESSION, FORM).await;

        let wrong = (answer.correct_position + 1) % answer.icons.len() as u8;
        let success = service
            .submit_selection(SESSION, FORM, descriptor.challenge_id, wrong)
            .await
            .unwrap();
        assert!(!success);

        assert!(!service
            .authorize_credential_submission(SESSION, FORM)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_submission_is_idempotent() {
        let (service, store) = service();
        let descriptor = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let answer = stored(&store, SESSION, FORM).await;

        let first = service
            .submit_selection(SESSION, FORM, descriptor.challenge_id, answer.correct_position)
            .await
            .unwrap();
        assert!(first);

        // A later submission with a different (wrong) position must not
        // re-score; the recorded verdict stands
        let wrong = (answer.correct_position + 1) % answer.icons.len() as u8;
        let second = service
            .submit_selection(SESSION, FORM, descriptor.challenge_id, wrong)
            .await
            .unwrap();
        assert!(second);

        assert_eq!(
            stored(&store, SESSION, FORM).await.state,
            ChallengeState::Solved
        );
    }

    #[tokio::test]
    async fn test_expired_challenge_is_not_scored() {
        let service = expired_service();
        let descriptor = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();

        // Even the correct position is NotFound once the TTL has passed
        for position in 0..5 {
            let result = service
                .submit_selection(SESSION, FORM, descriptor.challenge_id, position)
                .await;
            assert!(matches!(result, Err(WardenError::NotFound)));
        }
    }

    #[tokio::test]
    async fn test_expired_challenge_never_authorizes() {
        let service = expired_service();
        service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();

        assert!(!service
            .authorize_credential_submission(SESSION, FORM)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent_and_blocks_scoring() {
        let (service, store) = service();
        let descriptor = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let answer = stored(&store, SESSION, FORM).await;

        service
            .invalidate(SESSION, FORM, descriptor.challenge_id)
            .await
            .unwrap();
        service
            .invalidate(SESSION, FORM, descriptor.challenge_id)
            .await
            .unwrap();

        let result = service
            .submit_selection(SESSION, FORM, descriptor.challenge_id, answer.correct_position)
            .await;
        assert!(matches!(result, Err(WardenError::NotFound)));
    }

    #[tokio::test]
    async fn test_invalidate_with_stale_id_keeps_current_challenge() {
        let (service, store) = service();
        let old = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let current = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();

        // Stale expire-notice for the replaced challenge must not evict
        // the live one
        service.invalidate(SESSION, FORM, old.challenge_id).await.unwrap();
        assert_eq!(
            stored(&store, SESSION, FORM).await.id,
            current.challenge_id
        );
    }

    #[tokio::test]
    async fn test_new_challenge_invalidates_previous_one() {
        let (service, store) = service();
        let old = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let fresh = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let answer = stored(&store, SESSION, FORM).await;

        let stale = service
            .submit_selection(SESSION, FORM, old.challenge_id, 0)
            .await;
        assert!(matches!(stale, Err(WardenError::NotFound)));

        let success = service
            .submit_selection(SESSION, FORM, fresh.challenge_id, answer.correct_position)
            .await
            .unwrap();
        assert!(success);
    }

    #[tokio::test]
    async fn test_solved_challenge_is_bound_to_its_session_and_form() {
        let (service, store) = service();
        service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let answer = stored(&store, SESSION, FORM).await;

        service
            .submit_selection(SESSION, FORM, answer.id, answer.correct_position)
            .await
            .unwrap();

        // Another session or another form cannot ride the solved challenge
        assert!(!service
            .authorize_credential_submission("session-b", FORM)
            .await
            .unwrap());
        assert!(!service
            .authorize_credential_submission(SESSION, "password-reset")
            .await
            .unwrap());

        // The rightful owner still can, once
        assert!(service
            .authorize_credential_submission(SESSION, FORM)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_out_of_bounds_selection_mutates_nothing() {
        let (service, store) = service();
        let descriptor = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let answer = stored(&store, SESSION, FORM).await;

        let result = service
            .submit_selection(SESSION, FORM, descriptor.challenge_id, 99)
            .await;
        assert!(matches!(result, Err(WardenError::BadRequest)));
        assert_eq!(
            stored(&store, SESSION, FORM).await.state,
            ChallengeState::Pending
        );

        // Still scorable afterwards
        let success = service
            .submit_selection(SESSION, FORM, descriptor.challenge_id, answer.correct_position)
            .await
            .unwrap();
        assert!(success);
    }

    #[tokio::test]
    async fn test_icon_images_match_descriptor_hashes() {
        let (service, _) = service();
        let descriptor = service
            .create_challenge(SESSION, FORM, Theme::Dark)
            .await
            .unwrap();

        let generator = IconGenerator::new();
        for (position, expected) in descriptor.icon_hashes.iter().enumerate() {
            let image = service
                .icon_image(SESSION, FORM, descriptor.challenge_id, position as u8)
                .await
                .unwrap();
            assert_eq!(&generator.icon_hash(&image), expected);
        }

        let out_of_bounds = service
            .icon_image(SESSION, FORM, descriptor.challenge_id, 5)
            .await;
        assert!(matches!(out_of_bounds, Err(WardenError::BadRequest)));

        let foreign = service.icon_image(SESSION, FORM, 12345, 0).await;
        assert!(matches!(foreign, Err(WardenError::NotFound)));
    }

    #[tokio::test]
    async fn test_concurrent_submissions_cannot_double_score() {
        let (service, store) = service();
        let descriptor = service
            .create_challenge(SESSION, FORM, Theme::Light)
            .await
            .unwrap();
        let answer = stored(&store, SESSION, FORM).await;

        let (a, b) = tokio::join!(
            service.submit_selection(SESSION, FORM, descriptor.challenge_id, answer.correct_position),
            service.submit_selection(SESSION, FORM, descriptor.challenge_id, answer.correct_position),
        );
        assert!(a.unwrap());
        assert!(b.unwrap());

        // Exactly one authorization comes out the other end
        let first = service
            .authorize_credential_submission(SESSION, FORM)
            .await
            .unwrap();
        let second = service
            .authorize_credential_submission(SESSION, FORM)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
    }
}
