//! Application state and shared resources.

use anyhow::Result;
use std::sync::Arc;

use crate::backend::{DenyAllBackend, LoginBackend, PermissiveBackend};
use crate::challenge::{ChallengeService, ChallengeStore};
use crate::config::{AppConfig, LoginBackendMode};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Challenge lifecycle service
    pub challenges: ChallengeService,

    /// Store handle, kept for readiness checks and the sweep worker
    pub store: ChallengeStore,

    /// External credential backend
    pub login_backend: Arc<dyn LoginBackend>,
}

impl AppState {
    /// Assemble application state around an already-connected store.
    pub fn new(config: AppConfig, store: ChallengeStore) -> Result<Self> {
        let challenges = ChallengeService::new(store.clone(), config.challenge.ttl_secs);

        let login_backend: Arc<dyn LoginBackend> = match config.login_backend {
            LoginBackendMode::Permissive => Arc::new(PermissiveBackend),
            LoginBackendMode::Deny => Arc::new(DenyAllBackend),
        };

        Ok(Self {
            config,
            challenges,
            store,
            login_backend,
        })
    }

    /// State wired to an in-process store and a given backend; the
    /// integration tests drive the router through this.
    pub fn for_tests(backend: Arc<dyn LoginBackend>) -> Self {
        let config = AppConfig::default();
        let store = ChallengeStore::memory(config.challenge.ttl_secs);
        Self {
            challenges: ChallengeService::new(store.clone(), config.challenge.ttl_secs),
            store,
            config,
            login_backend: backend,
        }
    }
}
