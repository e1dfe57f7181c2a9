//! Configuration management for Warden.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use warden_common::constants::{
    CHALLENGE_TTL_SECS, DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL, SWEEP_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Challenge store backend
    #[serde(default)]
    pub store_backend: StoreBackend,

    /// Credential backend mode
    #[serde(default)]
    pub login_backend: LoginBackendMode,

    /// Challenge configuration
    #[serde(default)]
    pub challenge: ChallengeConfig,
}

/// Which store holds challenge state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis (production; TTL eviction via key expiry)
    #[default]
    Redis,
    /// In-process DashMap (single node; swept by a background worker)
    Memory,
}

/// Which credential backend the login endpoint consults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginBackendMode {
    /// Accept any non-empty credential pair
    Permissive,
    /// Reject everything (fail closed until the real backend is wired)
    #[default]
    Deny,
}

/// Challenge-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeConfig {
    /// Pending challenge validity in seconds
    #[serde(default = "default_challenge_ttl")]
    pub ttl_secs: u64,

    /// Interval between expiry sweeps (memory backend only)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_challenge_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_challenge_ttl() -> u64 { CHALLENGE_TTL_SECS }
fn default_sweep_interval() -> u64 { SWEEP_INTERVAL_SECS }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &crate::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if args.memory_store {
            config.store_backend = StoreBackend::Memory;
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            store_backend: StoreBackend::default(),
            login_backend: LoginBackendMode::default(),
            challenge: ChallengeConfig::default(),
        }
    }
}
