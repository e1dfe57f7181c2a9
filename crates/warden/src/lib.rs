//! # Warden - verification server
//!
//! Gates login attempts on an icon-selection challenge ("identify the
//! icon shown least often"). Handles challenge generation, per-session
//! storage, selection scoring, one-shot consumption by the login flow,
//! and the HTTP surface the client widget talks to.
//!
//! ## Architecture
//! ```text
//! Client widget → Warden → Login backend
//!                    ↓
//!         Redis / in-memory store (challenge state)
//! ```

use clap::Parser;

pub mod backend;
pub mod challenge;
pub mod config;
pub mod routes;
pub mod state;

/// Warden - icon-challenge login gate
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/warden.toml")]
    pub config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Use the in-process challenge store instead of Redis
    #[arg(long, default_value = "false")]
    pub memory_store: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    pub json_logs: bool,
}
