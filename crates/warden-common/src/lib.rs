//! # Warden Common
//!
//! Shared types, traits, and utilities used across Warden components.
//!
//! ## Modules
//! - `types` - Core data structures (ChallengeState, Theme, descriptors)
//! - `error` - Common error types
//! - `constants` - Shared configuration constants
//! - `payload` - The base64(JSON) request envelope codec

pub mod constants;
pub mod error;
pub mod payload;
pub mod types;

pub use error::WardenError;
pub use payload::{ImageRequest, Payload};
pub use types::*;
