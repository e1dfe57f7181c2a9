//! Seam to the external credential-checking service.
//!
//! Warden never inspects credentials itself; it hands them to whatever
//! implements [`LoginBackend`] and surfaces the outcome. The challenge
//! gate in front of this call is what Warden actually enforces.

use warden_common::LoginOutcome;

/// Opaque credential validator.
pub trait LoginBackend: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> LoginOutcome;
}

/// Accepts any non-empty credential pair. Stands in for the real
/// backend in deployments where the challenge gate is the only concern.
pub struct PermissiveBackend;

impl LoginBackend for PermissiveBackend {
    fn authenticate(&self, username: &str, password: &str) -> LoginOutcome {
        if username.is_empty() || password.is_empty() {
            LoginOutcome::Rejected
        } else {
            LoginOutcome::Accepted
        }
    }
}

/// Rejects everything. Useful when the backend integration is not wired
/// up yet and the gate must fail closed.
pub struct DenyAllBackend;

impl LoginBackend for DenyAllBackend {
    fn authenticate(&self, _username: &str, _password: &str) -> LoginOutcome {
        LoginOutcome::Rejected
    }
}
