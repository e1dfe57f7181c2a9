//! Per-form attempt counter.

use warden_common::constants::MAX_LOGIN_ATTEMPTS;

/// What the form should do with a submit click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    /// Proceed with the submission flow.
    Proceed,
    /// Disable username, password, and submit controls; issue no request.
    Lock,
}

/// Counts submit clicks over one form lifetime and locks the form once
/// the limit is spent.
///
/// The counter never resets on its own: a failed server validation, a
/// wrong icon selection, or a challenge timeout all leave it where it
/// is. Only a fresh form load (a new guard instance) starts over.
#[derive(Debug)]
pub struct LoginAttemptGuard {
    attempts: u32,
    max_attempts: u32,
    locked: bool,
}

impl Default for LoginAttemptGuard {
    fn default() -> Self {
        Self::new(MAX_LOGIN_ATTEMPTS)
    }
}

impl LoginAttemptGuard {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            locked: false,
        }
    }

    /// Register a submit click and decide whether it may proceed.
    ///
    /// The click past the limit locks the form and is itself swallowed;
    /// every later click stays locked.
    pub fn register_click(&mut self) -> AttemptDecision {
        if self.locked {
            return AttemptDecision::Lock;
        }

        self.attempts += 1;
        if self.attempts > self.max_attempts {
            tracing::debug!(attempts = self.attempts, "Attempt limit spent; locking form");
            self.locked = true;
            AttemptDecision::Lock
        } else {
            AttemptDecision::Proceed
        }
    }

    /// Whether the form controls should currently be disabled.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
