//! Submission flow state machine.
//!
//! One flow instance drives one form. The UI disables the submit
//! control the moment the flow leaves `Idle` and re-enables it only on
//! a terminal outcome, so a rapid double-click cannot start a second
//! overlapping attempt. Timer ticks are fed in by the embedder; the
//! machine never owns a timer of its own, which keeps teardown between
//! attempts trivial.

use std::time::{Duration, Instant};

use warden_common::constants::{CLIENT_POLL_INTERVAL_MS, CLIENT_POLL_TIMEOUT_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Nothing in flight; the submit control is live.
    Idle,
    /// A challenge verification is outstanding; polling for its result.
    AwaitingVerification,
    /// The challenge passed; credentials may be sent.
    Passed,
    /// The challenge failed, timed out, or could not be verified.
    ChallengeFailed,
}

/// What the embedder should do after feeding the flow an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// Begin polling at the flow's interval.
    StartPolling,
    /// Stop polling; submit the credentials.
    SubmitCredentials,
    /// Stop polling; show the retry message.
    ShowRetry,
    /// Ignore the input (duplicate click, stale tick).
    Ignored,
}

pub struct SubmitFlow {
    state: FlowState,
    started: Option<Instant>,
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for SubmitFlow {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(CLIENT_POLL_TIMEOUT_SECS),
            Duration::from_millis(CLIENT_POLL_INTERVAL_MS),
        )
    }
}

impl SubmitFlow {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            state: FlowState::Idle,
            started: None,
            timeout,
            poll_interval,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Interval at which the embedder should call [`poll_tick`].
    ///
    /// [`poll_tick`]: SubmitFlow::poll_tick
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The user clicked submit.
    ///
    /// Only an idle flow (or one parked on a terminal outcome, which a
    /// retry click re-arms) starts a new attempt; a click while a
    /// verification is outstanding is swallowed.
    pub fn submit_clicked(&mut self, now: Instant) -> FlowEvent {
        match self.state {
            FlowState::AwaitingVerification => FlowEvent::Ignored,
            FlowState::Idle | FlowState::Passed | FlowState::ChallengeFailed => {
                self.state = FlowState::AwaitingVerification;
                self.started = Some(now);
                FlowEvent::StartPolling
            }
        }
    }

    /// A poll result arrived from the server.
    pub fn verification_result(&mut self, success: bool) -> FlowEvent {
        if self.state != FlowState::AwaitingVerification {
            return FlowEvent::Ignored;
        }

        self.started = None;
        if success {
            self.state = FlowState::Passed;
            FlowEvent::SubmitCredentials
        } else {
            self.state = FlowState::ChallengeFailed;
            FlowEvent::ShowRetry
        }
    }

    /// A poll timer fired with no result yet.
    ///
    /// Past the timeout the attempt is abandoned and reported like a
    /// failed challenge; the server's expiry handling makes the stale
    /// challenge unusable on its own.
    pub fn poll_tick(&mut self, now: Instant) -> FlowEvent {
        let Some(started) = self.started else {
            return FlowEvent::Ignored;
        };
        if self.state != FlowState::AwaitingVerification {
            return FlowEvent::Ignored;
        }

        if now.duration_since(started) >= self.timeout {
            tracing::debug!("Verification poll timed out");
            self.started = None;
            self.state = FlowState::ChallengeFailed;
            FlowEvent::ShowRetry
        } else {
            FlowEvent::Ignored
        }
    }

    /// The credential submission itself came back rejected.
    ///
    /// Returns the flow to idle so the user can retry; the attempt
    /// counter lives in [`LoginAttemptGuard`] and is deliberately not
    /// touched from here.
    ///
    /// [`LoginAttemptGuard`]: crate::LoginAttemptGuard
    pub fn login_failed(&mut self) {
        self.state = FlowState::Idle;
        self.started = None;
    }
}
