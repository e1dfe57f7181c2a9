//! # Warden client policy
//!
//! The widget-side half of the login gate: the attempt counter that
//! locks the form after too many clicks, and the submission flow state
//! machine that drives challenge verification before credentials go
//! out. Both are pure state machines; the embedding UI feeds them
//! events and reads back what to enable, disable, or send.

mod flow;
mod guard;
pub mod requests;

pub use flow::{FlowEvent, FlowState, SubmitFlow};
pub use guard::{AttemptDecision, LoginAttemptGuard};
