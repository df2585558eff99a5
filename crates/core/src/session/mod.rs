//! Session orchestration.
//!
//! [`Orchestrator`] owns at most one session at a time: it validates the
//! request, acquires the surface, drives the [`crate::handshake`] engine and
//! guarantees a single terminal dispatch followed by full teardown.

/// Orchestrator and its event handling.
pub mod orchestrator;
/// Outcome, completion and state types.
pub mod outcome;

pub use orchestrator::Orchestrator;
pub use outcome::{Completion, Outcome, SessionId, SessionState, Started, Success};
