//! Error taxonomy
//!
//! Domain errors for the skill/session core. `Validation` and `NotFound` are
//! surfaced to callers so they can correct the request; capability and
//! persistence failures are folded into result observations at the
//! executor/agent boundary.

use thiserror::Error;

/// Errors produced by the skill store, executor and agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A skill or action spec failed its schema contract.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced skill or session does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An underlying browser capability call failed or timed out.
    #[error("capability call failed: {0}")]
    Capability(String),

    /// Action kind the executor does not know how to dispatch.
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    /// Snapshot read/write failure.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl AgentError {
    /// True for errors the caller can fix by correcting the request.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AgentError>;
