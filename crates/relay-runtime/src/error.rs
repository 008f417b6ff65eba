//! Error types for the runtime crate.

use thiserror::Error;

use relay_adapters::AdapterError;
use relay_models::AgentId;

/// Errors that can occur in the runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Agent is not configured or has no attached session.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// A delivery to the agent is already in flight.
    #[error("agent busy: {0}")]
    AgentBusy(AgentId),

    /// The adapter reported a failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Runtime has been shut down.
    #[error("runtime shut down")]
    ShutDown,
}

impl RuntimeError {
    /// Returns true if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RuntimeError::Adapter(e) if e.is_transient())
    }
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RuntimeError::Adapter(AdapterError::NotReady("loading".into())).is_transient());
        assert!(!RuntimeError::Adapter(AdapterError::InputNotFound).is_transient());
        assert!(!RuntimeError::AgentNotFound(AgentId::from("x")).is_transient());
        assert!(!RuntimeError::AgentBusy(AgentId::from("x")).is_transient());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RuntimeError::AgentNotFound(AgentId::from("gemini")).to_string(),
            "agent not found: gemini"
        );
        assert_eq!(
            RuntimeError::Adapter(AdapterError::SubmitNotFound).to_string(),
            "could not find send button"
        );
    }
}
