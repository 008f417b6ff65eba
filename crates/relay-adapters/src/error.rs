//! Error types for adapter operations.

use thiserror::Error;

/// Errors an adapter can report while delivering a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The agent's input control could not be located.
    #[error("could not find input field")]
    InputNotFound,

    /// The agent's submit control could not be located.
    #[error("could not find send button")]
    SubmitNotFound,

    /// The receiving end is not ready yet (typically right after a reload).
    #[error("receiving end not ready: {0}")]
    NotReady(String),

    /// A delivery to this agent is already in flight.
    #[error("already sending a message")]
    Busy,

    /// Any other delivery failure.
    #[error("channel error: {0}")]
    Channel(String),
}

impl AdapterError {
    /// Returns true if retrying the same delivery may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AdapterError::NotReady(_))
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_ready_is_transient() {
        assert!(AdapterError::NotReady("reload".into()).is_transient());
        assert!(!AdapterError::InputNotFound.is_transient());
        assert!(!AdapterError::SubmitNotFound.is_transient());
        assert!(!AdapterError::Busy.is_transient());
        assert!(!AdapterError::Channel("boom".into()).is_transient());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(AdapterError::InputNotFound.to_string(), "could not find input field");
        assert_eq!(
            AdapterError::NotReady("page loading".into()).to_string(),
            "receiving end not ready: page loading"
        );
    }
}
