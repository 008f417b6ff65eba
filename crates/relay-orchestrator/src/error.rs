//! Error types for the orchestrator crate.

use thiserror::Error;

use relay_models::AgentId;

/// Precondition failures in the protocol machines.
///
/// Every variant is raised before any message is dispatched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A participant has no reply recorded for the round being advanced.
    #[error("missing round {round} reply from {agent_id}")]
    MissingRoundData {
        /// Round that is incomplete.
        round: u32,
        /// Participant without a reply.
        agent_id: AgentId,
    },

    /// A speaker has no reply to review.
    #[error("no reply from speaker {0}; make sure it has answered first")]
    MissingSpeakerReply(AgentId),

    /// A cross-reference source has no reply.
    #[error("no reply from source {0}")]
    MissingSourceReply(AgentId),

    /// No reviewer has anyone to review.
    #[error("no reviewer has a speaker to review")]
    NoValidRelations,

    /// Participant list is unusable.
    #[error("invalid participants: {0}")]
    InvalidParticipants(String),

    /// Operation not allowed in the current phase.
    #[error("cannot {action} while {phase}")]
    InvalidState {
        /// Attempted operation.
        action: &'static str,
        /// Current phase.
        phase: String,
    },

    /// A reply was already recorded for this round and agent.
    #[error("round {round} already has a reply from {agent_id}")]
    DuplicateRoundEntry {
        /// Round number.
        round: u32,
        /// Agent that replied twice.
        agent_id: AgentId,
    },

    /// No discussion has been started.
    #[error("no discussion in progress")]
    NoDiscussion,
}

/// Errors parsing a user command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Nothing to do.
    #[error("empty input")]
    Empty,

    /// Slash command not recognised.
    #[error("unknown command: /{0}")]
    UnknownCommand(String),

    /// A command is missing a required argument.
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Protocol precondition failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Runtime rejected the operation.
    #[error(transparent)]
    Runtime(#[from] relay_runtime::RuntimeError),

    /// Reply cache could not be read.
    #[error("persistence error: {0}")]
    Persistence(#[from] relay_persistence::PersistenceError),

    /// Command line could not be parsed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_messages() {
        assert_eq!(
            ProtocolError::MissingSpeakerReply(AgentId::from("B")).to_string(),
            "no reply from speaker B; make sure it has answered first"
        );
        assert_eq!(
            ProtocolError::InvalidState { action: "advance", phase: "complete".into() }
                .to_string(),
            "cannot advance while complete"
        );
    }

    #[test]
    fn test_orchestrator_error_is_transparent() {
        let err: OrchestratorError = ProtocolError::NoValidRelations.into();
        assert_eq!(err.to_string(), "no reviewer has a speaker to review");
    }
}
