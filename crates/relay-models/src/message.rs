//! Message contract between the orchestrator, its adapters and its host.
//!
//! Every message kind the orchestrator accepts is a variant of
//! [`RelayMessage`]; each variant has exactly one handler and one
//! [`RelayResponse`] shape.

use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// Inbound messages handled by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    /// An adapter finished loading and can accept input.
    AgentReady {
        /// Agent whose adapter is ready.
        agent_id: AgentId,
    },
    /// Deliver text to an agent.
    Dispatch {
        /// Target agent.
        agent_id: AgentId,
        /// Text to inject and submit.
        text: String,
    },
    /// Read an agent's latest reply (live if possible, cached otherwise).
    GetLatestReply {
        /// Agent to read from.
        agent_id: AgentId,
    },
    /// A capture session concluded with new reply text.
    ReplyCaptured {
        /// Agent that replied.
        agent_id: AgentId,
        /// Final reply text.
        content: String,
    },
    /// An external check observed a connectivity change.
    ConnectivityChanged {
        /// Agent whose session opened or closed.
        agent_id: AgentId,
        /// Whether a session is now open.
        connected: bool,
    },
}

impl RelayMessage {
    /// Returns the agent this message concerns.
    pub fn agent_id(&self) -> &AgentId {
        match self {
            RelayMessage::AgentReady { agent_id } => agent_id,
            RelayMessage::Dispatch { agent_id, .. } => agent_id,
            RelayMessage::GetLatestReply { agent_id } => agent_id,
            RelayMessage::ReplyCaptured { agent_id, .. } => agent_id,
            RelayMessage::ConnectivityChanged { agent_id, .. } => agent_id,
        }
    }
}

/// Result of delivering one message to one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Target agent.
    pub agent_id: AgentId,
    /// Whether the message was submitted.
    pub success: bool,
    /// Human-readable failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Delivery attempts made (0 when the agent could not be resolved).
    pub attempts: u32,
}

impl DispatchOutcome {
    /// Creates a successful outcome.
    pub fn delivered(agent_id: AgentId, attempts: u32) -> Self {
        Self {
            agent_id,
            success: true,
            error: None,
            attempts,
        }
    }

    /// Creates a failed outcome.
    pub fn failed(agent_id: AgentId, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            agent_id,
            success: false,
            error: Some(error.into()),
            attempts,
        }
    }
}

/// Response to a [`RelayMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayResponse {
    /// The message was applied; nothing to report.
    Ack,
    /// Result of a dispatch.
    Dispatched(DispatchOutcome),
    /// Latest reply text, if any.
    LatestReply {
        /// Reply text.
        content: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_agent_id() {
        let agent = AgentId::from("claude");

        let messages = vec![
            RelayMessage::AgentReady { agent_id: agent.clone() },
            RelayMessage::Dispatch { agent_id: agent.clone(), text: "hi".into() },
            RelayMessage::GetLatestReply { agent_id: agent.clone() },
            RelayMessage::ReplyCaptured { agent_id: agent.clone(), content: "c".into() },
            RelayMessage::ConnectivityChanged { agent_id: agent.clone(), connected: true },
        ];

        for message in &messages {
            assert_eq!(message.agent_id(), &agent);
        }
    }

    #[test]
    fn test_message_wire_tag() {
        let message = RelayMessage::ConnectivityChanged {
            agent_id: AgentId::from("gemini"),
            connected: false,
        };
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["type"], "connectivity_changed");
        assert_eq!(json["agent_id"], "gemini");
        assert_eq!(json["connected"], false);
    }

    #[test]
    fn test_dispatch_outcome_constructors() {
        let ok = DispatchOutcome::delivered(AgentId::from("a"), 1);
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = DispatchOutcome::failed(AgentId::from("a"), "agent not found: a", 0);
        assert!(!failed.success);
        assert_eq!(failed.attempts, 0);
        assert_eq!(failed.error.as_deref(), Some("agent not found: a"));
    }
}
