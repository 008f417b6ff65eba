//! Runtime events.

use relay_models::{AgentId, DispatchOutcome};

/// Events broadcast to runtime observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A capture session concluded with a new reply.
    ReplyCaptured {
        /// Agent that replied.
        agent_id: AgentId,
        /// Final reply text.
        content: String,
        /// Registry-wide capture sequence number, starting at 1.
        seq: u64,
    },
    /// A dispatch finished, successfully or not.
    DispatchCompleted(DispatchOutcome),
    /// An agent's session opened or closed.
    ConnectivityChanged {
        /// Agent ID.
        agent_id: AgentId,
        /// Whether a session is open.
        connected: bool,
    },
}

impl RuntimeEvent {
    /// Returns the agent this event concerns.
    pub fn agent_id(&self) -> &AgentId {
        match self {
            RuntimeEvent::ReplyCaptured { agent_id, .. } => agent_id,
            RuntimeEvent::DispatchCompleted(outcome) => &outcome.agent_id,
            RuntimeEvent::ConnectivityChanged { agent_id, .. } => agent_id,
        }
    }

    /// Returns true for failed dispatches.
    pub fn is_error(&self) -> bool {
        matches!(self, RuntimeEvent::DispatchCompleted(outcome) if !outcome.success)
    }
}
