//! Agent types for Relay.
//!
//! An agent is one external conversational session the orchestrator can
//! message and read from. Agents come from a fixed configured set and live
//! for the whole process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// Connectivity of an agent's session as last reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connectivity check has reported on this agent yet.
    #[default]
    Unknown,
    /// A session for the agent is open and its adapter reported ready.
    Connected,
    /// No session for the agent is open.
    Disconnected,
}

impl ConnectionState {
    /// Maps a boolean check result to a state.
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

/// Per-agent state owned by the orchestrator's registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Agent identity.
    pub id: AgentId,

    /// Current connectivity.
    #[serde(default)]
    pub connection_state: ConnectionState,

    /// Text of the most recent captured reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_captured_reply: Option<String>,

    /// When the last reply was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_captured_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// Creates an agent with unknown connectivity and no cached reply.
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            connection_state: ConnectionState::Unknown,
            last_captured_reply: None,
            last_captured_at: None,
        }
    }

    /// Returns true if the agent's session is known to be open.
    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    /// Records a captured reply.
    ///
    /// Returns false and leaves the agent untouched when `content` equals
    /// the cached reply.
    pub fn record_reply(&mut self, content: &str) -> bool {
        if self.last_captured_reply.as_deref() == Some(content) {
            return false;
        }
        self.last_captured_reply = Some(content.to_string());
        self.last_captured_at = Some(Utc::now());
        true
    }
}
