//! Multi-agent orchestration for Relay.
//!
//! This crate turns captured replies into coordinated conversations:
//!
//! - **Orchestrator**: routes captured replies to the protocol machines and
//!   dispatches their outbound messages
//! - **Discussion**: two agents answer a topic, then evaluate each other
//!   round by round, then summarize
//! - **MutualReview**: every reviewer evaluates the other speakers' replies
//! - **CrossReference**: embed some agents' replies into a message for others
//! - **CommandParser**: the slash and @mention command syntax
//!
//! The protocol machines are pure: they validate their preconditions and
//! return the messages to send, and never touch an adapter themselves.

pub mod command;
pub mod cross_reference;
pub mod discussion;
pub mod error;
pub mod mutual_review;
pub mod orchestrator;
pub mod prompts;

use relay_models::AgentId;

pub use command::{Command, CommandParser};
pub use cross_reference::CrossReference;
pub use discussion::{Discussion, DiscussionPhase};
pub use error::{CommandError, OrchestratorError, ProtocolError, Result};
pub use mutual_review::{MutualReview, ReviewPlan};
pub use orchestrator::{CommandReport, Orchestrator, StatusReport};

/// One message a protocol wants delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Receiving agent.
    pub agent_id: AgentId,
    /// Full text to inject.
    pub text: String,
}

impl Outbound {
    /// Creates an outbound message.
    pub fn new(agent_id: AgentId, text: impl Into<String>) -> Self {
        Self {
            agent_id,
            text: text.into(),
        }
    }
}

/// Drops repeated agents, keeping first occurrences in order.
pub(crate) fn dedup_ids<'a, I>(ids: I) -> Vec<AgentId>
where
    I: IntoIterator<Item = &'a AgentId>,
{
    let mut out: Vec<AgentId> = Vec::new();
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
