//! Round history types for multi-round protocols.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::AgentId;

/// Kind of prompt that opened a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundType {
    /// Opening round: both participants answer the topic.
    Initial,
    /// Each participant evaluates the other's previous reply.
    CrossEval,
    /// Each participant summarizes the whole discussion.
    Summary,
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundType::Initial => "initial",
            RoundType::CrossEval => "cross-eval",
            RoundType::Summary => "summary",
        };
        f.write_str(s)
    }
}

/// One captured reply recorded against a protocol round.
///
/// Entries are immutable once appended to a history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    /// Round number, starting at 1.
    pub round: u32,
    /// Agent that produced the reply.
    pub agent_id: AgentId,
    /// Kind of round the reply belongs to.
    pub round_type: RoundType,
    /// Reply text.
    pub content: String,
    /// When the reply was recorded.
    pub timestamp: DateTime<Utc>,
}

impl RoundEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(
        round: u32,
        agent_id: AgentId,
        round_type: RoundType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            round,
            agent_id,
            round_type,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_type_display() {
        assert_eq!(RoundType::Initial.to_string(), "initial");
        assert_eq!(RoundType::CrossEval.to_string(), "cross-eval");
        assert_eq!(RoundType::Summary.to_string(), "summary");
    }

    #[test]
    fn test_round_type_serde_matches_display() {
        let json = serde_json::to_string(&RoundType::CrossEval).unwrap();
        assert_eq!(json, "\"cross-eval\"");
    }

    #[test]
    fn test_round_entry_new() {
        let entry = RoundEntry::new(2, AgentId::from("claude"), RoundType::CrossEval, "text");
        assert_eq!(entry.round, 2);
        assert_eq!(entry.agent_id.as_str(), "claude");
        assert_eq!(entry.content, "text");
    }
}
