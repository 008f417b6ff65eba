//! One-shot injection of source replies into a message for target agents.

use std::collections::HashMap;

use relay_models::AgentId;

use crate::error::ProtocolError;
use crate::prompts;
use crate::{dedup_ids, Outbound};

/// Targets, ordered sources and the user's message prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossReference {
    targets: Vec<AgentId>,
    sources: Vec<AgentId>,
    prefix: String,
}

impl CrossReference {
    /// Creates a request. Targets and sources are deduplicated in order.
    pub fn new(
        targets: &[AgentId],
        sources: &[AgentId],
        prefix: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let unique_targets = dedup_ids(targets);
        let unique_sources = dedup_ids(sources);

        if unique_targets.is_empty() || unique_sources.is_empty() {
            return Err(ProtocolError::InvalidParticipants(
                "cross-reference needs at least one target and one source".to_string(),
            ));
        }

        Ok(Self {
            targets: unique_targets,
            sources: unique_sources,
            prefix: prefix.into(),
        })
    }

    /// Agents that receive the composed message.
    pub fn targets(&self) -> &[AgentId] {
        &self.targets
    }

    /// Agents whose replies are embedded, in order.
    pub fn sources(&self) -> &[AgentId] {
        &self.sources
    }

    /// Composes the message and addresses it to every target.
    ///
    /// Fails with `MissingSourceReply` for the first source without a
    /// non-empty reply.
    pub fn plan(&self, replies: &HashMap<AgentId, String>) -> Result<Vec<Outbound>, ProtocolError> {
        let mut embedded: Vec<(&AgentId, &str)> = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match replies.get(source).filter(|r| !r.trim().is_empty()) {
                Some(reply) => embedded.push((source, reply.as_str())),
                None => return Err(ProtocolError::MissingSourceReply(source.clone())),
            }
        }

        let text = prompts::cross_reference(&self.prefix, &embedded);
        Ok(self
            .targets
            .iter()
            .map(|t| Outbound::new(t.clone(), text.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AgentId {
        AgentId::from(s)
    }

    #[test]
    fn test_single_message_with_sources_in_order() {
        let request = CrossReference::new(&[id("C")], &[id("A"), id("B")], "please compare").unwrap();
        let replies: HashMap<AgentId, String> =
            [(id("A"), "ra".to_string()), (id("B"), "rb".to_string())].into_iter().collect();

        let outbound = request.plan(&replies).unwrap();

        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].agent_id, id("C"));
        let text = &outbound[0].text;
        let prefix_at = text.find("please compare").unwrap();
        let a_at = text.find("<A_response>\nra\n</A_response>").unwrap();
        let b_at = text.find("<B_response>\nrb\n</B_response>").unwrap();
        assert!(prefix_at < a_at && a_at < b_at);
    }

    #[test]
    fn test_same_text_to_every_target() {
        let request = CrossReference::new(&[id("C"), id("D"), id("C")], &[id("A")], "look").unwrap();
        let replies: HashMap<AgentId, String> = [(id("A"), "ra".to_string())].into_iter().collect();

        let outbound = request.plan(&replies).unwrap();

        assert_eq!(outbound.len(), 2);
        assert_eq!(outbound[0].text, outbound[1].text);
    }

    #[test]
    fn test_missing_source_aborts() {
        let request = CrossReference::new(&[id("C")], &[id("A"), id("B")], "x").unwrap();
        let replies: HashMap<AgentId, String> = [(id("A"), "ra".to_string())].into_iter().collect();

        assert_eq!(
            request.plan(&replies).unwrap_err(),
            ProtocolError::MissingSourceReply(id("B"))
        );
    }

    #[test]
    fn test_requires_targets_and_sources() {
        assert!(CrossReference::new(&[], &[id("A")], "x").is_err());
        assert!(CrossReference::new(&[id("C")], &[], "x").is_err());
    }
}
