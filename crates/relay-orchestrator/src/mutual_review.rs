//! Mutual review: every reviewer evaluates every other speaker's reply.

use std::collections::HashMap;

use tracing::{debug, info};

use relay_models::{AgentId, RunId};

use crate::error::ProtocolError;
use crate::prompts;
use crate::{dedup_ids, Outbound};

type Result<T> = std::result::Result<T, ProtocolError>;

/// Who reviews whom, before any reply is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPlan {
    speakers: Vec<AgentId>,
    matrix: Vec<(AgentId, Vec<AgentId>)>,
}

impl ReviewPlan {
    /// Builds the review matrix: each reviewer gets every speaker but itself.
    ///
    /// Fails with `NoValidRelations` when no reviewer has anyone to review.
    pub fn new(speakers: &[AgentId], reviewers: &[AgentId]) -> Result<Self> {
        let speakers = dedup_ids(speakers);
        let matrix: Vec<(AgentId, Vec<AgentId>)> = dedup_ids(reviewers)
            .into_iter()
            .map(|reviewer| {
                let assigned = speakers.iter().filter(|s| **s != reviewer).cloned().collect();
                (reviewer, assigned)
            })
            .collect();

        if matrix.iter().all(|(_, assigned)| assigned.is_empty()) {
            return Err(ProtocolError::NoValidRelations);
        }
        Ok(Self { speakers, matrix })
    }

    /// Speakers whose replies must be fetched, in order.
    pub fn speakers(&self) -> &[AgentId] {
        &self.speakers
    }

    /// Reviewer to assigned speakers, in reviewer order.
    pub fn matrix(&self) -> &[(AgentId, Vec<AgentId>)] {
        &self.matrix
    }

    /// Speakers assigned to `reviewer`.
    pub fn assigned(&self, reviewer: &AgentId) -> Option<&[AgentId]> {
        self.matrix
            .iter()
            .find(|(r, _)| r == reviewer)
            .map(|(_, speakers)| speakers.as_slice())
    }

    /// Starts the review with the speakers' current replies.
    ///
    /// Fails with `MissingSpeakerReply` for the first speaker without a
    /// non-empty reply. On success returns one message per reviewer with a
    /// non-empty assignment; those reviewers become pending.
    pub fn begin(
        self,
        replies: &HashMap<AgentId, String>,
        prompt: &str,
    ) -> Result<(MutualReview, Vec<Outbound>)> {
        for speaker in &self.speakers {
            if replies.get(speaker).map_or(true, |r| r.trim().is_empty()) {
                return Err(ProtocolError::MissingSpeakerReply(speaker.clone()));
            }
        }

        let collected: HashMap<AgentId, String> = self
            .speakers
            .iter()
            .filter_map(|s| replies.get(s).map(|r| (s.clone(), r.clone())))
            .collect();

        let mut outbound = Vec::new();
        let mut pending = Vec::new();
        for (reviewer, assigned) in &self.matrix {
            if assigned.is_empty() {
                continue;
            }
            let embedded: Vec<(&AgentId, &str)> = assigned
                .iter()
                .filter_map(|s| collected.get(s).map(|r| (s, r.as_str())))
                .collect();
            outbound.push(Outbound::new(reviewer.clone(), prompts::review(&embedded, prompt)));
            pending.push(reviewer.clone());
        }

        let review = MutualReview {
            id: RunId::new(),
            plan: self,
            collected,
            pending,
            reviews: Vec::new(),
        };
        info!(run = %review.id, reviewers = review.pending.len(), "mutual review started");
        Ok((review, outbound))
    }
}

/// A mutual review waiting on its reviewers.
#[derive(Debug, Clone)]
pub struct MutualReview {
    id: RunId,
    plan: ReviewPlan,
    collected: HashMap<AgentId, String>,
    pending: Vec<AgentId>,
    reviews: Vec<(AgentId, String)>,
}

impl MutualReview {
    /// Run ID.
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// The plan this review runs.
    pub fn plan(&self) -> &ReviewPlan {
        &self.plan
    }

    /// Speaker replies embedded in the review requests.
    pub fn collected(&self) -> &HashMap<AgentId, String> {
        &self.collected
    }

    /// Reviewers still to answer.
    pub fn pending(&self) -> &[AgentId] {
        &self.pending
    }

    /// Returns true if `agent_id` still owes a review.
    pub fn is_pending(&self, agent_id: &AgentId) -> bool {
        self.pending.contains(agent_id)
    }

    /// Received reviews in arrival order.
    pub fn reviews(&self) -> &[(AgentId, String)] {
        &self.reviews
    }

    /// Returns true once every reviewer answered.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// Records a captured review. Returns false if the agent is not pending.
    pub fn record_review(&mut self, agent_id: &AgentId, content: &str) -> bool {
        if !self.is_pending(agent_id) {
            return false;
        }
        self.pending.retain(|p| p != agent_id);
        self.reviews.push((agent_id.clone(), content.to_string()));
        debug!(run = %self.id, reviewer = %agent_id, remaining = self.pending.len(), "review received");

        if self.pending.is_empty() {
            info!(run = %self.id, "mutual review complete");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AgentId {
        AgentId::from(s)
    }

    fn replies(pairs: &[(&str, &str)]) -> HashMap<AgentId, String> {
        pairs.iter().map(|(a, r)| (id(a), r.to_string())).collect()
    }

    #[test]
    fn test_matrix_excludes_self() {
        let plan = ReviewPlan::new(&[id("A"), id("B")], &[id("A"), id("B")]).unwrap();

        assert_eq!(
            plan.matrix(),
            &[(id("A"), vec![id("B")]), (id("B"), vec![id("A")])]
        );
    }

    #[test]
    fn test_matrix_three_way() {
        let plan = ReviewPlan::new(&[id("A"), id("B"), id("C")], &[id("C"), id("D")]).unwrap();

        assert_eq!(plan.assigned(&id("C")).unwrap(), &[id("A"), id("B")]);
        assert_eq!(plan.assigned(&id("D")).unwrap(), &[id("A"), id("B"), id("C")]);
    }

    #[test]
    fn test_no_valid_relations() {
        assert_eq!(
            ReviewPlan::new(&[id("A")], &[id("A")]).unwrap_err(),
            ProtocolError::NoValidRelations
        );
        assert_eq!(
            ReviewPlan::new(&[], &[id("A")]).unwrap_err(),
            ProtocolError::NoValidRelations
        );
    }

    #[test]
    fn test_begin_requires_every_speaker_reply() {
        let plan = ReviewPlan::new(&[id("A"), id("B")], &[id("A"), id("B")]).unwrap();

        let err = plan.begin(&replies(&[("A", "ra"), ("B", "  ")]), "p").unwrap_err();
        assert_eq!(err, ProtocolError::MissingSpeakerReply(id("B")));
    }

    #[test]
    fn test_begin_sends_one_message_per_reviewer() {
        let plan = ReviewPlan::new(&[id("A"), id("B"), id("C")], &[id("A"), id("B"), id("C")])
            .unwrap();

        let (review, outbound) = plan
            .begin(&replies(&[("A", "ra"), ("B", "rb"), ("C", "rc")]), "your view?")
            .unwrap();

        assert_eq!(outbound.len(), 3);
        let to_a = &outbound[0];
        assert_eq!(to_a.agent_id, id("A"));
        assert!(!to_a.text.contains("<A_response>"));
        let b_at = to_a.text.find("<B_response>").unwrap();
        let c_at = to_a.text.find("<C_response>").unwrap();
        assert!(b_at < c_at);
        assert!(to_a.text.ends_with("your view?"));

        assert_eq!(review.pending(), &[id("A"), id("B"), id("C")]);
    }

    #[test]
    fn test_reviewer_with_empty_assignment_is_skipped() {
        let plan = ReviewPlan::new(&[id("A")], &[id("A"), id("B")]).unwrap();
        let (review, outbound) = plan.begin(&replies(&[("A", "ra")]), "p").unwrap();

        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].agent_id, id("B"));
        assert_eq!(review.pending(), &[id("B")]);
    }

    #[test]
    fn test_reviews_complete_the_run() {
        let plan = ReviewPlan::new(&[id("A"), id("B")], &[id("A"), id("B")]).unwrap();
        let (mut review, _) = plan.begin(&replies(&[("A", "ra"), ("B", "rb")]), "p").unwrap();

        assert!(review.record_review(&id("B"), "b reviews a"));
        assert!(!review.is_complete());
        assert!(!review.record_review(&id("B"), "again"));
        assert!(!review.record_review(&id("Z"), "stranger"));

        assert!(review.record_review(&id("A"), "a reviews b"));
        assert!(review.is_complete());
        assert_eq!(review.reviews().len(), 2);
    }
}
