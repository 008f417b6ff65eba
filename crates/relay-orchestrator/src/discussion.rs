//! Two-party multi-round discussion.
//!
//! ```text
//! start -> Active(1, initial) -> RoundComplete --advance--> Active(n+1, cross-eval) -> ...
//!                                              \--summarize--> Summarizing -> Complete
//! ```
//!
//! The machine is pure: operations return the messages to send and the
//! caller delivers them. Rounds never advance on their own.

use std::fmt;

use tracing::{debug, info};

use relay_models::{AgentId, RoundEntry, RoundType, RunId};

use crate::error::ProtocolError;
use crate::prompts;
use crate::Outbound;

/// Where a discussion stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscussionPhase {
    /// Waiting for replies to the current round.
    Active,
    /// Every participant answered the current round.
    RoundComplete,
    /// Waiting for summaries.
    Summarizing,
    /// Both summaries are in.
    Complete,
}

impl fmt::Display for DiscussionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscussionPhase::Active => "active",
            DiscussionPhase::RoundComplete => "round complete",
            DiscussionPhase::Summarizing => "summarizing",
            DiscussionPhase::Complete => "complete",
        };
        f.write_str(s)
    }
}

type Result<T> = std::result::Result<T, ProtocolError>;

/// State of one discussion run.
#[derive(Debug, Clone)]
pub struct Discussion {
    id: RunId,
    topic: String,
    participants: [AgentId; 2],
    current_round: u32,
    round_type: RoundType,
    phase: DiscussionPhase,
    pending: Vec<AgentId>,
    history: Vec<RoundEntry>,
}

impl Discussion {
    /// Starts a discussion and returns the opening messages.
    ///
    /// Requires exactly two distinct participants and a non-empty topic.
    /// Both participants receive the same opening text.
    pub fn start(topic: &str, participants: &[AgentId]) -> Result<(Self, Vec<Outbound>)> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ProtocolError::InvalidParticipants(
                "a discussion needs a topic".to_string(),
            ));
        }
        let [a, b] = participants else {
            return Err(ProtocolError::InvalidParticipants(format!(
                "a discussion needs exactly 2 participants, got {}",
                participants.len()
            )));
        };
        if a == b {
            return Err(ProtocolError::InvalidParticipants(format!(
                "{} cannot discuss with itself",
                a
            )));
        }

        let discussion = Self {
            id: RunId::new(),
            topic: topic.to_string(),
            participants: [a.clone(), b.clone()],
            current_round: 1,
            round_type: RoundType::Initial,
            phase: DiscussionPhase::Active,
            pending: vec![a.clone(), b.clone()],
            history: Vec::new(),
        };

        let opening = prompts::opening(topic);
        let outbound = discussion
            .participants
            .iter()
            .map(|p| Outbound::new(p.clone(), opening.clone()))
            .collect();

        info!(run = %discussion.id, a = %a, b = %b, "discussion started");
        Ok((discussion, outbound))
    }

    /// Run ID.
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// Topic under discussion.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The two participants.
    pub fn participants(&self) -> &[AgentId; 2] {
        &self.participants
    }

    /// Current round number, starting at 1.
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Kind of the current round.
    pub fn round_type(&self) -> RoundType {
        self.round_type
    }

    /// Current phase.
    pub fn phase(&self) -> DiscussionPhase {
        self.phase
    }

    /// Participants the current round still waits on.
    pub fn pending(&self) -> &[AgentId] {
        &self.pending
    }

    /// Returns true if the current round waits on `agent_id`.
    pub fn is_pending(&self, agent_id: &AgentId) -> bool {
        self.pending.contains(agent_id)
    }

    /// Every recorded reply in order.
    pub fn history(&self) -> &[RoundEntry] {
        &self.history
    }

    /// Records a captured reply.
    ///
    /// Returns `Ok(false)` if the agent is not pending. The last pending
    /// reply moves the machine to `RoundComplete`, or to `Complete` when
    /// summarizing.
    pub fn record_reply(&mut self, agent_id: &AgentId, content: &str) -> Result<bool> {
        if !self.is_pending(agent_id) {
            return Ok(false);
        }
        if self.entry(self.current_round, agent_id).is_some() {
            return Err(ProtocolError::DuplicateRoundEntry {
                round: self.current_round,
                agent_id: agent_id.clone(),
            });
        }

        self.history.push(RoundEntry::new(
            self.current_round,
            agent_id.clone(),
            self.round_type,
            content,
        ));
        self.pending.retain(|p| p != agent_id);
        debug!(run = %self.id, agent = %agent_id, round = self.current_round, "discussion reply recorded");

        if self.pending.is_empty() {
            self.phase = match self.phase {
                DiscussionPhase::Summarizing => DiscussionPhase::Complete,
                _ => DiscussionPhase::RoundComplete,
            };
            info!(run = %self.id, round = self.current_round, phase = %self.phase, "round finished");
        }
        Ok(true)
    }

    /// Opens the next cross-evaluation round.
    ///
    /// Each participant receives the other's reply from the round just
    /// finished. Fails with `MissingRoundData` while that round is still
    /// missing a reply.
    pub fn advance(&mut self) -> Result<Vec<Outbound>> {
        if matches!(self.phase, DiscussionPhase::Summarizing | DiscussionPhase::Complete) {
            return Err(self.invalid("advance"));
        }

        let [a, b] = &self.participants;
        let reply_a = self.require_entry(a)?;
        let reply_b = self.require_entry(b)?;

        let outbound = vec![
            Outbound::new(a.clone(), prompts::cross_evaluation(&self.topic, b, &reply_b)),
            Outbound::new(b.clone(), prompts::cross_evaluation(&self.topic, a, &reply_a)),
        ];

        self.open_round(RoundType::CrossEval, DiscussionPhase::Active);
        info!(run = %self.id, round = self.current_round, "cross-evaluation round opened");
        Ok(outbound)
    }

    /// Asks both participants to summarize the whole discussion.
    ///
    /// Only allowed between rounds.
    pub fn summarize(&mut self) -> Result<Vec<Outbound>> {
        if self.phase != DiscussionPhase::RoundComplete {
            return Err(self.invalid("summarize"));
        }

        let text = prompts::summary(&self.topic, &self.history);
        let outbound = self
            .participants
            .iter()
            .map(|p| Outbound::new(p.clone(), text.clone()))
            .collect();

        self.open_round(RoundType::Summary, DiscussionPhase::Summarizing);
        info!(run = %self.id, "summary requested");
        Ok(outbound)
    }

    /// Sends a user message to both participants, each with the other's
    /// latest reply appended. Round state is untouched.
    pub fn interject(
        &self,
        message: &str,
        latest_a: Option<&str>,
        latest_b: Option<&str>,
    ) -> Result<Vec<Outbound>> {
        if self.phase == DiscussionPhase::Complete {
            return Err(self.invalid("interject"));
        }

        let [a, b] = &self.participants;
        let reply_a = latest_a
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ProtocolError::MissingRoundData {
                round: self.current_round,
                agent_id: a.clone(),
            })?;
        let reply_b = latest_b
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ProtocolError::MissingRoundData {
                round: self.current_round,
                agent_id: b.clone(),
            })?;

        Ok(vec![
            Outbound::new(a.clone(), prompts::interjection(message, b, reply_b)),
            Outbound::new(b.clone(), prompts::interjection(message, a, reply_a)),
        ])
    }

    /// Both summaries in participant order, once complete.
    pub fn summaries(&self) -> Option<[(&AgentId, &str); 2]> {
        if self.phase != DiscussionPhase::Complete {
            return None;
        }
        let [a, b] = &self.participants;
        let summary_a = self.summary_of(a)?;
        let summary_b = self.summary_of(b)?;
        Some([(a, summary_a), (b, summary_b)])
    }

    /// Human-readable transcript of every round so far.
    pub fn transcript(&self) -> String {
        prompts::transcript(&self.topic, &self.history)
    }

    fn entry(&self, round: u32, agent_id: &AgentId) -> Option<&RoundEntry> {
        self.history
            .iter()
            .find(|e| e.round == round && &e.agent_id == agent_id)
    }

    fn require_entry(&self, agent_id: &AgentId) -> Result<String> {
        self.entry(self.current_round, agent_id)
            .map(|e| e.content.clone())
            .ok_or_else(|| ProtocolError::MissingRoundData {
                round: self.current_round,
                agent_id: agent_id.clone(),
            })
    }

    fn summary_of(&self, agent_id: &AgentId) -> Option<&str> {
        self.history
            .iter()
            .find(|e| e.round_type == RoundType::Summary && &e.agent_id == agent_id)
            .map(|e| e.content.as_str())
    }

    fn open_round(&mut self, round_type: RoundType, phase: DiscussionPhase) {
        self.current_round += 1;
        self.round_type = round_type;
        self.phase = phase;
        self.pending = self.participants.to_vec();
    }

    fn invalid(&self, action: &'static str) -> ProtocolError {
        ProtocolError::InvalidState {
            action,
            phase: self.phase.to_string(),
        }
    }
}
