//! The orchestrator: agent registry routing plus the protocol machines.
//!
//! All captured replies flow through one router task. It persists each
//! reply and forwards it to whichever protocol has the agent pending.
//! Protocol operations fetch replies, run the pure machine, then dispatch
//! its outbound messages sequentially in list order.
//!
//! Each protocol run remembers the registry's capture sequence at the moment
//! it starts waiting. Captures numbered at or below that mark were made
//! before the run's prompts went out and are never forwarded to it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use relay_adapters::{AgentAdapter, AgentCatalog};
use relay_models::{Agent, AgentId, DispatchOutcome, RelayMessage, RelayResponse};
use relay_persistence::ReplyStore;
use relay_runtime::{Runtime, RuntimeConfig, RuntimeEvent};

use crate::command::Command;
use crate::cross_reference::CrossReference;
use crate::discussion::{Discussion, DiscussionPhase};
use crate::error::{ProtocolError, Result};
use crate::mutual_review::{MutualReview, ReviewPlan};
use crate::Outbound;

#[derive(Debug, Default)]
struct ProtocolState {
    discussion: Option<Discussion>,
    discussion_since: u64,
    review: Option<MutualReview>,
    review_since: u64,
}

/// Snapshot for `/status`.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Every configured agent in order.
    pub agents: Vec<Agent>,
    /// Current discussion, if any.
    pub discussion: Option<Discussion>,
    /// Current or last mutual review, if any.
    pub review: Option<MutualReview>,
}

/// What executing a [`Command`] produced.
#[derive(Debug, Clone)]
pub enum CommandReport {
    /// Messages were dispatched.
    Dispatched(Vec<DispatchOutcome>),
    /// The discussion was reset; true if one existed.
    Reset(bool),
    /// Current status.
    Status(StatusReport),
}

/// Coordinates agents, captured replies and the protocol machines.
#[derive(Clone)]
pub struct Orchestrator {
    runtime: Arc<Runtime>,
    catalog: AgentCatalog,
    store: Option<ReplyStore>,
    protocols: Arc<Mutex<ProtocolState>>,
}

impl Orchestrator {
    /// Creates an orchestrator for every agent in the catalog.
    pub fn new(config: RuntimeConfig, catalog: AgentCatalog) -> Self {
        let runtime = Runtime::new(config, catalog.ids());
        Self {
            runtime: Arc::new(runtime),
            catalog,
            store: None,
            protocols: Arc::new(Mutex::new(ProtocolState::default())),
        }
    }

    /// Persists captured replies to `store`.
    pub fn with_store(mut self, store: ReplyStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns the runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Returns the agent catalog.
    pub fn catalog(&self) -> &AgentCatalog {
        &self.catalog
    }

    /// Seeds the reply cache from the store. Returns the number of replies loaded.
    pub async fn seed_from_store(&self) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let replies = store.load()?;
        let known: HashMap<AgentId, Option<String>> = replies
            .into_iter()
            .filter(|(id, _)| self.catalog.contains(id))
            .collect();
        let count = known.values().filter(|r| r.is_some()).count();

        self.runtime.registry().seed(known).await;
        info!(count, path = %store.path().display(), "reply cache seeded");
        Ok(count)
    }

    /// Spawns the task that routes captured replies until shutdown.
    pub fn spawn_router(&self) -> JoinHandle<()> {
        let this = self.clone();
        let mut events = self.runtime.subscribe();
        let mut shutdown = self.runtime.shutdown_signal();

        tokio::spawn(async move {
            debug!("router started");
            loop {
                tokio::select! {
                    biased;

                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    event = events.recv() => match event {
                        Ok(RuntimeEvent::ReplyCaptured { agent_id, content, seq }) => {
                            this.route_capture(&agent_id, &content, seq).await;
                        }
                        Ok(RuntimeEvent::DispatchCompleted(outcome)) if !outcome.success => {
                            debug!(agent = %outcome.agent_id, "dispatch failure observed");
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "router lagged behind runtime events");
                            this.resync().await;
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            debug!("router stopped");
        })
    }

    /// Persists a captured reply and forwards it to pending protocols.
    ///
    /// Returns true if a protocol consumed it.
    async fn route_capture(&self, agent_id: &AgentId, content: &str, seq: u64) -> bool {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_reply(agent_id, content) {
                warn!(agent = %agent_id, error = %e, "failed to persist reply");
            }
        }

        let mut state = self.protocols.lock().await;
        Self::forward(&mut state, agent_id, content, seq)
    }

    fn forward(state: &mut ProtocolState, agent_id: &AgentId, content: &str, seq: u64) -> bool {
        let mut forwarded = false;

        if let Some(discussion) = state.discussion.as_mut() {
            if seq <= state.discussion_since {
                debug!(agent = %agent_id, seq, "capture predates discussion round");
            } else {
                match discussion.record_reply(agent_id, content) {
                    Ok(true) => forwarded = true,
                    Ok(false) => {}
                    Err(e) => warn!(agent = %agent_id, error = %e, "discussion rejected reply"),
                }
            }
        }
        if let Some(review) = state.review.as_mut() {
            if seq <= state.review_since {
                debug!(agent = %agent_id, seq, "capture predates mutual review");
            } else if review.record_review(agent_id, content) {
                forwarded = true;
                if review.is_complete() {
                    info!(run = %review.id(), "mutual review complete");
                }
            }
        }

        if !forwarded {
            debug!(agent = %agent_id, "reply cached only");
        }
        forwarded
    }

    /// Replays cached captures to pending protocols after the router missed
    /// events. Sequence marks keep older captures out.
    async fn resync(&self) {
        let registry = self.runtime.registry();
        let mut state = self.protocols.lock().await;

        let mut pending: Vec<AgentId> = Vec::new();
        if let Some(discussion) = &state.discussion {
            pending.extend(discussion.pending().iter().cloned());
        }
        if let Some(review) = &state.review {
            pending.extend(review.pending().iter().cloned());
        }

        for agent_id in crate::dedup_ids(&pending) {
            if let Some((seq, content)) = registry.last_capture(&agent_id).await {
                if Self::forward(&mut state, &agent_id, &content, seq) {
                    info!(agent = %agent_id, seq, "reply recovered after lag");
                }
            }
        }
    }

    /// Handles one inbound message.
    pub async fn handle(&self, message: RelayMessage) -> Result<RelayResponse> {
        let registry = self.runtime.registry();
        match message {
            RelayMessage::AgentReady { agent_id } => {
                registry.set_connected(&agent_id, true).await?;
                Ok(RelayResponse::Ack)
            }
            RelayMessage::Dispatch { agent_id, text } => {
                Ok(RelayResponse::Dispatched(self.runtime.send(&agent_id, &text).await))
            }
            RelayMessage::GetLatestReply { agent_id } => Ok(RelayResponse::LatestReply {
                content: self.runtime.latest_reply(&agent_id).await,
            }),
            RelayMessage::ReplyCaptured { agent_id, content } => {
                registry.record_capture(&agent_id, &content).await;
                Ok(RelayResponse::Ack)
            }
            RelayMessage::ConnectivityChanged {
                agent_id,
                connected,
            } => {
                registry.set_connected(&agent_id, connected).await?;
                Ok(RelayResponse::Ack)
            }
        }
    }

    /// Attaches an adapter for `agent_id`.
    pub async fn attach(&self, agent_id: &AgentId, adapter: Arc<dyn AgentAdapter>) -> Result<()> {
        Ok(self.runtime.attach(agent_id, adapter).await?)
    }

    /// Recomputes every agent's connectivity from the open session locations.
    pub async fn refresh_connectivity<'a, I>(&self, open_locations: I) -> HashMap<AgentId, bool>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let connectivity = self.catalog.connectivity(open_locations);
        let registry = self.runtime.registry();
        for (agent_id, connected) in &connectivity {
            if let Err(e) = registry.set_connected(agent_id, *connected).await {
                warn!(agent = %agent_id, error = %e, "connectivity update failed");
            }
        }
        connectivity
    }

    /// Latest reply for `agent_id`, live or cached.
    pub async fn latest_reply(&self, agent_id: &AgentId) -> Option<String> {
        self.runtime.latest_reply(agent_id).await
    }

    /// Snapshot of every agent.
    pub async fn agents(&self) -> Vec<Agent> {
        self.runtime.registry().agents().await
    }

    /// Current discussion snapshot.
    pub async fn discussion(&self) -> Option<Discussion> {
        self.protocols.lock().await.discussion.clone()
    }

    /// Current mutual review snapshot.
    pub async fn review(&self) -> Option<MutualReview> {
        self.protocols.lock().await.review.clone()
    }

    /// Sends `text` to each target in order.
    pub async fn broadcast(&self, targets: &[AgentId], text: &str) -> Vec<DispatchOutcome> {
        let outbound = targets
            .iter()
            .map(|t| Outbound::new(t.clone(), text))
            .collect();
        self.deliver_all(outbound).await
    }

    /// Embeds the sources' replies after `prefix` and sends the result to every target.
    pub async fn cross_reference(
        &self,
        targets: &[AgentId],
        sources: &[AgentId],
        prefix: &str,
    ) -> Result<Vec<DispatchOutcome>> {
        let request = CrossReference::new(targets, sources, prefix)?;
        let replies = self.fetch_replies(request.sources()).await;

        let outbound = request.plan(&replies).inspect_err(|e| {
            warn!(error = %e, "cross-reference aborted");
        })?;
        Ok(self.deliver_all(outbound).await)
    }

    /// Starts a mutual review, replacing any earlier one.
    pub async fn mutual_review(
        &self,
        speakers: &[AgentId],
        reviewers: &[AgentId],
        prompt: &str,
    ) -> Result<Vec<DispatchOutcome>> {
        let plan = ReviewPlan::new(speakers, reviewers)?;
        let replies = self.fetch_replies(plan.speakers()).await;

        let (review, outbound) = plan.begin(&replies, prompt).inspect_err(|e| {
            warn!(error = %e, "mutual review aborted");
        })?;
        {
            let mut state = self.protocols.lock().await;
            state.review_since = self.runtime.registry().capture_seq();
            state.review = Some(review);
        }

        Ok(self.deliver_all(outbound).await)
    }

    /// Starts a discussion. Fails while another one is unfinished.
    pub async fn start_discussion(
        &self,
        topic: &str,
        participants: &[AgentId],
    ) -> Result<Vec<DispatchOutcome>> {
        let outbound = {
            let mut state = self.protocols.lock().await;
            if let Some(current) = &state.discussion {
                if current.phase() != DiscussionPhase::Complete {
                    return Err(ProtocolError::InvalidState {
                        action: "start a discussion",
                        phase: current.phase().to_string(),
                    }
                    .into());
                }
            }

            let (discussion, outbound) = Discussion::start(topic, participants)?;
            state.discussion_since = self.runtime.registry().capture_seq();
            state.discussion = Some(discussion);
            outbound
        };

        Ok(self.deliver_all(outbound).await)
    }

    /// Opens the next cross-evaluation round.
    pub async fn advance_discussion(&self) -> Result<Vec<DispatchOutcome>> {
        let outbound = {
            let mut state = self.protocols.lock().await;
            let discussion = state.discussion.as_mut().ok_or(ProtocolError::NoDiscussion)?;
            let outbound = discussion.advance().inspect_err(|e| {
                warn!(error = %e, "discussion advance refused");
            })?;
            state.discussion_since = self.runtime.registry().capture_seq();
            outbound
        };
        Ok(self.deliver_all(outbound).await)
    }

    /// Requests both participants' summaries.
    pub async fn summarize_discussion(&self) -> Result<Vec<DispatchOutcome>> {
        let outbound = {
            let mut state = self.protocols.lock().await;
            let discussion = state.discussion.as_mut().ok_or(ProtocolError::NoDiscussion)?;
            let outbound = discussion.summarize()?;
            state.discussion_since = self.runtime.registry().capture_seq();
            outbound
        };
        Ok(self.deliver_all(outbound).await)
    }

    /// Sends a user message to both participants with each other's latest reply.
    pub async fn interject(&self, message: &str) -> Result<Vec<DispatchOutcome>> {
        let [a, b] = {
            let state = self.protocols.lock().await;
            let discussion = state.discussion.as_ref().ok_or(ProtocolError::NoDiscussion)?;
            discussion.participants().clone()
        };

        let latest_a = self.runtime.latest_reply(&a).await;
        let latest_b = self.runtime.latest_reply(&b).await;

        let outbound = {
            let state = self.protocols.lock().await;
            let discussion = state.discussion.as_ref().ok_or(ProtocolError::NoDiscussion)?;
            discussion.interject(message, latest_a.as_deref(), latest_b.as_deref())?
        };
        Ok(self.deliver_all(outbound).await)
    }

    /// Drops the current discussion. Returns true if there was one.
    pub async fn reset_discussion(&self) -> bool {
        let dropped = self.protocols.lock().await.discussion.take();
        if let Some(discussion) = &dropped {
            info!(run = %discussion.id(), "discussion reset");
        }
        dropped.is_some()
    }

    /// Current status of agents and protocols.
    pub async fn status(&self) -> StatusReport {
        let agents = self.agents().await;
        let state = self.protocols.lock().await;
        StatusReport {
            agents,
            discussion: state.discussion.clone(),
            review: state.review.clone(),
        }
    }

    /// Executes a parsed command. `selection` stands in for missing targets.
    pub async fn execute(&self, command: Command, selection: &[AgentId]) -> Result<CommandReport> {
        let outcomes = match command {
            Command::Send { targets, text } => {
                let targets: &[AgentId] = if targets.is_empty() { selection } else { &targets[..] };
                if targets.is_empty() {
                    return Err(ProtocolError::InvalidParticipants(
                        "no target agents selected".to_string(),
                    )
                    .into());
                }
                self.broadcast(targets, &text).await
            }
            Command::CrossReference {
                targets,
                sources,
                prefix,
            } => self.cross_reference(&targets, &sources, &prefix).await?,
            Command::MutualReview { prompt } => {
                if selection.len() < 2 {
                    return Err(ProtocolError::InvalidParticipants(
                        "mutual review needs at least two selected agents".to_string(),
                    )
                    .into());
                }
                self.mutual_review(selection, selection, &prompt).await?
            }
            Command::StartDiscussion {
                participants,
                topic,
            } => self.start_discussion(&topic, &participants).await?,
            Command::NextRound => self.advance_discussion().await?,
            Command::Interject { text } => self.interject(&text).await?,
            Command::Summarize => self.summarize_discussion().await?,
            Command::ResetDiscussion => return Ok(CommandReport::Reset(self.reset_discussion().await)),
            Command::Status => return Ok(CommandReport::Status(self.status().await)),
        };
        Ok(CommandReport::Dispatched(outcomes))
    }

    /// Signals shutdown to the router and every capture session.
    pub fn shutdown(&self) {
        self.runtime.shutdown();
    }

    /// Fetches each agent's latest non-empty reply.
    async fn fetch_replies(&self, agents: &[AgentId]) -> HashMap<AgentId, String> {
        let mut replies = HashMap::with_capacity(agents.len());
        for agent_id in agents {
            if let Some(reply) = self.runtime.latest_reply(agent_id).await {
                replies.insert(agent_id.clone(), reply);
            }
        }
        replies
    }

    async fn deliver_all(&self, outbound: Vec<Outbound>) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(outbound.len());
        for message in outbound {
            let outcome = self.runtime.send(&message.agent_id, &message.text).await;
            if !outcome.success {
                warn!(
                    agent = %outcome.agent_id,
                    attempts = outcome.attempts,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "dispatch failed"
                );
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
