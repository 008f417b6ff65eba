//! Process-wide registry of agent state.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use relay_adapters::AgentAdapter;
use relay_models::{Agent, AgentId, ConnectionState};

use crate::error::{Result, RuntimeError};
use crate::event::RuntimeEvent;

/// Registry slot for one configured agent.
pub struct AgentEntry {
    /// Agent state.
    pub agent: Agent,
    /// Attached session, if any.
    pub adapter: Option<Arc<dyn AgentAdapter>>,
    /// A capture session is live.
    pub capturing: bool,
    /// A delivery is in flight.
    pub sending: bool,
    /// Sequence number of the cached reply; 0 when seeded or empty.
    pub capture_seq: u64,
}

impl fmt::Debug for AgentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentEntry")
            .field("agent", &self.agent)
            .field("adapter", &self.adapter.as_ref().map(|a| a.info().location.clone()))
            .field("capturing", &self.capturing)
            .field("sending", &self.sending)
            .field("capture_seq", &self.capture_seq)
            .finish()
    }
}

impl AgentEntry {
    fn new(id: AgentId) -> Self {
        Self {
            agent: Agent::new(id),
            adapter: None,
            capturing: false,
            sending: false,
            capture_seq: 0,
        }
    }
}

/// Owns every agent's connectivity, cached reply and per-agent flags.
///
/// The set of agents is fixed at construction. Observers subscribe to a
/// broadcast of [`RuntimeEvent`]s. Every recorded capture gets the next
/// value of a registry-wide sequence, so observers can tell captures made
/// before a point in time from those made after it.
pub struct AgentRegistry {
    /// Agent IDs in configuration order.
    order: Vec<AgentId>,
    entries: RwLock<HashMap<AgentId, AgentEntry>>,
    event_tx: broadcast::Sender<RuntimeEvent>,
    capture_seq: AtomicU64,
}

impl AgentRegistry {
    /// Creates a registry for `ids`, deduplicated in order.
    pub fn new<I>(ids: I, event_capacity: usize) -> Self
    where
        I: IntoIterator<Item = AgentId>,
    {
        let mut order: Vec<AgentId> = Vec::new();
        for id in ids {
            if !order.contains(&id) {
                order.push(id);
            }
        }
        let entries = order
            .iter()
            .map(|id| (id.clone(), AgentEntry::new(id.clone())))
            .collect();
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));

        Self {
            order,
            entries: RwLock::new(entries),
            event_tx,
            capture_seq: AtomicU64::new(0),
        }
    }

    /// Agent IDs in configuration order.
    pub fn ids(&self) -> &[AgentId] {
        &self.order
    }

    /// Returns true if `id` is configured.
    pub fn contains(&self, id: &AgentId) -> bool {
        self.order.contains(id)
    }

    /// Subscribe to runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit_event(&self, event: RuntimeEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Attaches the session that serves `id`.
    pub async fn attach_adapter(&self, id: &AgentId, adapter: Arc<dyn AgentAdapter>) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RuntimeError::AgentNotFound(id.clone()))?;

        debug!(agent = %id, location = %adapter.info().location, "adapter attached");
        entry.adapter = Some(adapter);
        Ok(())
    }

    /// Detaches the agent's session, if any.
    pub async fn detach_adapter(&self, id: &AgentId) -> Option<Arc<dyn AgentAdapter>> {
        let mut entries = self.entries.write().await;
        let adapter = entries.get_mut(id).and_then(|e| e.adapter.take());
        if adapter.is_some() {
            debug!(agent = %id, "adapter detached");
        }
        adapter
    }

    /// Returns the agent's attached session.
    pub async fn adapter(&self, id: &AgentId) -> Option<Arc<dyn AgentAdapter>> {
        let entries = self.entries.read().await;
        entries.get(id).and_then(|e| e.adapter.clone())
    }

    /// Updates connectivity, emitting an event when it changes.
    pub async fn set_connected(&self, id: &AgentId, connected: bool) -> Result<bool> {
        let state = ConnectionState::from_connected(connected);
        let changed = {
            let mut entries = self.entries.write().await;
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| RuntimeError::AgentNotFound(id.clone()))?;
            let changed = entry.agent.connection_state != state;
            entry.agent.connection_state = state;
            changed
        };

        if changed {
            info!(agent = %id, connected, "connectivity changed");
            self.emit_event(RuntimeEvent::ConnectivityChanged {
                agent_id: id.clone(),
                connected,
            });
        }
        Ok(changed)
    }

    /// Returns a snapshot of one agent.
    pub async fn agent(&self, id: &AgentId) -> Option<Agent> {
        let entries = self.entries.read().await;
        entries.get(id).map(|e| e.agent.clone())
    }

    /// Returns snapshots of every agent in configuration order.
    pub async fn agents(&self) -> Vec<Agent> {
        let entries = self.entries.read().await;
        self.order
            .iter()
            .filter_map(|id| entries.get(id).map(|e| e.agent.clone()))
            .collect()
    }

    /// Returns the agent's cached reply.
    pub async fn cached_reply(&self, id: &AgentId) -> Option<String> {
        let entries = self.entries.read().await;
        entries.get(id).and_then(|e| e.agent.last_captured_reply.clone())
    }

    /// Seeds cached replies from persisted state. Unknown agents are skipped.
    pub async fn seed(&self, replies: HashMap<AgentId, Option<String>>) {
        let mut entries = self.entries.write().await;
        for (id, reply) in replies {
            match entries.get_mut(&id) {
                Some(entry) => entry.agent.last_captured_reply = reply,
                None => debug!(agent = %id, "skipping persisted reply for unknown agent"),
            }
        }
    }

    /// Records a concluded capture.
    ///
    /// Returns false and emits nothing when `content` equals the cached
    /// reply. Otherwise updates the cache, assigns the next capture
    /// sequence number and emits `ReplyCaptured`.
    pub async fn record_capture(&self, id: &AgentId, content: &str) -> bool {
        let seq = {
            let mut entries = self.entries.write().await;
            match entries.get_mut(id) {
                Some(entry) => {
                    if entry.agent.record_reply(content) {
                        let seq = self.capture_seq.fetch_add(1, Ordering::SeqCst) + 1;
                        entry.capture_seq = seq;
                        Some(seq)
                    } else {
                        None
                    }
                }
                None => None,
            }
        };

        match seq {
            Some(seq) => {
                info!(agent = %id, seq, len = content.len(), "reply captured");
                self.emit_event(RuntimeEvent::ReplyCaptured {
                    agent_id: id.clone(),
                    content: content.to_string(),
                    seq,
                });
                true
            }
            None => {
                debug!(agent = %id, "captured reply unchanged");
                false
            }
        }
    }

    /// Sequence number of the most recent capture; 0 before any.
    pub fn capture_seq(&self) -> u64 {
        self.capture_seq.load(Ordering::SeqCst)
    }

    /// The cached reply with its sequence number, if it was captured in
    /// this process.
    pub async fn last_capture(&self, id: &AgentId) -> Option<(u64, String)> {
        let entries = self.entries.read().await;
        let entry = entries.get(id)?;
        if entry.capture_seq == 0 {
            return None;
        }
        entry
            .agent
            .last_captured_reply
            .clone()
            .map(|reply| (entry.capture_seq, reply))
    }

    /// Clears the agent's cached reply.
    pub async fn clear_reply(&self, id: &AgentId) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(id) {
            entry.agent.last_captured_reply = None;
            entry.agent.last_captured_at = None;
            entry.capture_seq = 0;
        }
    }

    /// Marks a capture live. Returns the adapter, or `None` if the agent
    /// has no session or a capture is already running.
    pub async fn try_begin_capture(&self, id: &AgentId) -> Option<Arc<dyn AgentAdapter>> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id)?;
        if entry.capturing {
            return None;
        }
        let adapter = entry.adapter.clone()?;
        entry.capturing = true;
        Some(adapter)
    }

    /// Marks the agent's capture finished.
    pub async fn end_capture(&self, id: &AgentId) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(id) {
            entry.capturing = false;
        }
    }

    /// Returns true if a capture is live for the agent.
    pub async fn is_capturing(&self, id: &AgentId) -> bool {
        let entries = self.entries.read().await;
        entries.get(id).map(|e| e.capturing).unwrap_or(false)
    }

    /// Marks a delivery in flight and returns the adapter to deliver with.
    pub async fn try_begin_send(&self, id: &AgentId) -> Result<Arc<dyn AgentAdapter>> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RuntimeError::AgentNotFound(id.clone()))?;
        let adapter = entry
            .adapter
            .clone()
            .ok_or_else(|| RuntimeError::AgentNotFound(id.clone()))?;
        if entry.sending {
            return Err(RuntimeError::AgentBusy(id.clone()));
        }
        entry.sending = true;
        Ok(adapter)
    }

    /// Marks the agent's delivery finished.
    pub async fn end_send(&self, id: &AgentId) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(id) {
            entry.sending = false;
        }
    }
}
