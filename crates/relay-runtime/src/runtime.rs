//! Main runtime manager.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use relay_adapters::AgentAdapter;
use relay_models::{AgentId, DispatchOutcome};

use crate::capture::CaptureEngine;
use crate::config::RuntimeConfig;
use crate::dispatch::DispatchChannel;
use crate::error::{Result, RuntimeError};
use crate::event::RuntimeEvent;
use crate::registry::AgentRegistry;

/// Owns the registry, the capture engine and the dispatch channel, and the
/// shutdown signal every capture session watches.
pub struct Runtime {
    config: RuntimeConfig,
    registry: Arc<AgentRegistry>,
    capture: CaptureEngine,
    dispatch: DispatchChannel,
    shutdown_tx: watch::Sender<bool>,
}

impl Runtime {
    /// Creates a runtime for the configured agent set.
    pub fn new<I>(config: RuntimeConfig, agents: I) -> Self
    where
        I: IntoIterator<Item = AgentId>,
    {
        let registry = Arc::new(AgentRegistry::new(agents, config.event_capacity));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let capture = CaptureEngine::new(Arc::clone(&registry), config.clone(), shutdown_rx);
        let dispatch = DispatchChannel::new(Arc::clone(&registry), config.clone());

        debug!(agents = registry.ids().len(), "runtime created");

        Self {
            config,
            registry,
            capture,
            dispatch,
            shutdown_tx,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the agent registry.
    pub fn registry(&self) -> Arc<AgentRegistry> {
        Arc::clone(&self.registry)
    }

    /// Returns the capture engine.
    pub fn capture(&self) -> &CaptureEngine {
        &self.capture
    }

    /// Returns the dispatch channel.
    pub fn dispatcher(&self) -> &DispatchChannel {
        &self.dispatch
    }

    /// Subscribe to runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.registry.subscribe()
    }

    /// Receiver that turns true on shutdown.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Attaches a session and marks the agent connected.
    pub async fn attach(&self, agent_id: &AgentId, adapter: Arc<dyn AgentAdapter>) -> Result<()> {
        self.ensure_running()?;
        self.registry.attach_adapter(agent_id, adapter).await?;
        self.registry.set_connected(agent_id, true).await?;
        Ok(())
    }

    /// Detaches a session and marks the agent disconnected.
    pub async fn detach(&self, agent_id: &AgentId) -> Result<()> {
        self.registry.detach_adapter(agent_id).await;
        self.registry.set_connected(agent_id, false).await?;
        Ok(())
    }

    /// Dispatches `text` and, once delivered, starts capturing the reply.
    pub async fn send(&self, agent_id: &AgentId, text: &str) -> DispatchOutcome {
        if self.is_shut_down() {
            return DispatchOutcome::failed(agent_id.clone(), RuntimeError::ShutDown.to_string(), 0);
        }

        let outcome = self.dispatch.dispatch(agent_id, text).await;
        if outcome.success {
            self.capture.start_capture(agent_id).await;
        }
        outcome
    }

    /// Latest reply: live extraction when the session is ready, the cache otherwise.
    pub async fn latest_reply(&self, agent_id: &AgentId) -> Option<String> {
        if let Some(adapter) = self.registry.adapter(agent_id).await {
            if adapter.is_ready().await {
                if let Some(text) = adapter.extract_latest_reply().await.filter(|t| !t.is_empty()) {
                    return Some(text);
                }
            }
        }
        self.registry.cached_reply(agent_id).await
    }

    /// Signals every capture session to stop.
    pub fn shutdown(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!("runtime shutting down");
        }
    }

    /// Returns true once shutdown was signalled.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            Err(RuntimeError::ShutDown)
        } else {
            Ok(())
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}
