//! Dispatch channel: one message to one agent with bounded retry.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use relay_adapters::AgentAdapter;
use relay_models::{AgentId, DispatchOutcome};

use crate::config::RuntimeConfig;
use crate::event::RuntimeEvent;
use crate::registry::AgentRegistry;

/// Delivers messages through the registry's attached adapters.
#[derive(Clone)]
pub struct DispatchChannel {
    registry: Arc<AgentRegistry>,
    config: RuntimeConfig,
}

impl DispatchChannel {
    /// Creates a channel over `registry`.
    pub fn new(registry: Arc<AgentRegistry>, config: RuntimeConfig) -> Self {
        Self { registry, config }
    }

    /// Delivers `text` to `agent_id`.
    ///
    /// Unknown agents, agents without a session, and agents with a delivery
    /// already in flight fail with zero attempts. Transient adapter errors
    /// are retried up to the configured attempt count; anything else fails
    /// at once. Every outcome is broadcast as `DispatchCompleted`.
    pub async fn dispatch(&self, agent_id: &AgentId, text: &str) -> DispatchOutcome {
        let outcome = match self.registry.try_begin_send(agent_id).await {
            Ok(adapter) => {
                let outcome = self.deliver_with_retry(agent_id, adapter.as_ref(), text).await;
                self.registry.end_send(agent_id).await;
                outcome
            }
            Err(e) => {
                warn!(agent = %agent_id, error = %e, "dispatch rejected");
                DispatchOutcome::failed(agent_id.clone(), e.to_string(), 0)
            }
        };

        self.registry
            .emit_event(RuntimeEvent::DispatchCompleted(outcome.clone()));
        outcome
    }

    async fn deliver_with_retry(
        &self,
        agent_id: &AgentId,
        adapter: &dyn AgentAdapter,
        text: &str,
    ) -> DispatchOutcome {
        let max_attempts = self.config.max_dispatch_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(agent = %agent_id, attempt, max_attempts, len = text.len(), "dispatch attempt");

            match adapter.deliver(text).await {
                Ok(()) => {
                    info!(agent = %agent_id, attempt, "dispatch delivered");
                    return DispatchOutcome::delivered(agent_id.clone(), attempt);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(agent = %agent_id, attempt, error = %e, "dispatch failed, retrying");
                    sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    warn!(agent = %agent_id, attempt, error = %e, "dispatch failed");
                    return DispatchOutcome::failed(agent_id.clone(), e.to_string(), attempt);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use relay_adapters::testing::ScriptedAdapter;
    use relay_adapters::AdapterError;
    use tokio::time::Instant;

    async fn channel_with(adapter: Arc<ScriptedAdapter>) -> (DispatchChannel, Arc<AgentRegistry>) {
        let agent = adapter.info().agent_id.clone();
        let registry = Arc::new(AgentRegistry::new(vec![agent.clone()], 16));
        registry.attach_adapter(&agent, adapter).await.unwrap();
        let channel = DispatchChannel::new(Arc::clone(&registry), RuntimeConfig::default());
        (channel, registry)
    }

    fn not_ready() -> relay_adapters::Result<()> {
        Err(AdapterError::NotReady("page loading".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_delivers_first_try() {
        let adapter = Arc::new(ScriptedAdapter::new("claude"));
        let (channel, registry) = channel_with(adapter.clone()).await;
        let mut rx = registry.subscribe();

        let outcome = channel.dispatch(&AgentId::from("claude"), "hello").await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(adapter.delivered(), vec!["hello".to_string()]);
        assert_eq!(rx.try_recv().unwrap(), RuntimeEvent::DispatchCompleted(outcome));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_unknown_agent_zero_attempts() {
        let adapter = Arc::new(ScriptedAdapter::new("claude"));
        let (channel, registry) = channel_with(adapter.clone()).await;
        let mut rx = registry.subscribe();

        let outcome = channel.dispatch(&AgentId::from("nobody"), "hello").await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(outcome.error.as_deref(), Some("agent not found: nobody"));
        assert_eq!(adapter.submit_calls(), 0);
        assert!(rx.try_recv().unwrap().is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_retries_transient_errors_three_times() {
        let adapter = Arc::new(ScriptedAdapter::new("claude"));
        adapter.push_submit_results([not_ready(), not_ready(), not_ready()]);
        let (channel, _registry) = channel_with(adapter.clone()).await;
        let started = Instant::now();

        let outcome = channel.dispatch(&AgentId::from("claude"), "hello").await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(adapter.submit_calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert!(outcome.error.unwrap().contains("not ready"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_recovers_after_transient_error() {
        let adapter = Arc::new(ScriptedAdapter::new("claude"));
        adapter.push_submit_results([not_ready()]);
        let (channel, _registry) = channel_with(adapter.clone()).await;

        let outcome = channel.dispatch(&AgentId::from("claude"), "hello").await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(adapter.delivered(), vec!["hello".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_permanent_error_fails_immediately() {
        let adapter = Arc::new(ScriptedAdapter::new("claude"));
        adapter.set_input_present(false);
        let (channel, _registry) = channel_with(adapter.clone()).await;

        let outcome = channel.dispatch(&AgentId::from("claude"), "hello").await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.error.as_deref(), Some("could not find input field"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_releases_send_guard() {
        let adapter = Arc::new(ScriptedAdapter::new("claude"));
        adapter.set_submit_present(false);
        let (channel, _registry) = channel_with(adapter.clone()).await;
        let claude = AgentId::from("claude");

        assert!(!channel.dispatch(&claude, "one").await.success);

        adapter.set_submit_present(true);
        let outcome = channel.dispatch(&claude, "two").await;
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
    }
}
