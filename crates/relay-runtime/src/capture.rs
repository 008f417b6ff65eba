//! Capture engine: decides when an agent's streamed reply is final.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use relay_adapters::AgentAdapter;
use relay_models::AgentId;

use crate::config::RuntimeConfig;
use crate::registry::AgentRegistry;
use crate::stability::{PollVerdict, StabilityTracker};

/// Starts and runs per-agent capture sessions.
#[derive(Clone)]
pub struct CaptureEngine {
    registry: Arc<AgentRegistry>,
    config: RuntimeConfig,
    shutdown: watch::Receiver<bool>,
}

impl CaptureEngine {
    /// Creates an engine whose sessions stop when `shutdown` turns true.
    pub fn new(
        registry: Arc<AgentRegistry>,
        config: RuntimeConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            config,
            shutdown,
        }
    }

    /// Starts a capture session for `agent_id`.
    ///
    /// Returns false without doing anything if a session is already live
    /// for the agent, the agent has no attached session, or the runtime is
    /// shutting down.
    pub async fn start_capture(&self, agent_id: &AgentId) -> bool {
        if *self.shutdown.borrow() {
            return false;
        }

        let Some(adapter) = self.registry.try_begin_capture(agent_id).await else {
            trace!(agent = %agent_id, "capture not started");
            return false;
        };

        debug!(agent = %agent_id, "capture started");
        let session = CaptureSession {
            agent_id: agent_id.clone(),
            adapter,
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
        };
        tokio::spawn(session.run());
        true
    }
}

struct CaptureSession {
    agent_id: AgentId,
    adapter: Arc<dyn AgentAdapter>,
    registry: Arc<AgentRegistry>,
    config: RuntimeConfig,
    shutdown: watch::Receiver<bool>,
}

impl CaptureSession {
    async fn run(mut self) {
        let started = Instant::now();
        let poll = self.config.poll_interval;
        let mut ticker = interval_at(started + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = sleep_until(started + self.config.capture_timeout);
        tokio::pin!(deadline);

        let mut tracker = StabilityTracker::new(self.config.stable_threshold);

        loop {
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        debug!(agent = %self.agent_id, "capture cancelled");
                        break;
                    }
                }
                _ = &mut deadline => {
                    debug!(
                        agent = %self.agent_id,
                        timeout_secs = self.config.capture_timeout.as_secs(),
                        "capture abandoned"
                    );
                    break;
                }
                _ = ticker.tick() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                    if self.poll(&mut tracker).await {
                        break;
                    }
                }
            }
        }

        self.registry.end_capture(&self.agent_id).await;
    }

    /// Runs one poll. Returns true once a new reply has been recorded.
    async fn poll(&self, tracker: &mut StabilityTracker) -> bool {
        let text = self.adapter.extract_latest_reply().await;
        let hint = self.adapter.detect_completion_hint().await;

        match tracker.observe(text.as_deref(), hint) {
            PollVerdict::Pending => {
                trace!(agent = %self.agent_id, stable = tracker.stable_count(), "polled");
                false
            }
            PollVerdict::Stable(content) => {
                if self.registry.record_capture(&self.agent_id, &content).await {
                    true
                } else {
                    // Still showing the cached reply; wait for a new one.
                    tracker.reset();
                    false
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
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::time::sleep;

    use crate::event::RuntimeEvent;

    struct Harness {
        registry: Arc<AgentRegistry>,
        adapter: Arc<ScriptedAdapter>,
        engine: CaptureEngine,
        shutdown_tx: watch::Sender<bool>,
        agent: AgentId,
    }

    async fn harness(config: RuntimeConfig) -> Harness {
        let agent = AgentId::from("claude");
        let registry = Arc::new(AgentRegistry::new(vec![agent.clone()], 16));
        let adapter = Arc::new(ScriptedAdapter::new("claude"));
        registry.attach_adapter(&agent, adapter.clone()).await.unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = CaptureEngine::new(Arc::clone(&registry), config, shutdown_rx);

        Harness {
            registry,
            adapter,
            engine,
            shutdown_tx,
            agent,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_fires_on_eighth_poll() {
        let h = harness(RuntimeConfig::default()).await;
        h.adapter
            .push_replies(["a", "ab", "abc", "abcd", "abcd", "abcd", "abcd", "abcd"]);
        let mut rx = h.registry.subscribe();

        assert!(h.engine.start_capture(&h.agent).await);

        sleep(Duration::from_millis(3_750)).await;
        assert_eq!(h.adapter.extract_calls(), 7);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        sleep(Duration::from_millis(500)).await;
        assert_eq!(h.adapter.extract_calls(), 8);
        assert_eq!(
            rx.try_recv().unwrap(),
            RuntimeEvent::ReplyCaptured { agent_id: h.agent.clone(), content: "abcd".into(), seq: 1 }
        );
        assert!(!h.registry.is_capturing(&h.agent).await);
        assert_eq!(h.registry.cached_reply(&h.agent).await.as_deref(), Some("abcd"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_active_is_noop() {
        let h = harness(RuntimeConfig::default()).await;
        h.adapter.push_empty();

        assert!(h.engine.start_capture(&h.agent).await);
        assert!(!h.engine.start_capture(&h.agent).await);

        sleep(Duration::from_millis(1_250)).await;
        // One session polling, not two.
        assert_eq!(h.adapter.extract_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_hint_concludes_early() {
        let h = harness(RuntimeConfig::default()).await;
        h.adapter.push_replies(["partial", "done"]);
        h.adapter.push_hints([false, true]);
        let mut rx = h.registry.subscribe();

        h.engine.start_capture(&h.agent).await;
        sleep(Duration::from_millis(1_100)).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            RuntimeEvent::ReplyCaptured { agent_id: h.agent.clone(), content: "done".into(), seq: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_reply_emits_nothing_and_keeps_waiting() {
        let h = harness(RuntimeConfig::default()).await;
        h.registry
            .seed([(h.agent.clone(), Some("hello".to_string()))].into_iter().collect())
            .await;
        h.adapter.push_replies(["hello"]);
        let mut rx = h.registry.subscribe();

        h.engine.start_capture(&h.agent).await;
        sleep(Duration::from_secs(5)).await;

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(h.registry.cached_reply(&h.agent).await.as_deref(), Some("hello"));
        assert!(h.registry.is_capturing(&h.agent).await);

        h.adapter.push_replies(["hello again"]);
        sleep(Duration::from_secs(3)).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            RuntimeEvent::ReplyCaptured { agent_id: h.agent.clone(), content: "hello again".into(), seq: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_abandoned_at_ceiling() {
        let config = RuntimeConfig::default().with_capture_timeout(Duration::from_secs(2));
        let h = harness(config).await;
        h.adapter.push_empty();
        let mut rx = h.registry.subscribe();

        h.engine.start_capture(&h.agent).await;
        sleep(Duration::from_millis(2_200)).await;

        assert!(!h.registry.is_capturing(&h.agent).await);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        let polls = h.adapter.extract_calls();
        sleep(Duration::from_secs(2)).await;
        assert_eq!(h.adapter.extract_calls(), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_within_a_tick() {
        let h = harness(RuntimeConfig::default()).await;
        h.adapter.push_replies(["a", "ab", "abc", "abcd", "abcd"]);
        let mut rx = h.registry.subscribe();

        h.engine.start_capture(&h.agent).await;
        sleep(Duration::from_millis(1_250)).await;
        h.shutdown_tx.send(true).unwrap();
        sleep(Duration::from_millis(500)).await;

        assert!(!h.registry.is_capturing(&h.agent).await);
        let polls = h.adapter.extract_calls();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(h.adapter.extract_calls(), polls);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // No new sessions once shut down.
        assert!(!h.engine.start_capture(&h.agent).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_session_without_adapter() {
        let agent = AgentId::from("gemini");
        let registry = Arc::new(AgentRegistry::new(vec![agent.clone()], 16));
        let (_tx, rx) = watch::channel(false);
        let engine = CaptureEngine::new(registry, RuntimeConfig::default(), rx);

        assert!(!engine.start_capture(&agent).await);
        assert!(!engine.start_capture(&AgentId::from("unknown")).await);
    }
}
