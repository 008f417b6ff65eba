//! Core trait for agent adapters.
//!
//! The `AgentAdapter` trait is the boundary between the orchestration core
//! and whatever actually hosts an agent's session. Locating controls and
//! scraping reply text is adapter business; the core only sequences the
//! capabilities and interprets their results.

use async_trait::async_trait;
use tracing::trace;

use relay_models::AgentId;

use crate::error::{AdapterError, Result};

/// Information about an adapter instance.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Agent this adapter drives.
    pub agent_id: AgentId,
    /// Adapter kind (e.g. "tmux").
    pub kind: String,
    /// Where the session lives (tmux session name, page URL, ...).
    pub location: String,
}

/// Trait for agent adapters.
///
/// Each adapter knows how to:
/// - Report whether its session can accept input
/// - Inject text into the input control and activate submit
/// - Extract the text of the latest rendered reply
/// - Optionally detect an explicit "reply finished" hint
///
/// # Example
///
/// ```ignore
/// use relay_adapters::AgentAdapter;
///
/// async fn send(adapter: &dyn AgentAdapter, text: &str) {
///     match adapter.deliver(text).await {
///         Ok(()) => println!("sent to {}", adapter.info().agent_id),
///         Err(e) if e.is_transient() => println!("not ready yet: {}", e),
///         Err(e) => println!("failed: {}", e),
///     }
/// }
/// ```
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Returns information about this adapter.
    fn info(&self) -> &AdapterInfo;

    /// Returns true once the session can accept input.
    async fn is_ready(&self) -> bool;

    /// Locates the input control.
    async fn locate_input(&self) -> Result<()>;

    /// Replaces the input control's content with `text`.
    async fn inject_text(&self, text: &str) -> Result<()>;

    /// Locates the submit control.
    async fn locate_submit(&self) -> Result<()>;

    /// Waits (bounded) for the submit control to become enabled.
    async fn wait_until_enabled(&self) -> Result<()>;

    /// Activates the submit control.
    async fn activate_submit(&self) -> Result<()>;

    /// Extracts the text of the latest rendered reply.
    async fn extract_latest_reply(&self) -> Option<String>;

    /// Returns true if the session shows an explicit completion marker.
    async fn detect_completion_hint(&self) -> bool {
        false
    }

    /// Runs one full delivery: inject `text` and submit it.
    async fn deliver(&self, text: &str) -> Result<()> {
        if !self.is_ready().await {
            return Err(AdapterError::NotReady(format!(
                "{} is not accepting input",
                self.info().location
            )));
        }

        self.locate_input().await?;
        self.inject_text(text).await?;
        self.locate_submit().await?;
        self.wait_until_enabled().await?;
        self.activate_submit().await?;

        trace!(agent = %self.info().agent_id, len = text.len(), "delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAdapter;

    #[tokio::test]
    async fn test_deliver_runs_all_steps() {
        let adapter = ScriptedAdapter::new("claude");

        adapter.deliver("hello").await.unwrap();

        assert_eq!(adapter.delivered(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_deliver_not_ready_is_transient() {
        let adapter = ScriptedAdapter::new("claude");
        adapter.set_ready(false);

        let err = adapter.deliver("hello").await.unwrap_err();

        assert!(err.is_transient());
        assert!(adapter.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_missing_input() {
        let adapter = ScriptedAdapter::new("claude");
        adapter.set_input_present(false);

        let err = adapter.deliver("hello").await.unwrap_err();

        assert_eq!(err, AdapterError::InputNotFound);
    }

    #[tokio::test]
    async fn test_deliver_missing_submit() {
        let adapter = ScriptedAdapter::new("claude");
        adapter.set_submit_present(false);

        let err = adapter.deliver("hello").await.unwrap_err();

        assert_eq!(err, AdapterError::SubmitNotFound);
        assert!(adapter.delivered().is_empty());
    }
}
