//! Agent adapter for terminal chat sessions hosted in tmux.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, warn};

use relay_adapters::patterns::{any_match, strip_noise, terminal};
use relay_adapters::{AdapterError, AdapterInfo, AgentAdapter, Result};
use relay_models::AgentId;

use crate::orchestrator::TmuxOrchestrator;
use crate::TmuxError;

/// Scrollback lines captured per poll.
const DEFAULT_CAPTURE_LINES: u32 = 200;

/// Drives one agent's tmux session.
pub struct TmuxAgentAdapter {
    info: AdapterInfo,
    tmux: Arc<TmuxOrchestrator>,
    capture_lines: u32,
    /// First line of the last injected text, used to find where the reply starts.
    last_sent: Mutex<Option<String>>,
}

impl TmuxAgentAdapter {
    /// Creates an adapter for `session`.
    pub fn new(
        agent_id: impl Into<AgentId>,
        session: impl Into<String>,
        tmux: Arc<TmuxOrchestrator>,
    ) -> Self {
        Self {
            info: AdapterInfo {
                agent_id: agent_id.into(),
                kind: "tmux".to_string(),
                location: session.into(),
            },
            tmux,
            capture_lines: DEFAULT_CAPTURE_LINES,
            last_sent: Mutex::new(None),
        }
    }

    /// Sets how much scrollback each poll captures.
    pub fn with_capture_lines(mut self, lines: u32) -> Self {
        self.capture_lines = lines;
        self
    }

    fn session(&self) -> &str {
        &self.info.location
    }

    fn capture(&self) -> Option<String> {
        match self.tmux.capture_output(self.session(), self.capture_lines) {
            Ok(output) => Some(output),
            Err(e) => {
                debug!(session = %self.session(), error = %e, "capture failed");
                None
            }
        }
    }

    fn last_sent(&self) -> Option<String> {
        self.last_sent.lock().ok().and_then(|guard| guard.clone())
    }
}

fn channel_error(e: TmuxError) -> AdapterError {
    match e {
        TmuxError::SessionNotFound(session) => {
            AdapterError::NotReady(format!("session '{}' not found", session))
        }
        other => AdapterError::Channel(other.to_string()),
    }
}

/// The line that closes the echo of `text` in the pane.
///
/// Pasted multi-line text echoes in full, so the reply starts after its
/// last non-empty line.
fn echo_anchor(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Returns the reply rendered after the last occurrence of `anchor`.
fn reply_after(output: &str, anchor: Option<&str>) -> Option<String> {
    let tail = match anchor {
        Some(anchor) if !anchor.is_empty() => match output.rfind(anchor) {
            Some(pos) => {
                let rest = &output[pos + anchor.len()..];
                rest.split_once('\n').map(|(_, after)| after).unwrap_or("")
            }
            None => output,
        },
        _ => output,
    };

    let reply = strip_noise(tail);
    if reply.is_empty() {
        None
    } else {
        Some(reply)
    }
}

/// Idle if the last meaningful line is a completion marker and nothing is still running.
fn shows_completion(output: &str) -> bool {
    if output.to_lowercase().contains("esc to interrupt") {
        return false;
    }
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| any_match(line, terminal::completion_patterns()))
        .unwrap_or(false)
}

#[async_trait]
impl AgentAdapter for TmuxAgentAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    async fn is_ready(&self) -> bool {
        self.tmux.session_exists(self.session())
    }

    async fn locate_input(&self) -> Result<()> {
        // The pane itself is the input; clear any half-typed line.
        self.tmux
            .send_keys(self.session(), "C-u")
            .map_err(channel_error)
    }

    async fn inject_text(&self, text: &str) -> Result<()> {
        let result = if text.contains('\n') {
            self.tmux.paste_text(self.session(), text)
        } else {
            self.tmux.send_literal(self.session(), text)
        };
        result.map_err(channel_error)?;

        if let Ok(mut guard) = self.last_sent.lock() {
            *guard = echo_anchor(text);
        }
        Ok(())
    }

    async fn locate_submit(&self) -> Result<()> {
        if self.tmux.session_exists(self.session()) {
            Ok(())
        } else {
            Err(AdapterError::SubmitNotFound)
        }
    }

    async fn wait_until_enabled(&self) -> Result<()> {
        Ok(())
    }

    async fn activate_submit(&self) -> Result<()> {
        self.tmux
            .send_keys(self.session(), "Enter")
            .map_err(channel_error)
    }

    async fn extract_latest_reply(&self) -> Option<String> {
        let output = self.capture()?;
        let anchor = self.last_sent();
        reply_after(&output, anchor.as_deref())
    }

    async fn detect_completion_hint(&self) -> bool {
        match self.capture() {
            Some(output) => shows_completion(&output),
            None => {
                warn!(session = %self.session(), "no output for completion check");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_after_anchor() {
        let output = "> old question\nold answer\n> what is 6*7?\n42 is the answer.\n\n>";

        assert_eq!(
            reply_after(output, Some("what is 6*7?")).as_deref(),
            Some("42 is the answer.")
        );
    }

    #[test]
    fn test_pasted_block_echo_is_not_part_of_reply() {
        let sent = "please compare\n\n<claude_response>\nold claude text\n</claude_response>\n";
        let output = "> please compare\n\n<claude_response>\nold claude text\n</claude_response>\n\
                      Gemini's actual answer\n\n>";

        let anchor = echo_anchor(sent);
        assert_eq!(anchor.as_deref(), Some("</claude_response>"));
        assert_eq!(
            reply_after(output, anchor.as_deref()).as_deref(),
            Some("Gemini's actual answer")
        );
    }

    #[test]
    fn test_echo_anchor_of_single_line() {
        assert_eq!(echo_anchor("  what is 6*7?  ").as_deref(), Some("what is 6*7?"));
        assert_eq!(echo_anchor("\n \n"), None);
    }

    #[test]
    fn test_reply_after_missing_anchor_uses_whole_output() {
        let output = "some reply\n╭──╮";
        assert_eq!(reply_after(output, Some("not there")).as_deref(), Some("some reply"));
        assert_eq!(reply_after(output, None).as_deref(), Some("some reply"));
    }

    #[test]
    fn test_reply_after_nothing_rendered_yet() {
        let output = "> what is 6*7?\n⠋ Thinking";
        assert_eq!(reply_after(output, Some("what is 6*7?")), None);
    }

    #[test]
    fn test_shows_completion() {
        assert!(shows_completion("answer\n\n> \n"));
        assert!(shows_completion("answer\n[IDLE]"));
        assert!(!shows_completion("answer\n⠋ Working (esc to interrupt)\n> "));
        assert!(!shows_completion("still streaming"));
    }

    #[test]
    fn test_channel_error_maps_missing_session_to_transient() {
        let err = channel_error(TmuxError::SessionNotFound("relay-claude".into()));
        assert!(err.is_transient());

        let err = channel_error(TmuxError::CommandFailed { subcommand: "send-keys".into(), stderr: "boom".into() });
        assert!(!err.is_transient());
    }

    #[tokio::test]
    #[ignore]
    async fn test_adapter_against_live_session() {
        let tmux = Arc::new(TmuxOrchestrator::new().unwrap());
        let adapter = TmuxAgentAdapter::new("claude", "relay-missing-12345", tmux);

        assert!(!adapter.is_ready().await);
        assert!(adapter.deliver("hi").await.unwrap_err().is_transient());
    }
}
