//! Thin wrapper around the tmux binary.

use std::path::PathBuf;
use std::process::{Command, Output};

use tracing::{debug, trace, warn};

use crate::{Result, TmuxError, TmuxSession};

/// Runs tmux commands against agent sessions.
#[derive(Debug, Clone)]
pub struct TmuxOrchestrator {
    /// Path to tmux binary.
    tmux_path: PathBuf,
}

impl TmuxOrchestrator {
    /// Create a new TmuxOrchestrator.
    ///
    /// # Errors
    ///
    /// Returns `TmuxError::BinaryMissing` if tmux is not installed.
    pub fn new() -> Result<Self> {
        let tmux_path = Self::find_tmux()?;
        debug!(path = %tmux_path.display(), "tmux found");
        Ok(Self { tmux_path })
    }

    /// Check if tmux is available in PATH.
    pub fn is_available() -> bool {
        Self::find_tmux().is_ok()
    }

    fn find_tmux() -> Result<PathBuf> {
        which::which("tmux").map_err(|_| TmuxError::BinaryMissing)
    }

    fn run_tmux(&self, args: &[&str]) -> Result<Output> {
        trace!(args = ?args, "running tmux command");
        let output = Command::new(&self.tmux_path).args(args).output()?;
        trace!(status = %output.status, stdout_len = output.stdout.len(), "tmux command completed");
        Ok(output)
    }

    fn run_tmux_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run_tmux(args)?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(TmuxError::CommandFailed {
                subcommand: args.first().copied().unwrap_or_default().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn ensure_session(&self, session: &str) -> Result<()> {
        if self.session_exists(session) {
            Ok(())
        } else {
            Err(TmuxError::SessionNotFound(session.to_string()))
        }
    }

    /// Lists open sessions. A missing tmux server means no sessions.
    pub fn list_sessions(&self) -> Result<Vec<TmuxSession>> {
        let output = self.run_tmux(&[
            "list-sessions",
            "-F",
            "#{session_name}:#{session_created}:#{session_attached}",
        ])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no server running") || stderr.contains("no sessions") {
                return Ok(Vec::new());
            }
            return Err(TmuxError::CommandFailed {
                subcommand: "list-sessions".to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let sessions = stdout
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| match TmuxSession::parse(line) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(line = %line, error = %e, "failed to parse session");
                    None
                }
            })
            .collect();

        Ok(sessions)
    }

    /// Check if a session exists.
    pub fn session_exists(&self, name: &str) -> bool {
        let output = self.run_tmux(&["has-session", "-t", name]);
        matches!(output, Ok(o) if o.status.success())
    }

    /// Types `text` into the session literally, without pressing Enter.
    pub fn send_literal(&self, session: &str, text: &str) -> Result<()> {
        debug!(session = %session, len = text.len(), "sending literal text");
        self.ensure_session(session)?;
        self.run_tmux_checked(&["send-keys", "-t", session, "-l", text])?;
        Ok(())
    }

    /// Pastes multi-line `text` as one bracketed paste, without pressing Enter.
    pub fn paste_text(&self, session: &str, text: &str) -> Result<()> {
        debug!(session = %session, len = text.len(), "pasting text");
        self.ensure_session(session)?;
        self.run_tmux_checked(&["set-buffer", "-b", "relay", "--", text])?;
        self.run_tmux_checked(&["paste-buffer", "-b", "relay", "-t", session, "-p", "-d"])?;
        Ok(())
    }

    /// Sends named keys (e.g. `Enter`, `C-u`) to the session.
    pub fn send_keys(&self, session: &str, keys: &str) -> Result<()> {
        debug!(session = %session, keys = %keys, "sending keys");
        self.ensure_session(session)?;
        self.run_tmux_checked(&["send-keys", "-t", session, keys])?;
        Ok(())
    }

    /// Captures the visible pane plus `lines` of scrollback.
    pub fn capture_output(&self, session: &str, lines: u32) -> Result<String> {
        self.ensure_session(session)?;
        let start = format!("-{}", lines);
        self.run_tmux_checked(&["capture-pane", "-t", session, "-p", "-J", "-S", &start])
    }
}
