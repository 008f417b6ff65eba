//! Errors from driving tmux.

use thiserror::Error;

/// Failures talking to the tmux binary or its sessions.
#[derive(Error, Debug)]
pub enum TmuxError {
    /// No `tmux` binary on PATH.
    #[error("tmux binary is not installed or not on PATH")]
    BinaryMissing,

    /// The agent's session is not open.
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    /// tmux exited non-zero.
    #[error("tmux {subcommand} failed: {stderr}")]
    CommandFailed {
        /// tmux subcommand that was run.
        subcommand: String,
        /// Trimmed stderr.
        stderr: String,
    },

    /// Could not spawn tmux.
    #[error("could not run tmux: {0}")]
    Spawn(#[from] std::io::Error),

    /// A `list-sessions` line did not have the expected shape.
    #[error("unreadable session listing: {0}")]
    BadListing(String),
}

/// Result type for tmux operations.
pub type Result<T> = std::result::Result<T, TmuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_names_subcommand() {
        let err = TmuxError::CommandFailed {
            subcommand: "send-keys".into(),
            stderr: "can't find pane".into(),
        };
        assert_eq!(err.to_string(), "tmux send-keys failed: can't find pane");
    }
}
