//! Tmux-hosted agent sessions for Relay.
//!
//! Terminal chat agents run inside tmux sessions. This crate wraps the tmux
//! binary and exposes each session as an [`AgentAdapter`](relay_adapters::AgentAdapter):
//! - Inject text with `send-keys -l` and submit with `Enter`
//! - Read the rendered reply with `capture-pane`
//! - Report completion when the idle prompt is back
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use relay_tmux::{TmuxAgentAdapter, TmuxOrchestrator};
//!
//! let tmux = Arc::new(TmuxOrchestrator::new().expect("tmux not found"));
//!
//! for session in tmux.list_sessions().unwrap() {
//!     println!("open session: {}", session.name);
//! }
//!
//! let adapter = TmuxAgentAdapter::new("claude", "relay-claude", Arc::clone(&tmux));
//! ```
//!
//! # Checking tmux Availability
//!
//! ```
//! use relay_tmux::TmuxOrchestrator;
//!
//! if !TmuxOrchestrator::is_available() {
//!     println!("tmux not found, no terminal agents");
//! }
//! ```

pub mod adapter;
pub mod error;
pub mod orchestrator;
pub mod session;

pub use adapter::TmuxAgentAdapter;
pub use error::{Result, TmuxError};
pub use orchestrator::TmuxOrchestrator;
pub use session::TmuxSession;
