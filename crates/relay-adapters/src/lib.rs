//! Agent adapters for Relay.
//!
//! An adapter is the per-agent capability to inject text into an agent's
//! input, submit it, and read back the latest rendered reply. The
//! orchestration core only consumes the [`AgentAdapter`] trait; concrete
//! adapters (tmux sessions, browser bridges) live elsewhere.
//!
//! # Key Concepts
//!
//! - **AgentAdapter**: Trait that all adapters implement
//! - **AgentCatalog**: The fixed configured set of agents and how open
//!   sessions map onto them
//! - **Pattern matching**: Detects completion hints and UI noise in
//!   terminal output
//!
//! # Example
//!
//! ```
//! use relay_adapters::AgentCatalog;
//!
//! let catalog = AgentCatalog::new();
//! let agent = catalog.agent_for("https://chatgpt.com/c/123").unwrap();
//! assert_eq!(agent.as_str(), "chatgpt");
//! ```

pub mod catalog;
pub mod error;
pub mod patterns;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod traits;

pub use catalog::{AgentCatalog, CatalogEntry};
pub use error::{AdapterError, Result};
pub use patterns::Pattern;
pub use traits::{AdapterInfo, AgentAdapter};
