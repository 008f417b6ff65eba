//! Persistence layer for Relay.
//!
//! The only durable state is each agent's last captured reply. It is written
//! after every capture and read once at start to seed the in-memory cache.
//! Writes go to a temp file in the target directory and are renamed into
//! place, so a crash never leaves a half-written file.
//!
//! # Example
//!
//! ```no_run
//! use relay_persistence::ReplyStore;
//! use relay_models::AgentId;
//!
//! let store = ReplyStore::in_dir("/home/user/.ai-relay");
//! store.save_reply(&AgentId::from("claude"), "42").unwrap();
//!
//! let seeded = store.load().unwrap();
//! assert_eq!(seeded[&AgentId::from("claude")].as_deref(), Some("42"));
//! ```

pub mod atomic;
pub mod error;
pub mod reply_store;

pub use error::{PersistenceError, Result};
pub use reply_store::ReplyStore;
