//! Core data models for Relay.
//!
//! This crate provides the fundamental data types shared by the capture
//! engine, the dispatch channel and the protocol machines: agent identity
//! and connectivity, round history entries, and the message contract
//! between the orchestrator and its host.

pub mod agent;
pub mod ids;
pub mod message;
pub mod round;

// Re-export main types
pub use agent::{Agent, ConnectionState};
pub use ids::{AgentId, RunId};
pub use message::{DispatchOutcome, RelayMessage, RelayResponse};
pub use round::{RoundEntry, RoundType};
