//! Capture and dispatch runtime for Relay.
//!
//! - `AgentRegistry` - per-agent connectivity, cached reply and busy flags
//! - `CaptureEngine` - polls an adapter until its reply stops changing
//! - `DispatchChannel` - delivers one message with bounded retry
//! - `Runtime` - owns the above plus the shutdown signal
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use relay_runtime::{Runtime, RuntimeConfig, RuntimeEvent};
//! use relay_models::AgentId;
//!
//! #[tokio::main]
//! async fn main() {
//!     let claude = AgentId::from("claude");
//!     let runtime = Runtime::new(RuntimeConfig::from_env(), vec![claude.clone()]);
//!     runtime.attach(&claude, Arc::new(my_adapter())).await.unwrap();
//!
//!     let mut events = runtime.subscribe();
//!     runtime.send(&claude, "hello").await;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let RuntimeEvent::ReplyCaptured { content, .. } = event {
//!             println!("{}", content);
//!             break;
//!         }
//!     }
//! }
//! ```
//!
//! # Capture
//!
//! A capture session polls every `poll_interval`. A poll is stable when the
//! extracted text is non-empty and matches the previous poll, or when the
//! adapter shows a completion hint. After `stable_threshold` stable polls
//! (or at once on a hint) the text is recorded. Text equal to the cached
//! reply is not recorded and the session keeps waiting. Sessions stop at
//! `capture_timeout` or on shutdown without emitting anything.

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod registry;
pub mod runtime;
pub mod stability;

pub use capture::CaptureEngine;
pub use config::RuntimeConfig;
pub use dispatch::DispatchChannel;
pub use error::{Result, RuntimeError};
pub use event::RuntimeEvent;
pub use registry::{AgentEntry, AgentRegistry};
pub use runtime::Runtime;
pub use stability::{PollVerdict, StabilityTracker};
