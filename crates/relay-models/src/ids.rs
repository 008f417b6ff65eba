//! Type-safe ID wrappers for Relay.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate string-backed ID newtypes with common functionality.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(AgentId);
define_id!(RunId);

impl AgentId {
    /// Display form used in prompts ("chatgpt" -> "Chatgpt").
    pub fn display_name(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl RunId {
    /// Creates a new random protocol run ID.
    pub fn new() -> Self {
        Self(format!("run-{}", Uuid::new_v4()))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_prefix() {
        let id = RunId::new();
        assert!(id.as_str().starts_with("run-"));
    }

    #[test]
    fn test_run_id_uniqueness() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_agent_id_display_name() {
        assert_eq!(AgentId::from("claude").display_name(), "Claude");
        assert_eq!(AgentId::from("").display_name(), "");
    }

    #[test]
    fn test_agent_id_serde_transparent() {
        let id = AgentId::from("gemini");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"gemini\"");

        let parsed: AgentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
