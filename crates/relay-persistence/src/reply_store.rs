//! Per-agent last-reply cache on disk.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use relay_models::AgentId;

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;

/// File name used inside the state directory.
pub const REPLIES_FILE: &str = "replies.json";

type ReplyMap = BTreeMap<AgentId, Option<String>>;

/// Stores `agent_id -> last reply | null` as one JSON object.
///
/// ```text
/// {
///   "claude": "last reply text",
///   "gemini": null
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ReplyStore {
    path: PathBuf,
}

impl ReplyStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store backed by `replies.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(REPLIES_FILE))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every stored reply. A missing file is an empty cache.
    pub fn load(&self) -> Result<HashMap<AgentId, Option<String>>> {
        let replies: ReplyMap = read_json_optional(&self.path)?.unwrap_or_default();
        debug!(path = %self.path.display(), agents = replies.len(), "loaded reply cache");
        Ok(replies.into_iter().collect())
    }

    /// Records `content` as the agent's last reply.
    pub fn save_reply(&self, agent_id: &AgentId, content: &str) -> Result<()> {
        let mut replies: ReplyMap = read_json_optional(&self.path)?.unwrap_or_default();
        replies.insert(agent_id.clone(), Some(content.to_string()));
        atomic_write_json(&self.path, &replies)
    }

    /// Forgets the agent's last reply, keeping it listed as `null`.
    pub fn clear_reply(&self, agent_id: &AgentId) -> Result<()> {
        let mut replies: ReplyMap = read_json_optional(&self.path)?.unwrap_or_default();
        replies.insert(agent_id.clone(), None);
        atomic_write_json(&self.path, &replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = ReplyStore::in_dir(dir.path());

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_reply_survives_reopen() {
        let dir = tempdir().unwrap();
        ReplyStore::in_dir(dir.path())
            .save_reply(&AgentId::from("claude"), "first")
            .unwrap();
        ReplyStore::in_dir(dir.path())
            .save_reply(&AgentId::from("gemini"), "second")
            .unwrap();

        let loaded = ReplyStore::in_dir(dir.path()).load().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&AgentId::from("claude")].as_deref(), Some("first"));
        assert_eq!(loaded[&AgentId::from("gemini")].as_deref(), Some("second"));
    }

    #[test]
    fn test_save_reply_overwrites() {
        let dir = tempdir().unwrap();
        let store = ReplyStore::in_dir(dir.path());
        let claude = AgentId::from("claude");

        store.save_reply(&claude, "old").unwrap();
        store.save_reply(&claude, "new").unwrap();

        assert_eq!(store.load().unwrap()[&claude].as_deref(), Some("new"));
    }

    #[test]
    fn test_clear_reply_keeps_null_entry() {
        let dir = tempdir().unwrap();
        let store = ReplyStore::in_dir(dir.path());
        let claude = AgentId::from("claude");

        store.save_reply(&claude, "text").unwrap();
        store.clear_reply(&claude).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.get(&claude), Some(&None));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"claude\": null"));
    }
}
