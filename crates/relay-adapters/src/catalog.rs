//! Agent catalog: the fixed configured set of agents.
//!
//! The catalog maps session locations (page URLs, tmux session names) onto
//! agent IDs and resolves user-typed names to canonical IDs.

use std::collections::HashMap;

use relay_models::AgentId;

/// One configured agent and the location fragments that identify it.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Canonical agent ID.
    pub id: AgentId,
    /// Substrings that identify this agent's session location.
    pub patterns: Vec<String>,
    /// Alternative names accepted on input.
    pub aliases: Vec<String>,
}

impl CatalogEntry {
    /// Creates an entry that matches on its own ID.
    pub fn new(id: impl Into<AgentId>) -> Self {
        let id = id.into();
        Self {
            patterns: vec![id.as_str().to_string()],
            aliases: Vec::new(),
            id,
        }
    }

    /// Sets the location patterns.
    pub fn with_patterns(mut self, patterns: &[&str]) -> Self {
        self.patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Sets the aliases.
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    fn matches_location(&self, location: &str) -> bool {
        self.patterns.iter().any(|p| location.contains(p.as_str()))
    }

    fn answers_to(&self, name: &str) -> bool {
        self.id.as_str().eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// The fixed set of agents Relay coordinates.
///
/// # Example
///
/// ```
/// use relay_adapters::AgentCatalog;
///
/// let catalog = AgentCatalog::new();
///
/// for id in catalog.ids() {
///     println!("Known agent: {}", id);
/// }
///
/// assert_eq!(catalog.resolve("gpt").map(|id| id.as_str()), Some("chatgpt"));
/// ```
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    entries: Vec<CatalogEntry>,
}

impl AgentCatalog {
    /// Creates a catalog with the built-in chat agents.
    pub fn new() -> Self {
        Self {
            entries: vec![
                CatalogEntry::new("claude").with_patterns(&["claude.ai", "claude"]),
                CatalogEntry::new("chatgpt")
                    .with_patterns(&["chat.openai.com", "chatgpt.com", "chatgpt"])
                    .with_aliases(&["gpt"]),
                CatalogEntry::new("gemini").with_patterns(&["gemini.google.com", "gemini"]),
                CatalogEntry::new("chatglm")
                    .with_patterns(&["chatglm.cn", "chatglm"])
                    .with_aliases(&["glm"]),
                CatalogEntry::new("aistudio")
                    .with_patterns(&["aistudio.google.com", "aistudio"]),
            ],
        }
    }

    /// Creates an empty catalog.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a catalog whose agents match on their own IDs.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AgentId>,
    {
        let mut catalog = Self::empty();
        for id in ids {
            catalog.register(CatalogEntry::new(id));
        }
        catalog
    }

    /// Registers an entry, replacing any entry with the same ID.
    pub fn register(&mut self, entry: CatalogEntry) {
        self.entries.retain(|e| e.id != entry.id);
        self.entries.push(entry);
    }

    /// Keeps only the entries whose IDs are listed, in catalog order.
    pub fn retain_ids(&mut self, ids: &[AgentId]) {
        self.entries.retain(|e| ids.contains(&e.id));
    }

    /// Lists agent IDs in configuration order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Returns true if `id` is configured.
    pub fn contains(&self, id: &AgentId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    /// Returns the number of configured agents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no agents are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a user-typed name or alias to a canonical ID.
    pub fn resolve(&self, name: &str) -> Option<&AgentId> {
        self.entries
            .iter()
            .find(|e| e.answers_to(name))
            .map(|e| &e.id)
    }

    /// Finds the agent whose session lives at `location`.
    pub fn agent_for(&self, location: &str) -> Option<&AgentId> {
        self.entries
            .iter()
            .find(|e| e.matches_location(location))
            .map(|e| &e.id)
    }

    /// Computes every agent's connectivity from the currently open locations.
    pub fn connectivity<'a, I>(&self, open_locations: I) -> HashMap<AgentId, bool>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut connected: HashMap<AgentId, bool> =
            self.entries.iter().map(|e| (e.id.clone(), false)).collect();

        for location in open_locations {
            if let Some(id) = self.agent_for(location) {
                connected.insert(id.clone(), true);
            }
        }

        connected
    }

    /// All names (IDs and aliases) the catalog answers to.
    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flat_map(|e| {
                std::iter::once(e.id.as_str()).chain(e.aliases.iter().map(|a| a.as_str()))
            })
            .collect()
    }
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_new() {
        let catalog = AgentCatalog::new();
        assert_eq!(catalog.len(), 5);
        assert_eq!(
            catalog.ids().iter().map(|id| id.as_str()).collect::<Vec<_>>(),
            vec!["claude", "chatgpt", "gemini", "chatglm", "aistudio"]
        );
    }

    #[test]
    fn test_agent_for_location() {
        let catalog = AgentCatalog::new();

        assert_eq!(catalog.agent_for("https://claude.ai/chat/1").unwrap().as_str(), "claude");
        assert_eq!(catalog.agent_for("https://chat.openai.com/").unwrap().as_str(), "chatgpt");
        assert_eq!(catalog.agent_for("relay-gemini").unwrap().as_str(), "gemini");
        assert!(catalog.agent_for("https://example.com").is_none());
    }

    #[test]
    fn test_resolve_aliases() {
        let catalog = AgentCatalog::new();

        assert_eq!(catalog.resolve("Claude").unwrap().as_str(), "claude");
        assert_eq!(catalog.resolve("gpt").unwrap().as_str(), "chatgpt");
        assert_eq!(catalog.resolve("GLM").unwrap().as_str(), "chatglm");
        assert!(catalog.resolve("unknown").is_none());
    }

    #[test]
    fn test_connectivity_marks_missing_agents_disconnected() {
        let catalog = AgentCatalog::new();
        let open = ["https://claude.ai/new", "https://gemini.google.com/app"];

        let connectivity = catalog.connectivity(open.iter().copied());

        assert_eq!(connectivity.len(), 5);
        assert!(connectivity[&AgentId::from("claude")]);
        assert!(connectivity[&AgentId::from("gemini")]);
        assert!(!connectivity[&AgentId::from("chatgpt")]);
    }

    #[test]
    fn test_from_ids_and_register() {
        let mut catalog = AgentCatalog::from_ids(["a", "b"]);
        assert!(catalog.contains(&AgentId::from("a")));

        catalog.register(CatalogEntry::new("a").with_aliases(&["alpha"]));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.resolve("alpha").unwrap().as_str(), "a");
    }

    #[test]
    fn test_retain_ids() {
        let mut catalog = AgentCatalog::new();
        catalog.retain_ids(&[AgentId::from("gemini"), AgentId::from("claude")]);

        assert_eq!(
            catalog.ids().iter().map(|id| id.as_str()).collect::<Vec<_>>(),
            vec!["claude", "gemini"]
        );
    }

    #[test]
    fn test_names_include_aliases() {
        let catalog = AgentCatalog::new();
        let names = catalog.names();

        assert!(names.contains(&"chatgpt"));
        assert!(names.contains(&"gpt"));
    }
}
