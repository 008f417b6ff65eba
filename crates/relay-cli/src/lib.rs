//! Relay CLI library.
//!
//! This crate provides the command-line interface and interactive REPL
//! for Relay, and wires tmux-hosted agent sessions into an orchestrator.

pub mod cli;
pub mod commands;
pub mod repl;

use std::path::Path;
use std::sync::Arc;

use relay_adapters::AgentCatalog;
use relay_models::AgentId;
use relay_orchestrator::Orchestrator;
use relay_persistence::ReplyStore;
use relay_runtime::RuntimeConfig;
use relay_tmux::{TmuxAgentAdapter, TmuxOrchestrator};
use tracing::{debug, info, warn};

/// Builds the agent catalog, restricted to `names` when any are given.
pub fn select_catalog(names: &[String]) -> commands::Result<AgentCatalog> {
    let mut catalog = AgentCatalog::new();
    if names.is_empty() {
        return Ok(catalog);
    }

    let mut selected: Vec<AgentId> = Vec::with_capacity(names.len());
    for name in names {
        let id = catalog
            .resolve(name.trim())
            .cloned()
            .ok_or_else(|| format!("Unknown agent: {}", name))?;
        selected.push(id);
    }
    catalog.retain_ids(&selected);
    Ok(catalog)
}

/// Creates the orchestrator, seeds its reply cache and attaches open sessions.
///
/// Must be called from within a tokio runtime.
pub async fn connect(
    state_dir: &Path,
    catalog: AgentCatalog,
    session_prefix: &str,
) -> commands::Result<Orchestrator> {
    let orchestrator = Orchestrator::new(RuntimeConfig::from_env(), catalog)
        .with_store(ReplyStore::in_dir(state_dir));

    if let Err(e) = orchestrator.seed_from_store().await {
        warn!(error = %e, "could not load cached replies");
    }
    orchestrator.spawn_router();

    let attached = attach_tmux_sessions(&orchestrator, session_prefix).await;
    info!(attached, "sessions attached");
    Ok(orchestrator)
}

/// Attaches every tmux session whose name maps onto a configured agent.
async fn attach_tmux_sessions(orchestrator: &Orchestrator, prefix: &str) -> usize {
    let tmux = match TmuxOrchestrator::new() {
        Ok(t) => Arc::new(t),
        Err(e) => {
            debug!("tmux not available: {}", e);
            return 0;
        }
    };

    let names: Vec<String> = match tmux.list_sessions() {
        Ok(sessions) => sessions
            .into_iter()
            .map(|s| s.name)
            .filter(|name| name.starts_with(prefix))
            .collect(),
        Err(e) => {
            warn!(error = %e, "could not list tmux sessions");
            return 0;
        }
    };

    let mut attached = 0;
    for name in &names {
        let Some(agent_id) = orchestrator.catalog().agent_for(name).cloned() else {
            debug!(session = %name, "no agent for session");
            continue;
        };

        let adapter = TmuxAgentAdapter::new(agent_id.clone(), name.clone(), Arc::clone(&tmux));
        match orchestrator.attach(&agent_id, Arc::new(adapter)).await {
            Ok(()) => {
                debug!(agent = %agent_id, session = %name, "session attached");
                attached += 1;
            }
            Err(e) => warn!(agent = %agent_id, error = %e, "could not attach session"),
        }
    }

    orchestrator
        .refresh_connectivity(names.iter().map(String::as_str))
        .await;
    attached
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_catalog_all() {
        let catalog = select_catalog(&[]).unwrap();
        assert_eq!(catalog.len(), AgentCatalog::new().len());
    }

    #[test]
    fn test_select_catalog_by_alias() {
        let catalog = select_catalog(&["gpt".to_string(), "Claude".to_string()]).unwrap();
        assert_eq!(
            catalog.ids(),
            vec![AgentId::from("claude"), AgentId::from("chatgpt")]
        );
    }

    #[test]
    fn test_select_catalog_unknown() {
        let err = select_catalog(&["nobody".to_string()]).unwrap_err();
        assert!(err.to_string().contains("nobody"));
    }
}
