//! Command handlers for CLI subcommands, plus the report printers the
//! REPL shares.

use std::collections::HashSet;

use relay_models::{Agent, AgentId, DispatchOutcome};
use relay_orchestrator::{CommandParser, CommandReport, Orchestrator, StatusReport};
use relay_runtime::RuntimeEvent;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cli::{Commands, OutputFormat};

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Execute a CLI command.
pub async fn execute(command: Commands, orchestrator: &Orchestrator) -> Result<()> {
    match command {
        Commands::Send { message, wait } => cmd_send(orchestrator, &message, wait).await,
        Commands::Agents { format } => cmd_agents(orchestrator, format).await,
        Commands::Repl => {
            // REPL is handled separately in main
            Ok(())
        }
    }
}

async fn cmd_send(orchestrator: &Orchestrator, message: &str, wait: bool) -> Result<()> {
    let parser = CommandParser::new(orchestrator.catalog().clone())?;
    let command = parser.parse(message)?;
    let selection = connected_agents(orchestrator).await;
    debug!(?command, ?selection, "Executing command");

    // Subscribe before dispatching so no capture is missed.
    let mut events = orchestrator.runtime().subscribe();
    let report = orchestrator.execute(command, &selection).await?;
    print_report(&report);

    if let (true, CommandReport::Dispatched(outcomes)) = (wait, &report) {
        let mut pending: HashSet<AgentId> = outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| o.agent_id.clone())
            .collect();
        let config = orchestrator.runtime().config();
        let deadline = Instant::now() + config.capture_timeout + config.poll_interval;

        while !pending.is_empty() {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Ok(RuntimeEvent::ReplyCaptured { agent_id, content, .. })) => {
                    if pending.remove(&agent_id) {
                        println!("\n── {} ──\n{}", agent_id.display_name(), content);
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(RecvError::Lagged(skipped))) => debug!(skipped, "missed runtime events"),
                Ok(Err(RecvError::Closed)) => break,
                Err(_) => {
                    let mut waiting: Vec<&str> = pending.iter().map(|id| id.as_str()).collect();
                    waiting.sort_unstable();
                    eprintln!("No reply captured from: {}", waiting.join(", "));
                    break;
                }
            }
        }
    }

    info!("send finished");
    Ok(())
}

async fn cmd_agents(orchestrator: &Orchestrator, format: OutputFormat) -> Result<()> {
    let agents = orchestrator.agents().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&agents)?),
        OutputFormat::Table => print_agents(&agents),
    }
    Ok(())
}

/// IDs of every connected agent, in catalog order.
pub async fn connected_agents(orchestrator: &Orchestrator) -> Vec<AgentId> {
    orchestrator
        .agents()
        .await
        .into_iter()
        .filter(|a| a.is_connected())
        .map(|a| a.id)
        .collect()
}

/// Prints the agent table.
pub fn print_agents(agents: &[Agent]) {
    if agents.is_empty() {
        println!("No agents configured.");
        return;
    }

    println!("{:<12} {:<14} LAST REPLY", "AGENT", "STATE");
    println!("{}", "-".repeat(60));
    for agent in agents {
        let state = if agent.is_connected() {
            "connected"
        } else {
            "disconnected"
        };
        let last = agent
            .last_captured_reply
            .as_deref()
            .map(|r| preview(r, 40))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<12} {:<14} {}", agent.id.as_str(), state, last);
    }
}

/// One line per dispatch outcome.
pub fn format_outcome(outcome: &DispatchOutcome) -> String {
    if outcome.success {
        format!("✓ sent to {}", outcome.agent_id)
    } else {
        format!(
            "✗ {}: {} ({} attempt{})",
            outcome.agent_id,
            outcome.error.as_deref().unwrap_or("unknown error"),
            outcome.attempts,
            if outcome.attempts == 1 { "" } else { "s" }
        )
    }
}

/// Prints the result of an executed command.
pub fn print_report(report: &CommandReport) {
    match report {
        CommandReport::Dispatched(outcomes) => {
            for outcome in outcomes {
                println!("{}", format_outcome(outcome));
            }
        }
        CommandReport::Reset(true) => println!("Discussion reset."),
        CommandReport::Reset(false) => println!("No discussion to reset."),
        CommandReport::Status(status) => print_status(status),
    }
}

/// Prints agent and protocol status.
pub fn print_status(status: &StatusReport) {
    print_agents(&status.agents);

    match &status.discussion {
        Some(d) => {
            println!();
            println!("Discussion: {}", d.topic());
            println!("  Round:   {} ({})", d.current_round(), d.round_type());
            println!("  Phase:   {}", d.phase());
            if !d.pending().is_empty() {
                println!("  Waiting: {}", join_ids(d.pending()));
            }
        }
        None => println!("\nNo discussion in progress."),
    }

    if let Some(review) = &status.review {
        println!();
        if review.is_complete() {
            println!("Mutual review: complete ({} reviews)", review.reviews().len());
        } else {
            println!("Mutual review: waiting on {}", join_ids(review.pending()));
        }
    }
}

/// First line of `text`, cut to `max` characters.
pub fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn join_ids(ids: &[AgentId]) -> String {
    ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}
