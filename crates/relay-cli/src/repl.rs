//! Interactive REPL (Read-Eval-Print Loop) for Relay.

use std::path::{Path, PathBuf};

use relay_models::AgentId;
use relay_orchestrator::{CommandError, CommandParser, DiscussionPhase, Orchestrator};
use relay_runtime::RuntimeEvent;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::commands::{connected_agents, preview, print_agents, print_report, Result};

const HELP: &str = "\
Messages
  <text>                            send to the selected agents
  @claude @gemini <text>            send to the mentioned agents
  @claude what do you think of @gemini
                                    claude evaluates gemini's latest reply

Protocols
  /cross @a @b <- @c @d <text>      embed c and d's replies, send to a and b
  /mutual [prompt]                  selected agents review each other
  /discuss @a @b <topic>            start a two-agent discussion
  /next                             next cross-evaluation round
  /interject <text>                 add your own point to the discussion
  /summary                          ask both participants to summarize
  /transcript                       show the discussion so far
  /reset                            drop the discussion

Session
  /use [@a @b ...]                  select agents (none: all connected)
  /agents                           list agents
  /status                           agents, discussion and review state
  /help                             this help
  /quit                             exit";

/// Tab completion for slash commands.
struct CommandCompleter;

impl CommandCompleter {
    const COMMANDS: &'static [&'static str] = &[
        "/agents", "/cross", "/discuss", "/help", "/interject", "/mutual",
        "/next", "/quit", "/reset", "/status", "/summary", "/transcript",
        "/use",
    ];
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches: Vec<Pair> = Self::COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Commands handled by the REPL itself; everything else goes to the
/// orchestrator's command parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Show help
    Help,
    /// Exit the REPL
    Quit,
    /// List agents
    Agents,
    /// Select target agents (empty: all connected)
    Use(Vec<String>),
    /// Show the discussion transcript
    Transcript,
    /// A message or orchestrator command
    Relay(String),
}

impl ReplCommand {
    /// Parses a REPL input line.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let Some(stripped) = input.strip_prefix('/') else {
            return ReplCommand::Relay(input.to_string());
        };

        let mut parts = stripped.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();

        match cmd.as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            "agents" => ReplCommand::Agents,
            "use" => ReplCommand::Use(
                parts
                    .map(|name| name.trim_start_matches('@').to_string())
                    .filter(|name| !name.is_empty())
                    .collect(),
            ),
            "transcript" => ReplCommand::Transcript,
            _ => ReplCommand::Relay(input.to_string()),
        }
    }
}

/// REPL state
pub struct Repl {
    editor: Editor<CommandCompleter, DefaultHistory>,
    runtime: tokio::runtime::Runtime,
    orchestrator: Orchestrator,
    parser: CommandParser,
    selection: Vec<AgentId>,
    history_path: PathBuf,
}

impl Repl {
    /// Creates a new REPL instance around a connected orchestrator.
    pub fn new(
        state_dir: &Path,
        runtime: tokio::runtime::Runtime,
        orchestrator: Orchestrator,
    ) -> Result<Self> {
        let config = rustyline::Config::builder()
            .completion_type(rustyline::CompletionType::List)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(CommandCompleter));

        let history_path = state_dir.join("repl_history.txt");
        if history_path.exists() {
            let _ = editor.load_history(&history_path);
        }

        let parser = CommandParser::new(orchestrator.catalog().clone())?;

        Ok(Self {
            editor,
            runtime,
            orchestrator,
            parser,
            selection: Vec::new(),
            history_path,
        })
    }

    /// Runs the REPL loop.
    pub fn run(&mut self) -> Result<()> {
        println!("Relay REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type /help for commands, /quit to exit");
        self.print_connected();
        println!();

        self.spawn_reply_notices();

        loop {
            let prompt = self.prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(&line)?;

                    let cmd = ReplCommand::parse(&line);
                    debug!(?cmd, "Parsed command");

                    match self.handle_command(cmd) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("^D");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        let _ = self.editor.save_history(&self.history_path);
        self.orchestrator.shutdown();

        println!("Goodbye!");
        Ok(())
    }

    /// Returns the prompt string.
    fn prompt(&self) -> String {
        if self.selection.is_empty() {
            "relay> ".to_string()
        } else {
            let names: Vec<&str> = self.selection.iter().map(|id| id.as_str()).collect();
            format!("relay [{}]> ", names.join(","))
        }
    }

    fn print_connected(&self) {
        let connected = self.runtime.block_on(connected_agents(&self.orchestrator));
        if connected.is_empty() {
            println!("No agent sessions found.");
        } else {
            let names: Vec<&str> = connected.iter().map(|id| id.as_str()).collect();
            println!("Connected: {}", names.join(", "));
        }
    }

    /// Prints a one-line notice whenever a reply is captured.
    fn spawn_reply_notices(&self) {
        let mut events = self.orchestrator.runtime().subscribe();
        let mut shutdown = self.orchestrator.runtime().shutdown_signal();

        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    event = events.recv() => match event {
                        Ok(RuntimeEvent::ReplyCaptured { agent_id, content, .. }) => {
                            println!("\n[{}] replied: {}", agent_id, preview(&content, 60));
                        }
                        Ok(_) | Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    /// Handles a REPL command. Returns Ok(true) if should quit.
    fn handle_command(&mut self, cmd: ReplCommand) -> Result<bool> {
        match cmd {
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => return Ok(true),
            ReplCommand::Agents => {
                let agents = self.runtime.block_on(self.orchestrator.agents());
                print_agents(&agents);
            }
            ReplCommand::Use(names) => self.select(&names)?,
            ReplCommand::Transcript => self.print_transcript(),
            ReplCommand::Relay(line) => {
                let command = match self.parser.parse(&line) {
                    Ok(command) => command,
                    Err(CommandError::Empty) => return Ok(false),
                    Err(e) => return Err(e.into()),
                };

                let selection = self.current_selection();
                let report = self
                    .runtime
                    .block_on(self.orchestrator.execute(command, &selection))?;
                print_report(&report);
            }
        }
        Ok(false)
    }

    fn select(&mut self, names: &[String]) -> Result<()> {
        let mut selection = Vec::with_capacity(names.len());
        for name in names {
            let id = self
                .parser
                .catalog()
                .resolve(name)
                .cloned()
                .ok_or_else(|| format!("Unknown agent: {}", name))?;
            if !selection.contains(&id) {
                selection.push(id);
            }
        }

        self.selection = selection;
        if self.selection.is_empty() {
            println!("Sending to all connected agents.");
        }
        Ok(())
    }

    fn current_selection(&self) -> Vec<AgentId> {
        if self.selection.is_empty() {
            self.runtime.block_on(connected_agents(&self.orchestrator))
        } else {
            self.selection.clone()
        }
    }

    fn print_transcript(&self) {
        let Some(discussion) = self.runtime.block_on(self.orchestrator.discussion()) else {
            println!("No discussion in progress.");
            return;
        };

        println!("{}", discussion.transcript());
        if discussion.phase() == DiscussionPhase::Complete {
            if let Some(summaries) = discussion.summaries() {
                for (agent_id, summary) in summaries {
                    println!("\n── Summary from {} ──\n{}", agent_id.display_name(), summary);
                }
            }
        }
    }
}
