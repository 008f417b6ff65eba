//! Parser for the slash and @mention command syntax.
//!
//! ```text
//! @claude @gemini hello                      send to the mentioned agents
//! @claude what do you think of @gemini       claude evaluates gemini's reply
//! /cross @claude <- @gemini @chatgpt compare  embed replies, send to targets
//! /mutual [prompt]                           selected agents review each other
//! /discuss @claude @gemini <topic>           start a two-party discussion
//! /next  /interject <text>  /summary  /reset  /status
//! ```

use std::sync::OnceLock;

use regex::Regex;

use relay_adapters::{AgentCatalog, Pattern};
use relay_models::AgentId;

use crate::dedup_ids;
use crate::error::CommandError;
use crate::prompts::DEFAULT_REVIEW_PROMPT;

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send text as-is. Empty `targets` means the caller's selection.
    Send {
        /// Mentioned agents.
        targets: Vec<AgentId>,
        /// Full text, mentions included.
        text: String,
    },
    /// Embed source replies into a message for the targets.
    CrossReference {
        /// Receiving agents.
        targets: Vec<AgentId>,
        /// Agents whose replies are embedded, in order.
        sources: Vec<AgentId>,
        /// User text placed before the replies.
        prefix: String,
    },
    /// Selected agents review each other's replies.
    MutualReview {
        /// Prompt appended after the embedded replies.
        prompt: String,
    },
    /// Start a discussion.
    StartDiscussion {
        /// Mentioned participants.
        participants: Vec<AgentId>,
        /// Discussion topic.
        topic: String,
    },
    /// Open the next cross-evaluation round.
    NextRound,
    /// Send a message to both discussion participants.
    Interject {
        /// User message.
        text: String,
    },
    /// Ask both participants for a summary.
    Summarize,
    /// Drop the current discussion.
    ResetDiscussion,
    /// Show agent and protocol status.
    Status,
}

fn eval_keywords() -> &'static Pattern {
    static KEYWORDS: OnceLock<Pattern> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        Pattern::new(
            "eval_keyword",
            r"(?i)evaluate|think of|opinion|review|agree|analysis|analyze|compare|learn from|critique|评价|看看|怎么样|怎么看|如何|讲的|说的|回答|赞同|同意|分析|认为|观点|看法|意见|借鉴|批评|补充|对比",
        )
    })
}

/// One resolved @mention and where it ends in the input.
struct Mention {
    agent_id: AgentId,
    end: usize,
}

/// Parses command lines against a fixed agent catalog.
#[derive(Debug, Clone)]
pub struct CommandParser {
    catalog: AgentCatalog,
    mention: Option<Regex>,
}

impl CommandParser {
    /// Creates a parser that recognises the catalog's names and aliases.
    pub fn new(catalog: AgentCatalog) -> Result<Self, regex::Error> {
        let mut names: Vec<String> = catalog.names().iter().map(|n| regex::escape(n)).collect();
        // Longest first so "chatglm" wins over a shorter prefix.
        names.sort_by(|a, b| b.len().cmp(&a.len()));

        let mention = if names.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"(?i)@({})\b", names.join("|")))?)
        };

        Ok(Self { catalog, mention })
    }

    /// The catalog this parser resolves against.
    pub fn catalog(&self) -> &AgentCatalog {
        &self.catalog
    }

    /// Parses one input line.
    pub fn parse(&self, input: &str) -> Result<Command, CommandError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CommandError::Empty);
        }

        let Some(stripped) = input.strip_prefix('/') else {
            return Ok(self.parse_message(input));
        };

        let (cmd, rest) = match stripped.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
            None => (stripped.to_lowercase(), ""),
        };

        match cmd.as_str() {
            "mutual" => Ok(Command::MutualReview {
                prompt: if rest.is_empty() {
                    DEFAULT_REVIEW_PROMPT.to_string()
                } else {
                    rest.to_string()
                },
            }),
            "cross" => Ok(self
                .parse_cross(rest)
                .unwrap_or_else(|| self.parse_message(input))),
            "discuss" => self.parse_discuss(rest),
            "next" => Ok(Command::NextRound),
            "interject" => {
                if rest.is_empty() {
                    Err(CommandError::Usage("/interject <message>"))
                } else {
                    Ok(Command::Interject {
                        text: rest.to_string(),
                    })
                }
            }
            "summary" | "summarize" => Ok(Command::Summarize),
            "reset" => Ok(Command::ResetDiscussion),
            "status" => Ok(Command::Status),
            _ => Err(CommandError::UnknownCommand(cmd)),
        }
    }

    fn mentions(&self, text: &str) -> Vec<Mention> {
        let Some(pattern) = &self.mention else {
            return Vec::new();
        };
        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                let agent_id = self.catalog.resolve(name.as_str())?.clone();
                Some(Mention {
                    agent_id,
                    end: whole.end(),
                })
            })
            .collect()
    }

    fn distinct(mentions: &[Mention]) -> Vec<AgentId> {
        dedup_ids(mentions.iter().map(|m| &m.agent_id))
    }

    /// Plain text: a send, or the two-mention evaluation shorthand.
    fn parse_message(&self, input: &str) -> Command {
        let mentions = self.mentions(input);
        let targets = Self::distinct(&mentions);

        if targets.len() == 2 && eval_keywords().matches(input) {
            let target = targets[0].clone();
            let source = mentions
                .iter()
                .rev()
                .map(|m| m.agent_id.clone())
                .find(|id| *id != target)
                .unwrap_or_else(|| targets[1].clone());

            return Command::CrossReference {
                targets: vec![target],
                sources: vec![source],
                prefix: input.to_string(),
            };
        }

        Command::Send {
            targets,
            text: input.to_string(),
        }
    }

    /// `@targets <- @sources message`; `None` when either side has no mention.
    fn parse_cross(&self, rest: &str) -> Option<Command> {
        let (before, after) = rest.split_once("<-")?;
        let targets = Self::distinct(&self.mentions(before));

        let source_mentions = self.mentions(after);
        let sources = Self::distinct(&source_mentions);
        let prefix = match source_mentions.last() {
            Some(last) => after[last.end..].trim(),
            None => after.trim(),
        };

        if targets.is_empty() || sources.is_empty() {
            return None;
        }
        Some(Command::CrossReference {
            targets,
            sources,
            prefix: prefix.to_string(),
        })
    }

    fn parse_discuss(&self, rest: &str) -> Result<Command, CommandError> {
        const USAGE: &str = "/discuss @agent @agent <topic>";

        let mentions = self.mentions(rest);
        let participants = Self::distinct(&mentions);
        let topic = match mentions.last() {
            Some(last) => rest[last.end..].trim(),
            None => "",
        };

        if participants.len() != 2 || topic.is_empty() {
            return Err(CommandError::Usage(USAGE));
        }
        Ok(Command::StartDiscussion {
            participants,
            topic: topic.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> CommandParser {
        CommandParser::new(AgentCatalog::new()).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<AgentId> {
        names.iter().map(|n| AgentId::from(*n)).collect()
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parser().parse("   "), Err(CommandError::Empty));
    }

    #[test]
    fn test_parse_plain_send() {
        assert_eq!(
            parser().parse("hello everyone").unwrap(),
            Command::Send { targets: vec![], text: "hello everyone".into() }
        );
        assert_eq!(
            parser().parse("@Claude @gpt hello").unwrap(),
            Command::Send { targets: ids(&["claude", "chatgpt"]), text: "@Claude @gpt hello".into() }
        );
    }

    #[test]
    fn test_parse_evaluation_shorthand() {
        let input = "@claude what do you think of @gemini";
        assert_eq!(
            parser().parse(input).unwrap(),
            Command::CrossReference {
                targets: ids(&["claude"]),
                sources: ids(&["gemini"]),
                prefix: input.into(),
            }
        );
    }

    #[test]
    fn test_two_mentions_without_keyword_is_send() {
        assert!(matches!(
            parser().parse("@claude @gemini hello").unwrap(),
            Command::Send { .. }
        ));
    }

    #[test]
    fn test_parse_cross() {
        assert_eq!(
            parser().parse("/cross @claude @gemini <- @chatgpt @chatglm please compare").unwrap(),
            Command::CrossReference {
                targets: ids(&["claude", "gemini"]),
                sources: ids(&["chatgpt", "chatglm"]),
                prefix: "please compare".into(),
            }
        );
    }

    #[test]
    fn test_parse_cross_without_arrow_is_send() {
        assert_eq!(
            parser().parse("/cross @claude hello").unwrap(),
            Command::Send { targets: ids(&["claude"]), text: "/cross @claude hello".into() }
        );
    }

    #[test]
    fn test_parse_mutual() {
        assert_eq!(
            parser().parse("/mutual").unwrap(),
            Command::MutualReview { prompt: DEFAULT_REVIEW_PROMPT.into() }
        );
        assert_eq!(
            parser().parse("/MUTUAL which is right?").unwrap(),
            Command::MutualReview { prompt: "which is right?".into() }
        );
    }

    #[test]
    fn test_parse_discuss() {
        assert_eq!(
            parser().parse("/discuss @claude @gemini tabs or spaces").unwrap(),
            Command::StartDiscussion {
                participants: ids(&["claude", "gemini"]),
                topic: "tabs or spaces".into(),
            }
        );
        assert!(matches!(
            parser().parse("/discuss @claude tabs"),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            parser().parse("/discuss @claude @gemini"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_discussion_controls() {
        let p = parser();
        assert_eq!(p.parse("/next").unwrap(), Command::NextRound);
        assert_eq!(p.parse("/summary").unwrap(), Command::Summarize);
        assert_eq!(p.parse("/reset").unwrap(), Command::ResetDiscussion);
        assert_eq!(p.parse("/status").unwrap(), Command::Status);
        assert_eq!(
            p.parse("/interject consider cost").unwrap(),
            Command::Interject { text: "consider cost".into() }
        );
        assert!(matches!(p.parse("/interject"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parser().parse("/frobnicate"),
            Err(CommandError::UnknownCommand("frobnicate".into()))
        );
    }

    #[test]
    fn test_unknown_mentions_ignored() {
        assert_eq!(
            parser().parse("@nobody hi").unwrap(),
            Command::Send { targets: vec![], text: "@nobody hi".into() }
        );
    }
}
