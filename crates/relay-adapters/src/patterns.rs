//! Pattern matching utilities for reply extraction.

use regex::Regex;
use std::sync::OnceLock;

/// A compiled pattern for matching rendered output.
#[derive(Debug)]
pub struct Pattern {
    /// Human-readable name for this pattern.
    pub name: &'static str,
    /// The regex pattern.
    regex: Regex,
}

impl Pattern {
    /// Creates a new pattern.
    pub fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Checks if the pattern matches the given text.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Patterns for terminal-hosted chat agents.
pub mod terminal {
    use super::*;

    /// Markers showing the agent finished its reply and is waiting for input.
    pub fn completion_patterns() -> &'static [Pattern] {
        static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
        PATTERNS.get_or_init(|| {
            vec![
                Pattern::new("prompt", r"(?m)^>\s*$"),
                Pattern::new("waiting", r"(?i)waiting for input"),
                Pattern::new("idle_marker", r"\[IDLE\]"),
            ]
        })
    }

    /// Lines that are UI chrome rather than reply content.
    pub fn noise_patterns() -> &'static [Pattern] {
        static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
        PATTERNS.get_or_init(|| {
            vec![
                Pattern::new("spinner", r"^[⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏✻✽✶✳·*]\s"),
                Pattern::new("box_drawing", r"^[─│╭╮╰╯┌┐└┘━┃\s]+$"),
                Pattern::new("box_edge", r"^[│┃].*[│┃]$"),
                Pattern::new("prompt", r"^>\s*$"),
                Pattern::new("status_hint", r"(?i)^\?\s+for shortcuts"),
                Pattern::new("interrupt_hint", r"(?i)esc to interrupt"),
            ]
        })
    }
}

/// Checks if any pattern in the set matches.
pub fn any_match(text: &str, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|p| p.matches(text))
}

/// Removes noise lines and surrounding blank lines from captured output.
pub fn strip_noise(output: &str) -> String {
    let noise = terminal::noise_patterns();
    let kept: Vec<&str> = output
        .lines()
        .map(|line| line.trim_end())
        .filter(|line| !any_match(line.trim(), noise))
        .collect();

    kept.join("\n").trim().to_string()
}
