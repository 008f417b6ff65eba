//! Message templates sent to agents.

use std::fmt::Write;

use relay_models::{AgentId, RoundEntry};

/// Review prompt used when `/mutual` is given none.
pub const DEFAULT_REVIEW_PROMPT: &str =
    "Please evaluate the views above. What do you agree with? What do you disagree with? What would you add?";

/// Wraps `content` in the source agent's tag.
pub fn tagged(agent_id: &AgentId, content: &str) -> String {
    format!("<{a}_response>\n{c}\n</{a}_response>", a = agent_id, c = content)
}

/// Opening message for a discussion.
pub fn opening(topic: &str) -> String {
    format!("Please share your thoughts on the following topic:\n\n{}", topic)
}

/// Asks a participant to evaluate the other participant's reply.
pub fn cross_evaluation(topic: &str, other: &AgentId, reply: &str) -> String {
    format!(
        "Here is {}'s response to the topic \"{}\":\n\n{}\n\n\
         Please evaluate this response. What do you agree with? \
         What do you disagree with? What would you add or change?",
        other.display_name(),
        topic,
        tagged(other, reply)
    )
}

/// User interjection with the other participant's latest reply appended.
pub fn interjection(message: &str, other: &AgentId, reply: &str) -> String {
    format!(
        "{}\n\nHere is {}'s latest response:\n\n{}",
        message,
        other.display_name(),
        tagged(other, reply)
    )
}

/// Round-by-round transcript of a discussion.
pub fn transcript(topic: &str, history: &[RoundEntry]) -> String {
    let mut out = format!("Topic: {}\n\n", topic);
    let mut current = None;

    for entry in history {
        if current != Some(entry.round) {
            current = Some(entry.round);
            let _ = write!(out, "=== Round {} ({}) ===\n\n", entry.round, entry.round_type);
        }
        let _ = write!(
            out,
            "[{}]:\n{}\n\n",
            entry.agent_id.display_name(),
            entry.content
        );
    }

    out
}

/// Summary request embedding the whole discussion.
pub fn summary(topic: &str, history: &[RoundEntry]) -> String {
    format!(
        "Please summarize the following discussion between AI assistants. Include:\n\
         1. The main points of agreement\n\
         2. The main points of disagreement\n\
         3. Each side's core position\n\
         4. An overall conclusion\n\n\
         Discussion history:\n{}",
        transcript(topic, history)
    )
}

/// Review request: each assigned speaker's reply, then the prompt.
pub fn review(replies: &[(&AgentId, &str)], prompt: &str) -> String {
    let mut out = String::from("Here are the other assistants' views:\n");
    for (agent_id, reply) in replies {
        let _ = write!(out, "\n{}\n", tagged(agent_id, reply));
    }
    let _ = write!(out, "\n{}", prompt);
    out
}

/// Cross-reference message: the prefix, then each source reply in order.
pub fn cross_reference(prefix: &str, sources: &[(&AgentId, &str)]) -> String {
    let mut out = format!("{}\n", prefix);
    for (agent_id, reply) in sources {
        let _ = write!(out, "\n{}", tagged(agent_id, reply));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_models::RoundType;

    #[test]
    fn test_tagged() {
        assert_eq!(
            tagged(&AgentId::from("claude"), "hi"),
            "<claude_response>\nhi\n</claude_response>"
        );
    }

    #[test]
    fn test_cross_reference_order() {
        let a = AgentId::from("A");
        let b = AgentId::from("B");
        let text = cross_reference("please compare", &[(&a, "ra"), (&b, "rb")]);

        assert_eq!(
            text,
            "please compare\n\n<A_response>\nra\n</A_response>\n<B_response>\nrb\n</B_response>"
        );
    }

    #[test]
    fn test_cross_evaluation_mentions_other() {
        let text = cross_evaluation("X", &AgentId::from("gemini"), "reply");
        assert!(text.starts_with("Here is Gemini's response to the topic \"X\""));
        assert!(text.contains("<gemini_response>\nreply\n</gemini_response>"));
    }

    #[test]
    fn test_review_puts_prompt_last() {
        let b = AgentId::from("B");
        let text = review(&[(&b, "rb")], "thoughts?");
        assert!(text.contains("<B_response>\nrb\n</B_response>"));
        assert!(text.ends_with("\nthoughts?"));
    }

    #[test]
    fn test_transcript_groups_rounds() {
        let history = vec![
            RoundEntry::new(1, AgentId::from("a"), RoundType::Initial, "a1"),
            RoundEntry::new(1, AgentId::from("b"), RoundType::Initial, "b1"),
            RoundEntry::new(2, AgentId::from("a"), RoundType::CrossEval, "a2"),
        ];
        let text = transcript("X", &history);

        assert!(text.starts_with("Topic: X\n\n=== Round 1 (initial) ===\n\n[A]:\na1\n\n[B]:\nb1"));
        assert!(text.contains("=== Round 2 (cross-eval) ===\n\n[A]:\na2"));
    }
}
