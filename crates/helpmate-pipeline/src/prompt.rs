//! Grounded prompt assembly for the generation stage.

use helpmate_core::types::ScoredItem;

/// Fixed reply when the supplied chunks do not contain the answer.
pub const NOT_FOUND_ANSWER: &str = "Answer not found in supplied policy.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n";

const SYSTEM_PROMPT: &str = "You are HelpMate, an assistant that answers questions about an insurance policy \
using only the policy excerpts supplied in the context.
Rules:
- Use only the supplied excerpts; never add outside knowledge.
- Cite every factual claim with the excerpt id in brackets, e.g. [chunk_id:chunk_12], plus the page when it is shown.
- If the excerpts do not contain the answer, reply exactly: \"Answer not found in supplied policy.\"
- Give a short summary (2-4 lines) followed by a bullet list of the references used.";

/// Worked answers shown ahead of the context so replies follow the citation format.
pub const WORKED_EXAMPLES: &str = "Example 1:
Q: What is the scheduled benefit for all members?
A: The scheduled benefit is $10,000 for all members. [chunk_id:chunk_37, Page: PART IV - Member Life Insurance Article 1]

Example 2:
Q: How do I file a claim?
A: Notice of claim must be sent within 20 days, and proof of loss within 90 days. See Article: Notice of Claim and Proof of Loss. [chunk_id:chunk_12, chunk_id:chunk_15]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
    examples: Option<String>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self { system: SYSTEM_PROMPT.to_string(), examples: Some(WORKED_EXAMPLES.to_string()) }
    }
}

impl PromptBuilder {
    /// Custom system message; the default worked examples are kept.
    pub fn with_system(system: impl Into<String>) -> Self {
        Self { system: system.into(), ..Self::default() }
    }

    pub fn with_examples(mut self, examples: impl Into<String>) -> Self {
        self.examples = Some(examples.into());
        self
    }

    pub fn without_examples(mut self) -> Self {
        self.examples = None;
        self
    }

    /// User message: `[examples]\n\nContext:\n<blocks>\n\nQ: <query>\nA:`.
    pub fn build(&self, query: &str, items: &[ScoredItem]) -> ChatPrompt {
        let question = format!("Context:\n{}\n\nQ: {}\nA:", context_block(items), query.trim());
        let user = match &self.examples {
            Some(examples) => format!("{}\n\n{}", examples.trim(), question),
            None => question,
        };
        ChatPrompt { system: self.system.clone(), user }
    }
}

/// One `[id] (page p) text` entry per chunk, in ranked order.
pub fn context_block(items: &[ScoredItem]) -> String {
    items
        .iter()
        .map(|item| match item.chunk().page() {
            Some(page) => format!("[{}] (page {}) {}", item.id(), page, item.chunk().text),
            None => format!("[{}] {}", item.id(), item.chunk().text),
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpmate_core::types::{CandidateItem, Chunk};

    fn scored(id: &str, text: &str, page: Option<&str>, score: f32) -> ScoredItem {
        let mut chunk = Chunk::new(id, text);
        if let Some(p) = page { chunk = chunk.with_meta("page", p); }
        ScoredItem { candidate: CandidateItem { chunk, rank: 0, distance: None }, score }
    }

    #[test]
    fn context_lists_ids_pages_and_separators() {
        let items = vec![
            scored("chunk_37", "The scheduled benefit is $10,000.", Some("14"), 0.9),
            scored("chunk_12", "Notice of claim within 20 days.", None, 0.4),
        ];
        assert_eq!(
            context_block(&items),
            "[chunk_37] (page 14) The scheduled benefit is $10,000.\n\n---\n[chunk_12] Notice of claim within 20 days."
        );
    }

    #[test]
    fn user_message_ends_with_question() {
        let prompt = PromptBuilder::default()
            .without_examples()
            .build("  How do I file a claim? ", &[scored("chunk_1", "x", None, 1.0)]);
        assert!(prompt.user.starts_with("Context:\n[chunk_1] x"));
        assert!(prompt.user.ends_with("Q: How do I file a claim?\nA:"));
        assert!(prompt.system.contains(NOT_FOUND_ANSWER));
    }

    #[test]
    fn worked_examples_precede_the_context_by_default() {
        let prompt = PromptBuilder::default().build("q", &[scored("chunk_1", "x", None, 1.0)]);
        assert!(prompt.user.starts_with("Example 1:\nQ: What is the scheduled benefit"));
        let examples_at = prompt.user.find("[chunk_id:chunk_12, chunk_id:chunk_15]").unwrap();
        let context_at = prompt.user.find("Context:\n[chunk_1] x").unwrap();
        assert!(examples_at < context_at);
    }

    #[test]
    fn custom_examples_and_system_compose() {
        let prompt = PromptBuilder::with_system("sys").with_examples("Q: a?\nA: b.").build("q", &[]);
        assert_eq!(prompt.system, "sys");
        assert_eq!(prompt.user, "Q: a?\nA: b.\n\nContext:\n\n\nQ: q\nA:");
    }
}
