use serde::{Deserialize, Serialize};

/// One retrievable unit of business knowledge: a labeled blob of
/// content plus the hand-authored keywords that trigger it. Built once
/// at load time and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub kind: String,
    pub content: String,
    pub keywords: Vec<String>,
}

impl KnowledgeChunk {
    pub fn new(
        kind: impl Into<String>,
        content: impl Into<String>,
        keywords: &[&str],
    ) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Whether any keyword occurs in the (already lowercased) query.
    pub fn matches(&self, lower_query: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| lower_query.contains(k.to_lowercase().as_str()))
    }
}

/// Render retrieved chunks as the prompt block the model sees.
/// Empty input renders as the empty string, not an empty header.
pub fn format_for_prompt(chunks: &[KnowledgeChunk]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let formatted: Vec<String> = chunks
        .iter()
        .map(|c| format!("{}: {}", c.kind.to_uppercase(), c.content))
        .collect();

    format!("\n\nBusiness Information:\n{}", formatted.join("\n\n"))
}
