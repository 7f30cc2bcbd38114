//! Completion suggestions and the post-processing hook applied to them.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A single completion candidate offered for the token being typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Suggestion {
    text: String,
}

impl Suggestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The replacement text for the current token.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Post-processes the raw ordered suggestion set before it is handed back
/// to the caller (deduplication is inherent to the set; processors
/// typically reorder or prune).
pub trait SuggestionProcessor: Send + Sync {
    fn process(&self, suggestions: IndexSet<Suggestion>) -> IndexSet<Suggestion>;
}

/// Leaves the suggestion set exactly as the tree produced it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughProcessor;

impl SuggestionProcessor for PassthroughProcessor {
    fn process(&self, suggestions: IndexSet<Suggestion>) -> IndexSet<Suggestion> {
        suggestions
    }
}

/// Sorts suggestions lexicographically.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortingProcessor;

impl SuggestionProcessor for SortingProcessor {
    fn process(&self, suggestions: IndexSet<Suggestion>) -> IndexSet<Suggestion> {
        let mut sorted: Vec<Suggestion> = suggestions.into_iter().collect();
        sorted.sort_by(|a, b| a.text().cmp(b.text()));
        sorted.into_iter().collect()
    }
}
