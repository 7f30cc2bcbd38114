//! Per-invocation state threaded through parsing and suggesting.
//!
//! A [`CommandContext`] belongs to a single parse or suggest call. It owns
//! the sender, the map of parsed argument values, and the per-component
//! parsing records. A [`SuggestionContext`] wraps a command context and
//! accumulates the ordered suggestion set.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bosun_types::{Suggestion, SuggestionProcessor};
use indexmap::IndexSet;

use crate::component::CommandComponent;
use crate::parser::ParsedValue;

/// State for one parse or suggest invocation.
pub struct CommandContext<C> {
    sender: C,
    store: HashMap<String, ParsedValue>,
    current_component: Option<CommandComponent<C>>,
    parsing: Vec<ParsingContext>,
}

impl<C> CommandContext<C> {
    pub fn new(sender: C) -> Self {
        Self {
            sender,
            store: HashMap::new(),
            current_component: None,
            parsing: Vec::new(),
        }
    }

    pub fn sender(&self) -> &C {
        &self.sender
    }

    /// Store a parsed value under a component name (or internal key).
    pub fn store(&mut self, key: impl Into<String>, value: ParsedValue) {
        self.store.insert(key.into(), value);
    }

    /// Fetch a stored value downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.store
            .get(key)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Fetch a stored value without downcasting.
    pub fn get_raw(&self, key: &str) -> Option<ParsedValue> {
        self.store.get(key).cloned()
    }

    pub fn remove(&mut self, key: &str) -> Option<ParsedValue> {
        self.store.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    /// The component currently being parsed or suggested for.
    pub fn current_component(&self) -> Option<&CommandComponent<C>> {
        self.current_component.as_ref()
    }

    pub fn set_current_component(&mut self, component: CommandComponent<C>) {
        self.current_component = Some(component);
    }

    /// Record the bookkeeping for one component parse attempt.
    pub fn record_parsing(&mut self, parsing: ParsingContext) {
        self.parsing.push(parsing);
    }

    /// All recorded parse attempts, in order.
    pub fn parsing_contexts(&self) -> &[ParsingContext] {
        &self.parsing
    }
}

/// Bookkeeping for a single component parse attempt.
#[derive(Debug, Clone)]
pub struct ParsingContext {
    component_name: String,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    success: bool,
    consumed_input: Vec<String>,
}

impl ParsingContext {
    pub fn new(component_name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            started_at: None,
            ended_at: None,
            success: false,
            consumed_input: Vec::new(),
        }
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn mark_start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn mark_end(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    pub fn set_success(&mut self, success: bool) {
        self.success = success;
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn set_consumed(&mut self, tokens: Vec<String>) {
        self.consumed_input = tokens;
    }

    /// The whitespace-separated tokens this attempt consumed.
    pub fn consumed_input(&self) -> &[String] {
        &self.consumed_input
    }

    /// Wall time between start and end marks, if both were recorded.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }
}

/// Accumulates suggestions during a speculative descent.
pub struct SuggestionContext<C> {
    context: CommandContext<C>,
    suggestions: IndexSet<Suggestion>,
    processor: Arc<dyn SuggestionProcessor>,
}

impl<C> SuggestionContext<C> {
    pub fn new(context: CommandContext<C>, processor: Arc<dyn SuggestionProcessor>) -> Self {
        Self {
            context,
            suggestions: IndexSet::new(),
            processor,
        }
    }

    pub fn context(&self) -> &CommandContext<C> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CommandContext<C> {
        &mut self.context
    }

    pub fn add(&mut self, suggestion: Suggestion) {
        self.suggestions.insert(suggestion);
    }

    pub fn add_all(&mut self, suggestions: impl IntoIterator<Item = Suggestion>) {
        for suggestion in suggestions {
            self.suggestions.insert(suggestion);
        }
    }

    pub fn suggestions(&self) -> &IndexSet<Suggestion> {
        &self.suggestions
    }

    /// Run the processor over the accumulated set and return it.
    pub fn finish(self) -> IndexSet<Suggestion> {
        self.processor.process(self.suggestions)
    }
}
