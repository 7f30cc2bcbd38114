//! Parser and suggestion capabilities consulted by the tree walker.
//!
//! Every component carries a [`ComponentParser`] that turns a prefix of the
//! input into a value, and a [`SuggestionProvider`] that completes the token
//! currently being typed. The walker treats parsers as opaque except for
//! the capability hooks, which let it recognize the two variants that get
//! special handling (flag groups and aggregates). Literal dispatch needs no
//! hook: the component kind already identifies literals.

use std::any::{Any, TypeId};
use std::sync::Arc;

use async_trait::async_trait;
use bosun_types::Suggestion;

use crate::component::CommandComponent;
use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parsers::FlagParser;

/// A type-erased parsed argument value.
///
/// Values are reference counted so they can be stored in the context and
/// handed to intermediate bookkeeping without cloning the payload.
pub type ParsedValue = Arc<dyn Any + Send + Sync>;

/// Result of a single parse or preprocess step.
///
/// On success the parser has advanced the input cursor past what it
/// consumed. On failure the caller rewinds to its own snapshot; parsers are
/// not required to restore the cursor themselves.
pub type ParseOutcome<T> = Result<T, anyhow::Error>;

/// Parses one command component from the input.
#[async_trait]
pub trait ComponentParser<C>: Send + Sync {
    /// Parse a single value from the front of `input`.
    async fn parse(
        &self,
        ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseOutcome<ParsedValue>;

    /// Cheap gating check run before [`parse`](Self::parse). Returning
    /// `Ok(false)` or an error skips parsing entirely.
    fn preprocess(
        &self,
        _ctx: &mut CommandContext<C>,
        _input: &mut CommandInput,
    ) -> ParseOutcome<bool> {
        Ok(true)
    }

    /// How many whitespace tokens this parser consumes.
    fn requested_argument_count(&self) -> usize {
        1
    }

    /// The concrete Rust type of the values this parser produces. Two
    /// argument components only share a tree node when this matches.
    fn value_type_id(&self) -> TypeId;

    /// Capability hook: this parser decomposes into named sub-components.
    fn as_aggregate(&self) -> Option<&dyn AggregateParser<C>> {
        None
    }

    /// Capability hook: this parser consumes `-s` / `--long` flag groups.
    fn as_flag(&self) -> Option<&FlagParser<C>> {
        None
    }
}

/// A parser that consumes several tokens, decomposed into an ordered list
/// of named sub-components.
pub trait AggregateParser<C>: ComponentParser<C> {
    /// The sub-components in parse order.
    fn components(&self) -> &[CommandComponent<C>];
}

/// Produces completion candidates for the token currently being typed.
#[async_trait]
pub trait SuggestionProvider<C>: Send + Sync {
    /// Candidates for the current partial token. The tree filters the
    /// result down to prefix matches afterwards.
    async fn suggestions(&self, ctx: &CommandContext<C>, current: &str) -> Vec<Suggestion>;
}

/// A provider with nothing to offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSuggestions;

#[async_trait]
impl<C> SuggestionProvider<C> for NoSuggestions
where
    C: Send + Sync + 'static,
{
    async fn suggestions(&self, _ctx: &CommandContext<C>, _current: &str) -> Vec<Suggestion> {
        Vec::new()
    }
}
