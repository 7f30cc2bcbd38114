//! Parser for fixed literal keywords.

use std::any::TypeId;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use bosun_types::Suggestion;

use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parser::{ComponentParser, ParseOutcome, ParsedValue, SuggestionProvider};

/// Matches one token against a set of alias strings, case-sensitively.
///
/// The alias set is immutable; when insertion merges two commands onto one
/// literal node, the node's component rebuilds its parser with the merged
/// set instead of mutating a parser other commands may share.
pub struct LiteralParser {
    aliases: Vec<String>,
}

impl LiteralParser {
    /// Create a parser over `aliases`; the first entry is canonical.
    pub fn new(aliases: Vec<String>) -> Self {
        debug_assert!(!aliases.is_empty(), "a literal needs at least one alias");
        Self { aliases }
    }

    /// Whether `token` is one of the accepted spellings.
    pub fn accepts(&self, token: &str) -> bool {
        self.aliases.iter().any(|a| a == token)
    }

    /// The accepted spellings, canonical first.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

#[async_trait]
impl<C> ComponentParser<C> for LiteralParser
where
    C: Send + Sync + 'static,
{
    async fn parse(
        &self,
        _ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseOutcome<ParsedValue> {
        let token = input.peek_string();
        if self.accepts(&token) {
            input.read_string();
            return Ok(Arc::new(token));
        }
        Err(anyhow!(
            "expected '{}', got '{token}'",
            self.aliases.first().map(String::as_str).unwrap_or("")
        ))
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<String>()
    }
}

#[async_trait]
impl<C> SuggestionProvider<C> for LiteralParser
where
    C: Send + Sync + 'static,
{
    async fn suggestions(&self, _ctx: &CommandContext<C>, _current: &str) -> Vec<Suggestion> {
        self.aliases
            .iter()
            .map(|alias| Suggestion::new(alias.as_str()))
            .collect()
    }
}
