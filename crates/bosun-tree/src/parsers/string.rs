//! Parser for string arguments.

use std::any::TypeId;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parser::{ComponentParser, ParseOutcome, ParsedValue};

/// How much input a [`StringParser`] consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMode {
    /// One whitespace-delimited token.
    Single,
    /// Everything that remains, whitespace included.
    Greedy,
}

/// Parses a `String` argument in the configured mode.
#[derive(Debug, Clone, Copy)]
pub struct StringParser {
    mode: StringMode,
}

impl StringParser {
    pub fn new(mode: StringMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> StringMode {
        self.mode
    }
}

#[async_trait]
impl<C> ComponentParser<C> for StringParser
where
    C: Send + Sync + 'static,
{
    async fn parse(
        &self,
        _ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseOutcome<ParsedValue> {
        if input.is_empty_ignoring_whitespace() {
            return Err(anyhow!("expected a string"));
        }
        let value = match self.mode {
            StringMode::Single => input.read_string(),
            StringMode::Greedy => input.read_remaining(),
        };
        Ok(Arc::new(value))
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<String>()
    }
}
