//! Parser for integer arguments with optional bounds.

use std::any::TypeId;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parser::{ComponentParser, ParseOutcome, ParsedValue};

/// Parses a single token as an `i64`, optionally range-checked.
#[derive(Debug, Clone, Copy)]
pub struct IntegerParser {
    min: i64,
    max: i64,
}

impl IntegerParser {
    /// Accept any `i64`.
    pub fn any() -> Self {
        Self {
            min: i64::MIN,
            max: i64::MAX,
        }
    }

    /// Accept values in `min..=max`.
    pub fn bounded(min: i64, max: i64) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }
}

#[async_trait]
impl<C> ComponentParser<C> for IntegerParser
where
    C: Send + Sync + 'static,
{
    async fn parse(
        &self,
        _ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseOutcome<ParsedValue> {
        let token = input.peek_string();
        if token.is_empty() {
            return Err(anyhow!("expected an integer"));
        }
        let value: i64 = token
            .parse()
            .map_err(|_| anyhow!("'{token}' is not an integer"))?;
        if value < self.min || value > self.max {
            return Err(anyhow!(
                "{value} is outside the allowed range {}..={}",
                self.min,
                self.max
            ));
        }
        input.read_string();
        Ok(Arc::new(value))
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<i64>()
    }
}
