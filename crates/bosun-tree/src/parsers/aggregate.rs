//! Parser that decomposes several tokens into named sub-components.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::component::CommandComponent;
use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parser::{AggregateParser, ComponentParser, ParseOutcome, ParsedValue};

/// The combined value an aggregate parse produces.
#[derive(Default)]
pub struct AggregateResult {
    values: HashMap<String, ParsedValue>,
}

impl AggregateResult {
    /// Fetch a sub-component value downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.values
            .get(name)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Runs an ordered list of sub-components against the input, storing each
/// intermediate value under the sub-component's name.
pub struct StandardAggregateParser<C> {
    components: Vec<CommandComponent<C>>,
}

impl<C> StandardAggregateParser<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(components: Vec<CommandComponent<C>>) -> Self {
        debug_assert!(!components.is_empty());
        Self { components }
    }
}

#[async_trait]
impl<C> ComponentParser<C> for StandardAggregateParser<C>
where
    C: Send + Sync + 'static,
{
    async fn parse(
        &self,
        ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseOutcome<ParsedValue> {
        let mut result = AggregateResult::default();
        for component in &self.components {
            if input.is_empty_ignoring_whitespace() {
                return Err(anyhow!("missing '{}'", component.name()));
            }
            let value = component
                .parser()
                .parse(ctx, input)
                .await
                .map_err(|e| anyhow!("in '{}': {e}", component.name()))?;
            ctx.store(component.name().to_string(), value.clone());
            result.values.insert(component.name().to_string(), value);
        }
        Ok(Arc::new(result))
    }

    fn requested_argument_count(&self) -> usize {
        self.components
            .iter()
            .map(|c| c.parser().requested_argument_count())
            .sum()
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<AggregateResult>()
    }

    fn as_aggregate(&self) -> Option<&dyn AggregateParser<C>> {
        Some(self)
    }
}

impl<C> AggregateParser<C> for StandardAggregateParser<C>
where
    C: Send + Sync + 'static,
{
    fn components(&self) -> &[CommandComponent<C>] {
        &self.components
    }
}
