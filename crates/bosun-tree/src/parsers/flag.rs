//! Parser for `-s value` / `--long value` flag groups.
//!
//! A flag group consumes every flag-shaped token at the front of the
//! remaining input. Parsing an empty or non-flag front succeeds without
//! consuming anything, which lets the walker pass through a flag node and
//! continue with the components behind it.

use std::any::TypeId;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use bosun_types::Suggestion;

use crate::component::CommandComponent;
use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parser::{ComponentParser, ParseOutcome, ParsedValue, SuggestionProvider};

/// Context key holding the name of the flag whose value is being typed.
///
/// Set during suggestion passes so value providers know which flag is
/// active; absent when the user is not mid-flag.
pub const FLAG_META_KEY: &str = "__parsing_flag__";

/// The context key a parsed flag value is stored under.
pub fn flag_value_key(name: &str) -> String {
    format!("flag::{name}")
}

/// Declares one accepted flag.
pub struct FlagDefinition<C> {
    name: String,
    shorthand: Option<char>,
    value: Option<CommandComponent<C>>,
}

impl<C> FlagDefinition<C>
where
    C: Send + Sync + 'static,
{
    /// A presence flag named `--name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shorthand: None,
            value: None,
        }
    }

    /// Also accept `-c`.
    pub fn with_shorthand(mut self, shorthand: char) -> Self {
        self.shorthand = Some(shorthand);
        self
    }

    /// The flag takes a value parsed by `component`.
    pub fn with_value(mut self, component: CommandComponent<C>) -> Self {
        self.value = Some(component);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shorthand(&self) -> Option<char> {
        self.shorthand
    }

    pub fn value(&self) -> Option<&CommandComponent<C>> {
        self.value.as_ref()
    }
}

impl<C> Clone for FlagDefinition<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            shorthand: self.shorthand,
            value: self.value.clone(),
        }
    }
}

/// The value a flag group parse produces: which flags were present.
#[derive(Debug, Clone, Default)]
pub struct FlagResult {
    parsed: Vec<String>,
}

impl FlagResult {
    /// Long names of the flags that appeared, in input order.
    pub fn parsed(&self) -> &[String] {
        &self.parsed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsed.iter().any(|n| n == name)
    }
}

/// Parses a group of flags anywhere they are reachable in a command.
pub struct FlagParser<C> {
    flags: Vec<FlagDefinition<C>>,
}

impl<C> FlagParser<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(flags: Vec<FlagDefinition<C>>) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> &[FlagDefinition<C>] {
        &self.flags
    }

    /// Resolve a `-s` or `--long` token to its definition.
    fn lookup(&self, token: &str) -> Option<&FlagDefinition<C>> {
        if let Some(name) = token.strip_prefix("--") {
            return self.flags.iter().find(|d| d.name == name);
        }
        let short = token.strip_prefix('-')?;
        let mut chars = short.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        self.flags.iter().find(|d| d.shorthand == Some(c))
    }

    /// The flag whose value the user is currently typing, if any.
    ///
    /// Looks at the last completed token of the remaining input; when it is
    /// a value-taking flag, the token under the cursor belongs to it.
    pub fn parse_current_flag(
        &self,
        _ctx: &CommandContext<C>,
        input: &CommandInput,
    ) -> Option<String> {
        let remaining = input.remaining_input();
        let tokens: Vec<&str> = remaining.split_whitespace().collect();
        if tokens.is_empty() {
            return None;
        }
        let completed = if remaining.ends_with(char::is_whitespace) {
            &tokens[..]
        } else {
            &tokens[..tokens.len() - 1]
        };
        let last = completed.last()?;
        let definition = self.lookup(last)?;
        definition.value.as_ref().map(|_| definition.name.clone())
    }
}

#[async_trait]
impl<C> ComponentParser<C> for FlagParser<C>
where
    C: Send + Sync + 'static,
{
    async fn parse(
        &self,
        ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseOutcome<ParsedValue> {
        let mut result = FlagResult::default();
        loop {
            let token = input.peek_string();
            if token.is_empty() || !token.starts_with('-') {
                break;
            }
            let definition = self
                .lookup(&token)
                .ok_or_else(|| anyhow!("unknown flag '{token}'"))?;
            input.read_string();

            if let Some(component) = &definition.value {
                if input.is_empty_ignoring_whitespace() {
                    return Err(anyhow!("flag '--{}' requires a value", definition.name));
                }
                let value = component
                    .parser()
                    .parse(ctx, input)
                    .await
                    .map_err(|e| anyhow!("invalid value for '--{}': {e}", definition.name))?;
                ctx.store(flag_value_key(&definition.name), value);
            } else {
                ctx.store(flag_value_key(&definition.name), Arc::new(true));
            }
            result.parsed.push(definition.name.clone());
        }
        Ok(Arc::new(result))
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<FlagResult>()
    }

    fn as_flag(&self) -> Option<&FlagParser<C>> {
        Some(self)
    }
}

#[async_trait]
impl<C> SuggestionProvider<C> for FlagParser<C>
where
    C: Send + Sync + 'static,
{
    async fn suggestions(&self, ctx: &CommandContext<C>, current: &str) -> Vec<Suggestion> {
        // Mid-flag: delegate to the active flag's value component.
        if let Some(active) = ctx.get::<String>(FLAG_META_KEY) {
            if let Some(definition) = self.flags.iter().find(|d| d.name == *active) {
                if let Some(component) = &definition.value {
                    return component.suggestion_provider().suggestions(ctx, current).await;
                }
            }
            return Vec::new();
        }

        let mut out = Vec::new();
        for definition in &self.flags {
            out.push(Suggestion::new(format!("--{}", definition.name)));
            if let Some(short) = definition.shorthand {
                out.push(Suggestion::new(format!("-{short}")));
            }
        }
        out
    }
}
