//! Command components: the labeled segments a command path is made of.
//!
//! A component is either a literal keyword, a typed argument, or a flag
//! group. Components double as tree-node payloads once a command has been
//! grafted onto the dispatch tree; the terminal component of a command
//! additionally records the command it completes.

use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::parser::{ComponentParser, ParsedValue, SuggestionProvider};
use crate::parsers::{FlagParser, LiteralParser};

/// The kind of a command component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Matches a fixed set of alias strings.
    Literal,
    /// A typed, named argument parsed from one or more tokens.
    Argument,
    /// A group of `-s value` / `--long value` modifiers.
    Flag,
}

/// What to do when an optional component receives no input.
#[derive(Clone)]
pub enum DefaultValue {
    /// Supply this value directly, bypassing the parser.
    Constant(ParsedValue),
    /// Re-feed this text through the component's parser.
    Parsed(String),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Constant(_) => f.write_str("Constant(..)"),
            DefaultValue::Parsed(text) => write!(f, "Parsed({text:?})"),
        }
    }
}

/// One segment of a command path.
pub struct CommandComponent<C> {
    name: String,
    component_type: ComponentType,
    aliases: Vec<String>,
    parser: Arc<dyn ComponentParser<C>>,
    suggestion_provider: Arc<dyn SuggestionProvider<C>>,
    required: bool,
    default_value: Option<DefaultValue>,
    owning_command: Option<Arc<Command<C>>>,
}

impl<C> Clone for CommandComponent<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            component_type: self.component_type,
            aliases: self.aliases.clone(),
            parser: Arc::clone(&self.parser),
            suggestion_provider: Arc::clone(&self.suggestion_provider),
            required: self.required,
            default_value: self.default_value.clone(),
            owning_command: self.owning_command.clone(),
        }
    }
}

impl<C> fmt::Debug for CommandComponent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandComponent")
            .field("name", &self.name)
            .field("type", &self.component_type)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl<C> CommandComponent<C>
where
    C: Send + Sync + 'static,
{
    /// A literal keyword. `name` is the canonical alias; `aliases` adds
    /// alternate spellings. Matching during parsing is case-sensitive.
    pub fn literal(
        name: impl Into<String>,
        aliases: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        let name = name.into();
        let mut all = vec![name.clone()];
        all.extend(aliases.into_iter().map(str::to_string));
        let parser = Arc::new(LiteralParser::new(all.clone()));
        Self {
            name,
            component_type: ComponentType::Literal,
            aliases: all,
            parser: parser.clone(),
            suggestion_provider: parser,
            required: true,
            default_value: None,
            owning_command: None,
        }
    }

    /// A required typed argument.
    pub fn required(name: impl Into<String>, parser: Arc<dyn ComponentParser<C>>) -> Self {
        Self::argument(name, parser, true)
    }

    /// An optional typed argument. Optional components may only appear at
    /// the tail of a command.
    pub fn optional(name: impl Into<String>, parser: Arc<dyn ComponentParser<C>>) -> Self {
        Self::argument(name, parser, false)
    }

    fn argument(name: impl Into<String>, parser: Arc<dyn ComponentParser<C>>, required: bool) -> Self {
        Self {
            name: name.into(),
            component_type: ComponentType::Argument,
            aliases: Vec::new(),
            parser,
            suggestion_provider: Arc::new(crate::parser::NoSuggestions),
            required,
            default_value: None,
            owning_command: None,
        }
    }

    /// A flag group component backed by `parser`.
    pub fn flag(name: impl Into<String>, parser: Arc<FlagParser<C>>) -> Self {
        Self {
            name: name.into(),
            component_type: ComponentType::Flag,
            aliases: Vec::new(),
            parser: parser.clone(),
            suggestion_provider: parser,
            required: false,
            default_value: None,
            owning_command: None,
        }
    }

    /// Attach a default value, used when the component is elided.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default_value = Some(default);
        self
    }

    /// Replace the suggestion provider.
    pub fn with_suggestions(mut self, provider: Arc<dyn SuggestionProvider<C>>) -> Self {
        self.suggestion_provider = provider;
        self
    }

    /// Merge `alias` into this literal so the node answers to both names.
    ///
    /// The parser is rebuilt from the merged alias set rather than mutated
    /// in place: the original parser may still be shared with the command
    /// that first introduced this literal.
    pub(crate) fn insert_alias(&mut self, alias: &str) {
        if self.component_type != ComponentType::Literal
            || self.aliases.iter().any(|a| a == alias)
        {
            return;
        }
        self.aliases.push(alias.to_string());

        let provider_is_parser = Arc::as_ptr(&self.parser) as *const u8
            == Arc::as_ptr(&self.suggestion_provider) as *const u8;
        let parser = Arc::new(LiteralParser::new(self.aliases.clone()));
        self.parser = parser.clone();
        if provider_is_parser {
            self.suggestion_provider = parser;
        }
    }
}

impl<C> CommandComponent<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Alias strings; empty unless this is a literal. The first entry is
    /// canonical.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn parser(&self) -> Arc<dyn ComponentParser<C>> {
        Arc::clone(&self.parser)
    }

    pub fn suggestion_provider(&self) -> Arc<dyn SuggestionProvider<C>> {
        Arc::clone(&self.suggestion_provider)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default_value.as_ref()
    }

    /// The command this component terminates, if any. Set at most once,
    /// during insertion.
    pub fn owning_command(&self) -> Option<Arc<Command<C>>> {
        self.owning_command.clone()
    }

    pub(crate) fn set_owning_command(&mut self, command: Arc<Command<C>>) {
        self.owning_command = Some(command);
    }

    /// Whether `other` occupies the same tree node as this component.
    ///
    /// Literals collide on any alias overlap; arguments and flags collide
    /// on name, kind, and produced value type.
    pub fn matches(&self, other: &CommandComponent<C>) -> bool {
        if self.component_type != other.component_type {
            return false;
        }
        if self.component_type == ComponentType::Literal {
            return self
                .aliases
                .iter()
                .any(|a| other.aliases.iter().any(|b| a == b));
        }
        self.name == other.name && self.parser.value_type_id() == other.parser.value_type_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{IntegerParser, StringMode, StringParser};

    type Component = CommandComponent<()>;

    #[test]
    fn literal_components_match_on_alias_overlap() {
        let a = Component::literal("teleport", ["tp"]);
        let b = Component::literal("tp", []);
        let c = Component::literal("warp", []);
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn arguments_match_on_name_and_value_type() {
        let int_a = Component::required("n", Arc::new(IntegerParser::any()));
        let int_b = Component::required("n", Arc::new(IntegerParser::bounded(0, 10)));
        let string = Component::required("n", Arc::new(StringParser::new(StringMode::Single)));
        let renamed = Component::required("m", Arc::new(IntegerParser::any()));

        assert!(int_a.matches(&int_b), "parser configuration is not identity");
        assert!(!int_a.matches(&string), "value type participates in identity");
        assert!(!int_a.matches(&renamed));
    }

    #[test]
    fn literal_never_matches_argument() {
        let lit = Component::literal("n", []);
        let arg = Component::required("n", Arc::new(IntegerParser::any()));
        assert!(!lit.matches(&arg));
    }

    #[test]
    fn insert_alias_extends_component_and_parser() {
        let mut lit = Component::literal("teleport", []);
        lit.insert_alias("tp");
        assert!(lit.aliases().contains(&"tp".to_string()));
        let other = Component::literal("tp", []);
        assert!(lit.matches(&other));
    }
}
