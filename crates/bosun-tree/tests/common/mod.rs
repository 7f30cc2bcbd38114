//! Shared helpers for the dispatch-tree integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use bosun_tree::parsers::IntegerParser;
use bosun_tree::{
    Command, CommandComponent, CommandContext, CommandHandler, CommandInput, CommandTree,
    ParseError, Suggestion, SuggestionProvider,
};

/// A chat-style sender with a permission set.
#[derive(Debug, Clone)]
pub struct Sender {
    pub name: String,
    pub console: bool,
    pub perms: Vec<String>,
}

impl Sender {
    pub fn user(name: &str) -> Self {
        Self {
            name: name.into(),
            console: false,
            perms: Vec::new(),
        }
    }

    pub fn console() -> Self {
        Self {
            name: "console".into(),
            console: true,
            perms: Vec::new(),
        }
    }

    pub fn with_perm(mut self, perm: &str) -> Self {
        self.perms.push(perm.into());
        self
    }
}

pub struct Noop;

#[async_trait]
impl CommandHandler<Sender> for Noop {
    async fn execute(&self, _ctx: &mut CommandContext<Sender>) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn handler() -> Arc<dyn CommandHandler<Sender>> {
    Arc::new(Noop)
}

pub fn lit(name: &'static str) -> CommandComponent<Sender> {
    CommandComponent::literal(name, [])
}

pub fn int(name: &'static str) -> CommandComponent<Sender> {
    CommandComponent::required(name, Arc::new(IntegerParser::any()))
}

/// A provider with a fixed candidate list, for argument components.
pub struct StaticSuggestions(pub Vec<&'static str>);

#[async_trait]
impl SuggestionProvider<Sender> for StaticSuggestions {
    async fn suggestions(&self, _ctx: &CommandContext<Sender>, _current: &str) -> Vec<Suggestion> {
        self.0.iter().map(|s| Suggestion::new(*s)).collect()
    }
}

pub async fn parse(
    tree: &CommandTree<Sender>,
    sender: Sender,
    line: &str,
) -> Result<Arc<Command<Sender>>, ParseError<Sender>> {
    parse_with_ctx(tree, sender, line).await.0
}

pub async fn parse_with_ctx(
    tree: &CommandTree<Sender>,
    sender: Sender,
    line: &str,
) -> (
    Result<Arc<Command<Sender>>, ParseError<Sender>>,
    CommandContext<Sender>,
) {
    let mut ctx = CommandContext::new(sender);
    let mut input = CommandInput::new(line);
    let result = tree.parse(&mut ctx, &mut input).await;
    (result, ctx)
}

pub async fn suggest(tree: &CommandTree<Sender>, sender: Sender, line: &str) -> Vec<String> {
    let ctx = CommandContext::new(sender);
    let mut input = CommandInput::new(line);
    tree.suggest(ctx, &mut input)
        .await
        .iter()
        .map(|s| s.text().to_string())
        .collect()
}
