//! Prefix-trie command dispatcher with async parsing and completion.
//!
//! Commands are declared as sequences of [`CommandComponent`]s (literal
//! keywords, typed arguments, flag groups) and inserted into a
//! [`CommandTree`]. The tree resolves tokenized input to a single command,
//! walking literal branches first and committing to the unique variable
//! child of a node when no literal matches; failed speculative branches
//! rewind the input cursor and are tried in child order. The same descent,
//! run speculatively, produces completion suggestions for the token under
//! the cursor.
//!
//! Parsing is asynchronous end to end: component parsers return futures
//! and the walker chains them, so a parser may consult slow lookups
//! without blocking the host. The tree itself is mutated only by
//! [`CommandTree::insert_command`] under a write lock; parse and suggest
//! calls are read-only.
//!
//! ```
//! use std::sync::Arc;
//!
//! use bosun_tree::{
//!     Command, CommandComponent, CommandContext, CommandHandler, CommandInput, CommandTree,
//! };
//! use bosun_tree::parsers::IntegerParser;
//!
//! struct Restart;
//!
//! #[async_trait::async_trait]
//! impl CommandHandler<String> for Restart {
//!     async fn execute(&self, ctx: &mut CommandContext<String>) -> anyhow::Result<()> {
//!         let count = ctx.get::<i64>("count").expect("parsed argument");
//!         println!("restarting {count} workers");
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tree: CommandTree<String> = CommandTree::default();
//! tree.insert_command(Command::new(
//!     vec![
//!         CommandComponent::literal("restart", []),
//!         CommandComponent::required("count", Arc::new(IntegerParser::bounded(1, 64))),
//!     ],
//!     Arc::new(Restart),
//! ))
//! .unwrap();
//!
//! let mut ctx = CommandContext::new("operator".to_string());
//! let mut input = CommandInput::new("restart 4");
//! let command = tree.parse(&mut ctx, &mut input).await.unwrap();
//! command.execute(&mut ctx).await.unwrap();
//! # }
//! ```

pub mod command;
pub mod component;
pub mod context;
pub mod error;
pub mod hooks;
pub mod input;
pub mod parser;
pub mod parsers;
pub mod tree;

pub use command::{Command, CommandHandler, SenderRequirement};
pub use component::{CommandComponent, ComponentType, DefaultValue};
pub use context::{CommandContext, ParsingContext, SuggestionContext};
pub use error::{InsertError, ParseError};
pub use hooks::{
    NullRegistrationHandler, RegistrationHandler, StandardSyntaxFormatter, SyntaxFormatter,
    TreeHooks,
};
pub use input::CommandInput;
pub use parser::{
    AggregateParser, ComponentParser, NoSuggestions, ParseOutcome, ParsedValue, SuggestionProvider,
};
pub use tree::{CommandTree, NodeId};

pub use bosun_types::{Permission, PermissionAuthority, Settings, Suggestion};
