//! Error types for tree insertion and input resolution.
//!
//! Parse failures carry the component chain that was walked when the error
//! surfaced, so hosts can render "did you mean" style messages. Parser
//! failures observed while scanning sibling branches are absorbed by the
//! walker and never appear here; only failures on a committed branch
//! become [`ParseError::ArgumentParse`].

use std::fmt;
use std::sync::Arc;

use bosun_types::Permission;
use thiserror::Error;

use crate::command::Command;
use crate::component::CommandComponent;

/// Failure to resolve input to a command.
#[derive(Error)]
pub enum ParseError<C> {
    /// No root child matched the first token.
    #[error("no such command '{token}'")]
    NoSuchCommand {
        chain: Vec<CommandComponent<C>>,
        token: String,
    },

    /// The walker ran out of matching children, or a command ended with
    /// input left over.
    #[error("invalid command syntax, expected '{syntax}'")]
    InvalidSyntax {
        syntax: String,
        chain: Vec<CommandComponent<C>>,
    },

    /// The sender is missing a permission somewhere on the accepted path.
    #[error("missing permission {permission}")]
    NoPermission {
        permission: Permission,
        chain: Vec<CommandComponent<C>>,
    },

    /// The resolved command restricts sender kinds and this sender is not
    /// one of them.
    #[error("this command requires a '{expected}' sender")]
    InvalidCommandSender {
        expected: String,
        chain: Vec<CommandComponent<C>>,
    },

    /// A committed component parser rejected its input.
    #[error("invalid argument: {failure}")]
    ArgumentParse {
        failure: anyhow::Error,
        chain: Vec<CommandComponent<C>>,
    },
}

impl<C> ParseError<C> {
    /// The component chain walked up to the failure point.
    pub fn chain(&self) -> &[CommandComponent<C>] {
        match self {
            ParseError::NoSuchCommand { chain, .. }
            | ParseError::InvalidSyntax { chain, .. }
            | ParseError::NoPermission { chain, .. }
            | ParseError::InvalidCommandSender { chain, .. }
            | ParseError::ArgumentParse { chain, .. } => chain,
        }
    }
}

impl<C> fmt::Debug for ParseError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NoSuchCommand { token, .. } => {
                f.debug_struct("NoSuchCommand").field("token", token).finish()
            }
            ParseError::InvalidSyntax { syntax, .. } => {
                f.debug_struct("InvalidSyntax").field("syntax", syntax).finish()
            }
            ParseError::NoPermission { permission, .. } => f
                .debug_struct("NoPermission")
                .field("permission", permission)
                .finish(),
            ParseError::InvalidCommandSender { expected, .. } => f
                .debug_struct("InvalidCommandSender")
                .field("expected", expected)
                .finish(),
            ParseError::ArgumentParse { failure, .. } => f
                .debug_struct("ArgumentParse")
                .field("failure", failure)
                .finish(),
        }
    }
}

/// Failure to graft a command onto the tree.
///
/// Insertion is atomic: when any of these surface, the tree is unchanged.
#[derive(Error)]
pub enum InsertError<C> {
    /// The terminal node already owns a command.
    #[error("duplicate command chain at '{}'", .component.name())]
    DuplicateCommand {
        component: CommandComponent<C>,
        existing: Arc<Command<C>>,
    },

    /// Two variable siblings, or two literal siblings sharing an alias.
    #[error("ambiguous node '{}'", .child.name())]
    AmbiguousNode {
        parent: Option<CommandComponent<C>>,
        child: CommandComponent<C>,
        siblings: Vec<CommandComponent<C>>,
    },

    /// A leaf ended up without an owning command.
    #[error("leaf node '{}' has no command attached", .component.name())]
    NoCommandInLeaf { component: CommandComponent<C> },

    /// A root child must be a literal.
    #[error("top-level component '{}' must be a literal", .component.name())]
    TopLevelVariable { component: CommandComponent<C> },
}

impl<C> fmt::Debug for InsertError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::DuplicateCommand { component, existing } => f
                .debug_struct("DuplicateCommand")
                .field("component", component)
                .field("existing", existing)
                .finish(),
            InsertError::AmbiguousNode { child, siblings, .. } => f
                .debug_struct("AmbiguousNode")
                .field("child", child)
                .field("siblings", &siblings.len())
                .finish(),
            InsertError::NoCommandInLeaf { component } => f
                .debug_struct("NoCommandInLeaf")
                .field("component", component)
                .finish(),
            InsertError::TopLevelVariable { component } => f
                .debug_struct("TopLevelVariable")
                .field("component", component)
                .finish(),
        }
    }
}
