//! Capabilities injected into the tree by the host.

use std::sync::Arc;

use bosun_types::{PassthroughProcessor, PermissionAuthority, SuggestionProcessor, WildcardAuthority};

use crate::command::Command;
use crate::component::{CommandComponent, ComponentType};

/// Receives every command the tree accepts, once per leaf it terminates.
///
/// Hosts typically use this to mirror registrations into a platform
/// command map (shell completion files, a chat service's slash-command
/// API, and so on).
pub trait RegistrationHandler<C>: Send + Sync {
    fn register(&self, command: &Command<C>);
}

/// A registration handler that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRegistrationHandler;

impl<C> RegistrationHandler<C> for NullRegistrationHandler {
    fn register(&self, _command: &Command<C>) {}
}

/// Renders a human-readable command path for error messages.
pub trait SyntaxFormatter<C>: Send + Sync {
    /// Format the components parsed so far followed by the expected
    /// continuation below the failure node.
    fn format(&self, parsed: &[CommandComponent<C>], following: &[CommandComponent<C>]) -> String;
}

/// `literal <required> [optional]` style rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSyntaxFormatter;

impl StandardSyntaxFormatter {
    fn piece<C>(component: &CommandComponent<C>) -> String
    where
        C: Send + Sync + 'static,
    {
        match component.component_type() {
            ComponentType::Literal => component.name().to_string(),
            ComponentType::Argument if component.is_required() => {
                format!("<{}>", component.name())
            }
            ComponentType::Argument => format!("[{}]", component.name()),
            ComponentType::Flag => match component.parser().as_flag() {
                Some(flags) => flags
                    .flags()
                    .iter()
                    .map(|d| format!("[--{}]", d.name()))
                    .collect::<Vec<_>>()
                    .join(" "),
                None => format!("[--{}]", component.name()),
            },
        }
    }
}

impl<C> SyntaxFormatter<C> for StandardSyntaxFormatter
where
    C: Send + Sync + 'static,
{
    fn format(&self, parsed: &[CommandComponent<C>], following: &[CommandComponent<C>]) -> String {
        parsed
            .iter()
            .chain(following)
            .map(Self::piece)
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The capabilities a [`CommandTree`](crate::tree::CommandTree) consults.
pub struct TreeHooks<C> {
    /// Yes/no oracle for `(sender, permission)` pairs.
    pub authority: Arc<dyn PermissionAuthority<C>>,
    /// Receives accepted commands during verification.
    pub registration: Arc<dyn RegistrationHandler<C>>,
    /// Renders command paths for syntax errors.
    pub formatter: Arc<dyn SyntaxFormatter<C>>,
    /// Post-processes the suggestion set.
    pub processor: Arc<dyn SuggestionProcessor>,
}

impl<C> Default for TreeHooks<C>
where
    C: Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            authority: Arc::new(WildcardAuthority),
            registration: Arc::new(NullRegistrationHandler),
            formatter: Arc::new(StandardSyntaxFormatter),
            processor: Arc::new(PassthroughProcessor),
        }
    }
}
