//! Executable commands: a component path plus the handler that runs it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bosun_types::Permission;

use crate::component::{CommandComponent, ComponentType};
use crate::context::CommandContext;

/// Executes a fully parsed command against its context.
#[async_trait]
pub trait CommandHandler<C>: Send + Sync {
    async fn execute(&self, ctx: &mut CommandContext<C>) -> anyhow::Result<()>;
}

/// A named predicate restricting which senders may run a command.
pub struct SenderRequirement<C> {
    kind: String,
    test: Arc<dyn Fn(&C) -> bool + Send + Sync>,
}

impl<C> SenderRequirement<C> {
    pub fn new(kind: impl Into<String>, test: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        Self {
            kind: kind.into(),
            test: Arc::new(test),
        }
    }

    /// The human-readable name of the required sender kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn accepts(&self, sender: &C) -> bool {
        (self.test)(sender)
    }
}

impl<C> Clone for SenderRequirement<C> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            test: Arc::clone(&self.test),
        }
    }
}

/// A declarative command: ordered non-flag components, an optional flag
/// group, a permission, an optional sender restriction, and the handler.
pub struct Command<C> {
    components: Vec<CommandComponent<C>>,
    flag_component: Option<CommandComponent<C>>,
    permission: Permission,
    sender_requirement: Option<SenderRequirement<C>>,
    handler: Arc<dyn CommandHandler<C>>,
}

impl<C> Command<C>
where
    C: Send + Sync + 'static,
{
    /// Create a command from its non-flag components and handler.
    ///
    /// No required component may follow an optional one; any well-formed
    /// construction site guarantees it, so it is a debug assertion here.
    /// That the first component is a literal is enforced by the tree at
    /// insertion time.
    pub fn new(components: Vec<CommandComponent<C>>, handler: Arc<dyn CommandHandler<C>>) -> Self {
        debug_assert!(
            !components
                .windows(2)
                .any(|w| !w[0].is_required() && w[1].is_required()),
            "required components may not follow optional ones"
        );
        Self {
            components,
            flag_component: None,
            permission: Permission::None,
            sender_requirement: None,
            handler,
        }
    }

    /// Attach the single flag group of this command.
    pub fn with_flags(mut self, flag_component: CommandComponent<C>) -> Self {
        debug_assert!(flag_component.component_type() == ComponentType::Flag);
        self.flag_component = Some(flag_component);
        self
    }

    /// Require a permission to execute this command.
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Restrict the sender kinds this command accepts.
    pub fn with_sender_requirement(mut self, requirement: SenderRequirement<C>) -> Self {
        self.sender_requirement = Some(requirement);
        self
    }

    /// The ordered non-flag components.
    pub fn components(&self) -> &[CommandComponent<C>] {
        &self.components
    }

    pub fn flag_component(&self) -> Option<&CommandComponent<C>> {
        self.flag_component.as_ref()
    }

    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    pub fn sender_requirement(&self) -> Option<&SenderRequirement<C>> {
        self.sender_requirement.as_ref()
    }

    pub fn handler(&self) -> Arc<dyn CommandHandler<C>> {
        Arc::clone(&self.handler)
    }

    /// Run the handler against a parsed context.
    pub async fn execute(&self, ctx: &mut CommandContext<C>) -> anyhow::Result<()> {
        self.handler.execute(ctx).await
    }

    /// A compact rendering of the component path, for logs and errors.
    pub fn path(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for component in &self.components {
            parts.push(match component.component_type() {
                ComponentType::Literal => component.name().to_string(),
                ComponentType::Argument if component.is_required() => {
                    format!("<{}>", component.name())
                }
                ComponentType::Argument => format!("[{}]", component.name()),
                ComponentType::Flag => format!("[--{}]", component.name()),
            });
        }
        if let Some(flags) = &self.flag_component {
            parts.push(format!("[--{}]", flags.name()));
        }
        parts.join(" ")
    }
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("components", &self.components.len())
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}
