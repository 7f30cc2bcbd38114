//! The command dispatch tree.
//!
//! Commands are grafted onto a prefix trie keyed by their components.
//! Parsing walks the trie against a cursor-backed input: literal children
//! are preferred, sibling branches are scanned speculatively with the
//! cursor rewound after each miss, and a node with a single variable child
//! is entered directly without backtracking. Suggesting performs the same
//! descent speculatively and collects completion candidates for the token
//! under the cursor.
//!
//! Insertion and verification run under the tree's write lock and never
//! overlap with parsing. Read paths take short read locks that are never
//! held across a suspension point.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bosun_types::{Permission, PermissionAuthority, Settings, Suggestion};
use futures::future::BoxFuture;
use indexmap::IndexSet;
use slab::Slab;
use tracing::{debug, info, trace};

use crate::command::Command;
use crate::component::{CommandComponent, ComponentType, DefaultValue};
use crate::context::{CommandContext, ParsingContext, SuggestionContext};
use crate::error::{InsertError, ParseError};
use crate::hooks::TreeHooks;
use crate::input::CommandInput;
use crate::parser::{AggregateParser, ParsedValue};
use crate::parsers::FLAG_META_KEY;

/// Stable identifier of a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One tree node: an optional component (absent only at the synthetic
/// root), ordered children, a non-owning parent link, and the cached
/// aggregated permission.
struct NodeData<C> {
    component: Option<CommandComponent<C>>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    permission: Option<Permission>,
}

impl<C> Clone for NodeData<C> {
    fn clone(&self) -> Self {
        Self {
            component: self.component.clone(),
            children: self.children.clone(),
            parent: self.parent,
            permission: self.permission.clone(),
        }
    }
}

/// The arena holding every node. Parent links are plain ids, so ownership
/// stays strictly tree-shaped.
struct TreeState<C> {
    nodes: Slab<NodeData<C>>,
    root: NodeId,
}

impl<C> Clone for TreeState<C> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
        }
    }
}

impl<C> TreeState<C>
where
    C: Send + Sync + 'static,
{
    fn new() -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(NodeData {
            component: None,
            children: Vec::new(),
            parent: None,
            permission: None,
        }));
        Self { nodes, root }
    }

    fn node(&self, id: NodeId) -> &NodeData<C> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData<C> {
        &mut self.nodes[id.0]
    }

    fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).children.is_empty()
    }

    /// The existing child matching `component`, by alias overlap for
    /// literals and by name plus value type otherwise.
    fn get_child(&self, parent: NodeId, component: &CommandComponent<C>) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| {
                self.node(child)
                    .component
                    .as_ref()
                    .is_some_and(|c| c.matches(component))
            })
    }

    fn add_child(&mut self, parent: NodeId, component: CommandComponent<C>) -> NodeId {
        let child = NodeId(self.nodes.insert(NodeData {
            component: Some(component),
            children: Vec::new(),
            parent: Some(parent),
            permission: None,
        }));
        self.node_mut(parent).children.push(child);
        child
    }

    /// Detach `child` from `parent`'s child list. The node itself stays in
    /// the arena until its slot is freed.
    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.retain(|&c| c != child);
    }

    /// Reorder `id`'s children so literals precede variable components.
    /// The sort is stable, so insertion order is kept within each class.
    fn sort_children(&mut self, id: NodeId) {
        let mut children = std::mem::take(&mut self.nodes[id.0].children);
        children.sort_by_key(|child| {
            !matches!(
                self.nodes[child.0].component.as_ref().map(CommandComponent::component_type),
                Some(ComponentType::Literal)
            )
        });
        self.nodes[id.0].children = children;
    }

    /// Components on the path from the root down to `id`.
    fn chain_components(&self, id: NodeId) -> Vec<CommandComponent<C>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(component) = &self.node(node).component {
                chain.push(component.clone());
            }
            current = self.node(node).parent;
        }
        chain.reverse();
        chain
    }

    /// The expected continuation below `id`: components along the chain of
    /// single children. Used to render syntax errors.
    fn following_components(&self, id: NodeId) -> Vec<CommandComponent<C>> {
        let mut following = Vec::new();
        let mut current = id;
        while self.node(current).children.len() == 1 {
            current = self.node(current).children[0];
            if let Some(component) = &self.node(current).component {
                following.push(component.clone());
            }
        }
        following
    }

    fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_leaf(id) {
            if self.node(id).component.is_some() {
                out.push(id);
            }
            return;
        }
        for child in self.node(id).children.clone() {
            self.collect_leaves(child, out);
        }
    }
}

/// Outcome of the single-variable-child fast path.
enum FastPath<C> {
    /// No unique variable child applies here; fall back to the sibling scan.
    NotApplicable,
    /// The branch was committed and produced a final outcome.
    Settled(Result<Option<Arc<Command<C>>>, ParseError<C>>),
}

/// A registry of commands resolvable from tokenized input.
pub struct CommandTree<C> {
    state: RwLock<TreeState<C>>,
    settings: Settings,
    hooks: TreeHooks<C>,
}

impl<C> Default for CommandTree<C>
where
    C: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Settings::default(), TreeHooks::default())
    }
}

impl<C> CommandTree<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(settings: Settings, hooks: TreeHooks<C>) -> Self {
        Self {
            state: RwLock::new(TreeState::new()),
            settings,
            hooks,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Take the state lock, recovering a poisoned guard instead of
    /// panicking. Insertion mutates a detached copy and installs it with a
    /// single assignment, and deletion runs no caller code while the guard
    /// is held, so a recovered guard still observes a consistent tree.
    fn read(&self) -> RwLockReadGuard<'_, TreeState<C>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TreeState<C>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The root nodes, one per top-level literal.
    pub fn root_nodes(&self) -> Vec<NodeId> {
        let state = self.read();
        state.node(state.root).children.clone()
    }

    /// The root node answering to `name`, matched case-insensitively
    /// against its aliases. Parsing itself matches literals exactly; this
    /// relaxed lookup exists for help and introspection surfaces.
    pub fn named_node(&self, name: &str) -> Option<NodeId> {
        let state = self.read();
        state
            .node(state.root)
            .children
            .iter()
            .copied()
            .find(|&child| {
                state.node(child).component.as_ref().is_some_and(|component| {
                    component.component_type() == ComponentType::Literal
                        && component
                            .aliases()
                            .iter()
                            .any(|alias| alias.eq_ignore_ascii_case(name))
                })
            })
    }

    /// The component stored at `id`, if the node still exists and is not
    /// the synthetic root.
    pub fn node_component(&self, id: NodeId) -> Option<CommandComponent<C>> {
        self.read().nodes.get(id.0).and_then(|n| n.component.clone())
    }

    pub fn node_children(&self, id: NodeId) -> Vec<NodeId> {
        self.read()
            .nodes
            .get(id.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Graft `command` onto the tree and re-verify the tree invariants.
    ///
    /// The mutation runs against a copy of the arena and replaces the live
    /// tree only once verification passes, so a failed insert leaves no
    /// trace.
    pub fn insert_command(&self, command: Command<C>) -> Result<Arc<Command<C>>, InsertError<C>> {
        let command = Arc::new(command);
        let mut state = self.write();
        let mut working = state.clone();
        Self::graft(&mut working, &command, &self.settings)?;
        Self::verify_and_register(&mut working, &self.settings, &self.hooks)?;
        *state = working;
        info!(command = %command.path(), "command inserted");
        Ok(command)
    }

    fn graft(
        state: &mut TreeState<C>,
        command: &Arc<Command<C>>,
        settings: &Settings,
    ) -> Result<(), InsertError<C>> {
        let flag_component = command.flag_component().cloned();
        let components = command.components();
        let flag_start = Self::flag_start_index(components, settings);

        let mut node = state.root;
        for (index, component) in components.iter().enumerate() {
            let child = match state.get_child(node, component) {
                Some(existing) => {
                    if component.component_type() == ComponentType::Literal {
                        if let Some(existing_component) = state.node_mut(existing).component.as_mut()
                        {
                            for alias in component.aliases() {
                                existing_component.insert_alias(alias);
                            }
                        }
                    }
                    existing
                }
                None => state.add_child(node, component.clone()),
            };
            state.sort_children(node);
            node = child;

            // The flag group becomes reachable behind every component from
            // the start index onward, as its own branch at each point.
            if let Some(flags) = &flag_component {
                if index >= flag_start {
                    node = state.add_child(node, flags.clone());
                }
            }
        }

        if let Some(component) = state.node_mut(node).component.as_mut() {
            if let Some(existing) = component.owning_command() {
                return Err(InsertError::DuplicateCommand {
                    component: component.clone(),
                    existing,
                });
            }
            component.set_owning_command(Arc::clone(command));
        }
        Ok(())
    }

    /// The component index at and after which the flag group is grafted.
    fn flag_start_index(components: &[CommandComponent<C>], settings: &Settings) -> usize {
        if settings.liberal_flag_parsing {
            if let Some(index) = components
                .iter()
                .rposition(|c| c.component_type() == ComponentType::Literal)
            {
                return index;
            }
        }
        components.len().saturating_sub(1)
    }

    fn verify_and_register(
        state: &mut TreeState<C>,
        settings: &Settings,
        hooks: &TreeHooks<C>,
    ) -> Result<(), InsertError<C>> {
        for child in state.node(state.root).children.clone() {
            if let Some(component) = &state.node(child).component {
                if component.component_type() != ComponentType::Literal {
                    return Err(InsertError::TopLevelVariable {
                        component: component.clone(),
                    });
                }
            }
        }

        Self::check_ambiguity(state, state.root)?;

        let leaves = state.leaves(state.root);
        for &leaf in &leaves {
            let Some(component) = &state.node(leaf).component else {
                continue;
            };
            match component.owning_command() {
                None => {
                    return Err(InsertError::NoCommandInLeaf {
                        component: component.clone(),
                    })
                }
                Some(owner) => hooks.registration.register(&owner),
            }
        }

        for leaf in leaves {
            Self::update_permission(state, leaf, settings);
        }
        debug!(leaves = state.leaves(state.root).len(), "tree verified");
        Ok(())
    }

    fn check_ambiguity(state: &TreeState<C>, node: NodeId) -> Result<(), InsertError<C>> {
        if state.is_leaf(node) {
            return Ok(());
        }

        let children = state.node(node).children.clone();
        let components: Vec<CommandComponent<C>> = children
            .iter()
            .filter_map(|&child| state.node(child).component.clone())
            .collect();
        let ambiguity = |child: &CommandComponent<C>| InsertError::AmbiguousNode {
            parent: state.node(node).component.clone(),
            child: child.clone(),
            siblings: components.clone(),
        };

        let variable: Vec<&CommandComponent<C>> = components
            .iter()
            .filter(|component| component.component_type() != ComponentType::Literal)
            .collect();
        if variable.len() > 1 {
            return Err(ambiguity(variable[0]));
        }

        let mut seen_aliases = HashSet::new();
        for component in &components {
            if component.component_type() != ComponentType::Literal {
                continue;
            }
            for alias in component.aliases() {
                if !seen_aliases.insert(alias.clone()) {
                    return Err(ambiguity(component));
                }
            }
        }

        for child in children {
            Self::check_ambiguity(state, child)?;
        }
        Ok(())
    }

    /// Recompute the cached permission along `leaf`'s ancestor chain.
    ///
    /// Ancestors accumulate a disjunction of the permissions of the
    /// commands below them; an ancestor that itself carries a command
    /// either joins its permission to the disjunction or, when
    /// `enforce_intermediary_permissions` is set, replaces it.
    fn update_permission(state: &mut TreeState<C>, leaf: NodeId, settings: &Settings) {
        let Some(command_permission) = state
            .node(leaf)
            .component
            .as_ref()
            .and_then(CommandComponent::owning_command)
            .map(|command| command.permission().clone())
        else {
            return;
        };
        state.node_mut(leaf).permission = Some(command_permission.clone());

        let mut current = state.node(leaf).parent;
        while let Some(node) = current {
            let mut permission = match state.node(node).permission.clone() {
                Some(existing) => Permission::any_of([command_permission.clone(), existing]),
                None => command_permission.clone(),
            };

            if let Some(owner) = state
                .node(node)
                .component
                .as_ref()
                .and_then(CommandComponent::owning_command)
            {
                permission = if settings.enforce_intermediary_permissions {
                    owner.permission().clone()
                } else {
                    Permission::any_of([permission, owner.permission().clone()])
                };
            }

            state.node_mut(node).permission = Some(permission);
            current = state.node(node).parent;
        }
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// The permission blocking `sender` at `node`, or `None` when the
    /// sender may proceed (possibly via any one child branch).
    fn find_missing_permission(&self, sender: &C, node: NodeId) -> Option<Permission> {
        let state = self.read();
        Self::missing_permission(&state, self.hooks.authority.as_ref(), sender, node)
    }

    fn missing_permission(
        state: &TreeState<C>,
        authority: &dyn PermissionAuthority<C>,
        sender: &C,
        node: NodeId,
    ) -> Option<Permission> {
        if let Some(permission) = state.node(node).permission.clone() {
            return if authority.has_permission(sender, &permission) {
                None
            } else {
                Some(permission)
            };
        }
        if state.is_leaf(node) {
            let owner = state
                .node(node)
                .component
                .as_ref()?
                .owning_command()?;
            let permission = owner.permission();
            return if authority.has_permission(sender, permission) {
                None
            } else {
                Some(permission.clone())
            };
        }
        // A sender with a clear path through any child may enter this node.
        let mut missing = Vec::new();
        for &child in &state.node(node).children {
            match Self::missing_permission(state, authority, sender, child) {
                None => return None,
                Some(permission) => missing.push(permission),
            }
        }
        Some(Permission::any_of(missing))
    }

    // ------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------

    /// Resolve `input` to a single command.
    ///
    /// Parsed argument values are stored in `ctx` under their component
    /// names; the returned command's handler has not been invoked.
    pub async fn parse(
        &self,
        ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> Result<Arc<Command<C>>, ParseError<C>> {
        trace!(input = input.remaining_input(), "resolving command input");
        let (root, tree_is_empty) = {
            let state = self.read();
            (
                state.root,
                state.is_leaf(state.root) && state.node(state.root).component.is_none(),
            )
        };
        if tree_is_empty {
            return Err(ParseError::NoSuchCommand {
                chain: Vec::new(),
                token: input.peek_string(),
            });
        }

        let resolved = self.parse_at(Vec::new(), ctx, input, root).await?;
        let Some(command) = resolved else {
            // A committed branch consumed nothing (a preprocessor denied
            // the only viable child); there is no command to return.
            return Err(self.invalid_syntax_for(&[], root));
        };

        if let Some(requirement) = command.sender_requirement() {
            if !requirement.accepts(ctx.sender()) {
                return Err(ParseError::InvalidCommandSender {
                    expected: requirement.kind().to_string(),
                    chain: command.components().to_vec(),
                });
            }
        }
        Ok(command)
    }

    fn parse_at<'a>(
        &'a self,
        mut acc: Vec<CommandComponent<C>>,
        ctx: &'a mut CommandContext<C>,
        input: &'a mut CommandInput,
        node: NodeId,
    ) -> BoxFuture<'a, Result<Option<Arc<Command<C>>>, ParseError<C>>> {
        Box::pin(async move {
            if let Some(missing) = self.find_missing_permission(ctx.sender(), node) {
                return Err(ParseError::NoPermission {
                    permission: missing,
                    chain: self.component_chain(node),
                });
            }

            match self
                .attempt_unambiguous_child(&mut acc, &mut *ctx, &mut *input, node)
                .await
            {
                FastPath::Settled(outcome) => return outcome,
                FastPath::NotApplicable => {}
            }

            let children = self.children_of(node);
            if children.is_empty() {
                let owner = self
                    .component_of(node)
                    .and_then(|component| component.owning_command());
                if owner.is_none() || !input.is_empty() {
                    return Err(self.invalid_syntax_for(&acc, node));
                }
                return Ok(owner);
            }

            // Speculative sibling scan: literals come first by child order;
            // a failure here only means "this branch didn't match".
            for child in children {
                let Some(component) = self.component_of(child) else {
                    continue;
                };
                let snapshot = input.cursor();
                let mut parsing = ParsingContext::new(component.name());
                parsing.mark_start();
                ctx.set_current_component(component.clone());

                let parser = component.parser();
                let result = parser.parse(&mut *ctx, &mut *input).await;

                parsing.mark_end();
                parsing.set_success(result.is_ok());
                parsing.set_consumed(input.consumed_since(snapshot));
                ctx.record_parsing(parsing);

                match result {
                    Ok(_) => {
                        acc.push(component);
                        return self.parse_at(acc, ctx, input, child).await;
                    }
                    Err(_) => {
                        trace!(component = component.name(), "branch rejected, rewinding");
                        input.set_cursor(snapshot);
                    }
                }
            }

            if self.is_root(node) {
                return Err(ParseError::NoSuchCommand {
                    chain: self.component_chain(node),
                    token: input.peek_string(),
                });
            }

            // No child matched; fall back to a command attached right here.
            if let Some(command) = self
                .component_of(node)
                .and_then(|component| component.owning_command())
            {
                if input.is_empty() {
                    if !self
                        .hooks
                        .authority
                        .has_permission(ctx.sender(), command.permission())
                    {
                        return Err(ParseError::NoPermission {
                            permission: command.permission().clone(),
                            chain: self.component_chain(node),
                        });
                    }
                    return Ok(Some(command));
                }
            }

            Err(self.invalid_syntax_for(&acc, node))
        })
    }

    /// Try the single variable child of `node`, committing to it when the
    /// next token cannot be a literal sibling.
    fn attempt_unambiguous_child<'a>(
        &'a self,
        acc: &'a mut Vec<CommandComponent<C>>,
        ctx: &'a mut CommandContext<C>,
        input: &'a mut CommandInput,
        node: NodeId,
    ) -> BoxFuture<'a, FastPath<C>> {
        Box::pin(async move {
            let children = self.children_of(node);
            if !input.is_empty() && self.matches_literal(&children, &input.peek_string()) {
                return FastPath::NotApplicable;
            }

            let variable: Vec<NodeId> = children
                .iter()
                .copied()
                .filter(|&child| {
                    self.component_of(child)
                        .is_some_and(|c| c.component_type() != ComponentType::Literal)
                })
                .collect();
            if variable.is_empty() {
                return FastPath::NotApplicable;
            }
            assert!(
                variable.len() == 1,
                "tree invariant violated: more than one variable child under a node"
            );
            let child = variable[0];

            if !input.is_empty() {
                if let Some(missing) = self.find_missing_permission(ctx.sender(), child) {
                    return FastPath::Settled(Err(ParseError::NoPermission {
                        permission: missing,
                        chain: self.component_chain(child),
                    }));
                }
            }

            let Some(child_component) = self.component_of(child) else {
                return FastPath::NotApplicable;
            };

            let mut argument_value: Option<ParsedValue> = None;

            // Flags are skipped here: an exhausted input still has to flow
            // past a flag node so defaults further down are honored.
            if input.is_empty() && child_component.component_type() != ComponentType::Flag {
                match child_component.default_value() {
                    Some(DefaultValue::Parsed(text)) => {
                        let text = text.clone();
                        input.append_string(&text);
                        return self.attempt_unambiguous_child(acc, ctx, input, node).await;
                    }
                    Some(DefaultValue::Constant(value)) => {
                        argument_value = Some(value.clone());
                    }
                    None if !child_component.is_required() => {
                        // Elided optional tail. The subtree below is a single
                        // linear chain (anything else would be ambiguous), so
                        // the first owning command down that chain is the one.
                        let owner = child_component
                            .owning_command()
                            .or_else(|| self.first_owner_below(child));
                        return FastPath::Settled(Ok(owner));
                    }
                    None if self.is_leaf(child) => {
                        // Required leaf argument with nothing to parse: only
                        // a command on the current node can still satisfy this.
                        let outcome = match self
                            .component_of(node)
                            .and_then(|component| component.owning_command())
                        {
                            None => {
                                let expected = child_component
                                    .owning_command()
                                    .map(|command| command.components().to_vec())
                                    .unwrap_or_default();
                                Err(self.invalid_syntax_for(&expected, child))
                            }
                            Some(command) => self.executable_here(ctx.sender(), command, node),
                        };
                        return FastPath::Settled(outcome);
                    }
                    None => {
                        // Required, not a leaf: an intermediary executor on
                        // the current node or nothing.
                        let outcome = match self
                            .component_of(node)
                            .and_then(|component| component.owning_command())
                        {
                            None => Err(self.invalid_syntax_for(acc, node)),
                            Some(command) => self.executable_here(ctx.sender(), command, node),
                        };
                        return FastPath::Settled(outcome);
                    }
                }
            }

            let value = match argument_value {
                Some(value) => value,
                None => {
                    match self
                        .parse_argument(&mut *ctx, child, &child_component, &mut *input)
                        .await
                    {
                        Ok(Some(value)) => value,
                        Ok(None) => return FastPath::Settled(Ok(None)),
                        Err(error) => return FastPath::Settled(Err(error)),
                    }
                }
            };

            ctx.store(child_component.name().to_string(), value);

            if self.is_leaf(child) {
                if input.is_empty() {
                    return FastPath::Settled(Ok(child_component.owning_command()));
                }
                return FastPath::Settled(Err(self.invalid_syntax_for(acc, child)));
            }

            acc.push(child_component);
            let outcome = self.parse_at(std::mem::take(acc), ctx, input, child).await;
            FastPath::Settled(outcome)
        })
    }

    /// Permission-gate execution of `command` found on `node` itself.
    fn executable_here(
        &self,
        sender: &C,
        command: Arc<Command<C>>,
        node: NodeId,
    ) -> Result<Option<Arc<Command<C>>>, ParseError<C>> {
        if self
            .hooks
            .authority
            .has_permission(sender, command.permission())
        {
            Ok(Some(command))
        } else {
            Err(ParseError::NoPermission {
                permission: command.permission().clone(),
                chain: self.component_chain(node),
            })
        }
    }

    /// Parse the argument of a committed branch. Unlike the sibling scan,
    /// a parser failure here is surfaced to the caller.
    async fn parse_argument(
        &self,
        ctx: &mut CommandContext<C>,
        node: NodeId,
        component: &CommandComponent<C>,
        input: &mut CommandInput,
    ) -> Result<Option<ParsedValue>, ParseError<C>> {
        let parser = component.parser();
        let mut parsing = ParsingContext::new(component.name());
        parsing.mark_start();

        match parser.preprocess(&mut *ctx, &mut *input) {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                parsing.mark_end();
                parsing.set_success(false);
                ctx.record_parsing(parsing);
                return Ok(None);
            }
        }

        ctx.set_current_component(component.clone());
        let snapshot = input.cursor();
        let result = parser.parse(&mut *ctx, &mut *input).await;

        parsing.set_consumed(input.consumed_since(snapshot));
        parsing.mark_end();
        parsing.set_success(result.is_ok());
        ctx.record_parsing(parsing);

        match result {
            Ok(value) => Ok(Some(value)),
            Err(failure) => {
                input.set_cursor(snapshot);
                Err(ParseError::ArgumentParse {
                    failure,
                    chain: self.component_chain(node),
                })
            }
        }
    }

    /// Whether `token` exactly matches an alias of any literal child.
    fn matches_literal(&self, children: &[NodeId], token: &str) -> bool {
        children.iter().any(|&child| {
            self.component_of(child).is_some_and(|component| {
                component.component_type() == ComponentType::Literal
                    && component.aliases().iter().any(|alias| alias == token)
            })
        })
    }

    /// The first owning command along the single-child chain below `node`.
    fn first_owner_below(&self, node: NodeId) -> Option<Arc<Command<C>>> {
        let state = self.read();
        let mut current = node;
        while !state.is_leaf(current) {
            current = state.node(current).children[0];
            if let Some(owner) = state
                .node(current)
                .component
                .as_ref()
                .and_then(CommandComponent::owning_command)
            {
                return Some(owner);
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Suggestions
    // ------------------------------------------------------------------

    /// Completion candidates for the token under the cursor.
    ///
    /// Every returned suggestion is a strict prefix-extension of the
    /// current token; exact matches are filtered out.
    pub async fn suggest(
        &self,
        ctx: CommandContext<C>,
        input: &mut CommandInput,
    ) -> IndexSet<Suggestion> {
        trace!(input = input.remaining_input(), "collecting suggestions");
        let mut sctx = SuggestionContext::new(ctx, Arc::clone(&self.hooks.processor));
        let root = self.read().root;
        self.suggest_at(&mut sctx, input, root).await;
        sctx.finish()
    }

    fn suggest_at<'a>(
        &'a self,
        sctx: &'a mut SuggestionContext<C>,
        input: &'a mut CommandInput,
        node: NodeId,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if self
                .find_missing_permission(sctx.context().sender(), node)
                .is_some()
            {
                return;
            }

            let children = self.children_of(node);
            let literals: Vec<NodeId> = children
                .iter()
                .copied()
                .filter(|&child| {
                    self.component_of(child)
                        .is_some_and(|c| c.component_type() == ComponentType::Literal)
                })
                .collect();
            let dynamic: Vec<NodeId> = children
                .iter()
                .copied()
                .filter(|&child| {
                    self.component_of(child)
                        .is_some_and(|c| c.component_type() != ComponentType::Literal)
                })
                .collect();

            // When a literal child parses exactly and input remains, the
            // suggestions live deeper in the tree.
            if !literals.is_empty() && !input.is_empty_ignoring_whitespace() {
                let snapshot = input.cursor();
                for &child in &literals {
                    let Some(component) = self.component_of(child) else {
                        continue;
                    };
                    sctx.context_mut().set_current_component(component.clone());
                    let parser = component.parser();
                    match parser.parse(sctx.context_mut(), &mut *input).await {
                        Err(_) => {
                            input.set_cursor(snapshot);
                        }
                        Ok(_) => {
                            if input.is_empty() {
                                // Matched exactly with nothing behind it.
                                break;
                            }
                            return self.suggest_at(sctx, input, child).await;
                        }
                    }
                }
                input.set_cursor(snapshot);
            }

            if input.remaining_tokens() <= 1 {
                let current = input.peek_string();
                for &child in &literals {
                    self.add_literal_suggestions(&mut *sctx, child, &current).await;
                }
            }

            for &child in &dynamic {
                self.add_dynamic_suggestions(&mut *sctx, &mut *input, child).await;
            }
        })
    }

    async fn add_literal_suggestions(
        &self,
        sctx: &mut SuggestionContext<C>,
        node: NodeId,
        current: &str,
    ) {
        if self
            .find_missing_permission(sctx.context().sender(), node)
            .is_some()
        {
            return;
        }
        let Some(component) = self.component_of(node) else {
            return;
        };
        self.add_component_suggestions(sctx, &component, current).await;
    }

    async fn add_dynamic_suggestions(
        &self,
        sctx: &mut SuggestionContext<C>,
        input: &mut CommandInput,
        child: NodeId,
    ) {
        let Some(component) = self.component_of(child) else {
            return;
        };
        let parser = component.parser();

        if let Some(aggregate) = parser.as_aggregate() {
            // Pre-consume everything but the last sub-component so the
            // suggestion handoff sees the token actually being typed.
            self.pop_required_arguments(sctx.context_mut(), input, aggregate)
                .await;
        } else if let Some(flag_parser) = parser.as_flag() {
            match flag_parser.parse_current_flag(sctx.context(), input) {
                Some(flag) => sctx
                    .context_mut()
                    .store(FLAG_META_KEY, Arc::new(flag) as ParsedValue),
                None => {
                    sctx.context_mut().remove(FLAG_META_KEY);
                }
            }
        } else if input.remaining_tokens() <= parser.requested_argument_count() {
            // Stash the leading tokens so contextual providers can see the
            // arguments already supplied to a multi-token parser.
            let mut index = 0;
            while index < parser.requested_argument_count().saturating_sub(1)
                && input.remaining_tokens() > 1
            {
                let token = input.read_string();
                sctx.context_mut().store(
                    format!("{}_{index}", component.name()),
                    Arc::new(token) as ParsedValue,
                );
                index += 1;
            }
        }

        if input.is_empty() {
            return;
        }
        if input.remaining_tokens() == 1 {
            let current = input.peek_string();
            return self.add_node_suggestions(sctx, child, &current).await;
        }
        if self.is_leaf(child) && parser.as_aggregate().is_some() {
            let last = input.last_remaining_token();
            return self.add_node_suggestions(sctx, child, &last).await;
        }

        let original = input.cursor();
        let original_tokens = input.remaining_tokens();
        let pre_ok = matches!(parser.preprocess(sctx.context_mut(), input), Ok(true));
        if pre_ok {
            sctx.context_mut().set_current_component(component.clone());
            let before_parse = input.cursor();
            match parser.parse(sctx.context_mut(), input).await {
                Err(_) => {
                    input.set_cursor(before_parse);
                    if original_tokens > 1 {
                        // A later component is being completed, not this one.
                        input.set_cursor(original);
                        return;
                    }
                }
                Ok(value) => {
                    if self.is_leaf(child) {
                        if !input.is_empty() {
                            return;
                        }
                        // A greedy parser swallowed the rest; suggest
                        // against the full remaining text instead.
                        input.set_cursor(original);
                        let remaining = input.remaining_input().trim_start().to_string();
                        return self.add_node_suggestions(sctx, child, &remaining).await;
                    }
                    if !input.is_empty() {
                        sctx.context_mut().store(component.name().to_string(), value);
                        return self.suggest_at(sctx, input, child).await;
                    }
                    // Parsed but consumed everything above a non-leaf: fall
                    // through to plain completion of this component.
                }
            }
        }

        input.set_cursor(original);
        if !pre_ok && input.remaining_tokens() > 1 {
            return;
        }
        let current = input.peek_string();
        self.add_node_suggestions(sctx, child, &current).await;
    }

    /// Pop tokens for all but the last sub-component of an aggregate,
    /// leaving at least one token for the suggestion handoff.
    async fn pop_required_arguments(
        &self,
        ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
        aggregate: &dyn AggregateParser<C>,
    ) {
        if input.remaining_tokens() > aggregate.requested_argument_count() {
            return;
        }
        let components = aggregate.components();
        if components.is_empty() {
            return;
        }
        for component in &components[..components.len() - 1] {
            if input.remaining_tokens() <= 1 {
                break;
            }
            let parser = component.parser();
            if let Ok(value) = parser.parse(&mut *ctx, &mut *input).await {
                ctx.store(component.name().to_string(), value);
            }
        }
    }

    /// Suggestions for the component at `node`, plus, behind a flag node
    /// whose flags are not currently being typed, the components that
    /// follow it.
    async fn add_node_suggestions(
        &self,
        sctx: &mut SuggestionContext<C>,
        node: NodeId,
        text: &str,
    ) {
        let Some(component) = self.component_of(node) else {
            return;
        };
        self.add_component_suggestions(sctx, &component, text).await;

        let follow_through_flag = component.component_type() == ComponentType::Flag
            && !self.children_of(node).is_empty()
            && !text.starts_with('-')
            && !sctx.context().contains(FLAG_META_KEY);
        if follow_through_flag {
            for child in self.children_of(node) {
                if let Some(child_component) = self.component_of(child) {
                    self.add_component_suggestions(sctx, &child_component, text).await;
                }
            }
        }
    }

    async fn add_component_suggestions(
        &self,
        sctx: &mut SuggestionContext<C>,
        component: &CommandComponent<C>,
        text: &str,
    ) {
        sctx.context_mut().set_current_component(component.clone());
        let provider = component.suggestion_provider();
        let provided = provider.suggestions(sctx.context(), text).await;
        sctx.add_all(
            provided
                .into_iter()
                .filter(|s| s.text() != text && s.text().starts_with(text)),
        );
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Remove `node` and everything below it, invoking `on_command` for
    /// each owning command encountered (children before parents).
    ///
    /// The callbacks run after the write lock has been released, so caller
    /// code never executes against a tree that is mid-mutation.
    pub fn delete_recursively(
        &self,
        node: NodeId,
        is_root: bool,
        on_command: &mut dyn FnMut(Arc<Command<C>>),
    ) {
        let mut removed = Vec::new();
        {
            let mut state = self.write();
            if !state.nodes.contains(node.0) {
                return;
            }
            let parent = if is_root {
                Some(state.root)
            } else {
                state.node(node).parent
            };
            Self::remove_subtree(&mut state, node, &mut removed);
            if let Some(parent) = parent {
                if state.nodes.contains(parent.0) {
                    state.remove_child(parent, node);
                }
            }
        }
        debug!(commands = removed.len(), "subtree deleted");
        for command in removed {
            on_command(command);
        }
    }

    fn remove_subtree(
        state: &mut TreeState<C>,
        node: NodeId,
        removed: &mut Vec<Arc<Command<C>>>,
    ) {
        for child in state.node(node).children.clone() {
            Self::remove_subtree(state, child, removed);
        }
        if let Some(owner) = state
            .node(node)
            .component
            .as_ref()
            .and_then(CommandComponent::owning_command)
        {
            removed.push(owner);
        }
        state.nodes.remove(node.0);
    }

    // ------------------------------------------------------------------
    // Shared read helpers (each takes its own short-lived lock)
    // ------------------------------------------------------------------

    fn component_of(&self, id: NodeId) -> Option<CommandComponent<C>> {
        self.read().nodes.get(id.0).and_then(|n| n.component.clone())
    }

    fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.read()
            .nodes
            .get(id.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn is_leaf(&self, id: NodeId) -> bool {
        self.children_of(id).is_empty()
    }

    fn is_root(&self, id: NodeId) -> bool {
        self.read().root == id
    }

    fn component_chain(&self, id: NodeId) -> Vec<CommandComponent<C>> {
        self.read().chain_components(id)
    }

    fn invalid_syntax_for(&self, parsed: &[CommandComponent<C>], node: NodeId) -> ParseError<C> {
        let (following, chain) = {
            let state = self.read();
            (state.following_components(node), state.chain_components(node))
        };
        ParseError::InvalidSyntax {
            syntax: self.hooks.formatter.format(parsed, &following),
            chain,
        }
    }
}
