//! Permission expressions and the authority that evaluates them.
//!
//! A [`Permission`] is a small boolean expression tree over atomic
//! permission strings. The dispatcher aggregates permissions up the command
//! tree as disjunctions, so a sender may proceed through a shared prefix if
//! any command below it is available to them. The yes/no decision for a
//! `(sender, permission)` pair is delegated to a [`PermissionAuthority`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A permission requirement attached to a command or a tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Permission {
    /// No requirement; every sender passes.
    None,
    /// A single atomic permission string (e.g. `"fleet.restart"`).
    Node(String),
    /// Satisfied when any constituent is satisfied.
    AnyOf(Vec<Permission>),
    /// Satisfied only when every constituent is satisfied.
    AllOf(Vec<Permission>),
}

impl Permission {
    /// An atomic permission node.
    pub fn of(node: impl Into<String>) -> Self {
        Permission::Node(node.into())
    }

    /// A disjunction of permissions.
    ///
    /// Nested `AnyOf` children are flattened, duplicates are dropped, and
    /// degenerate shapes collapse (`any_of([])` is `None`, `any_of([p])`
    /// is `p`). The presence of `None` makes the whole expression pass.
    pub fn any_of(permissions: impl IntoIterator<Item = Permission>) -> Self {
        let flattened = flatten(permissions, |p| match p {
            Permission::AnyOf(inner) => Some(inner),
            _ => None,
        });
        if flattened.iter().any(|p| matches!(p, Permission::None)) {
            return Permission::None;
        }
        collapse(flattened, Permission::AnyOf)
    }

    /// A conjunction of permissions.
    ///
    /// Nested `AllOf` children are flattened and `None` members are
    /// dropped, since they never constrain the result.
    pub fn all_of(permissions: impl IntoIterator<Item = Permission>) -> Self {
        let mut flattened = flatten(permissions, |p| match p {
            Permission::AllOf(inner) => Some(inner),
            _ => None,
        });
        flattened.retain(|p| !matches!(p, Permission::None));
        collapse(flattened, Permission::AllOf)
    }

    /// Evaluate this expression against an oracle for atomic nodes.
    pub fn is_satisfied(&self, check: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Permission::None => true,
            Permission::Node(node) => check(node),
            Permission::AnyOf(inner) => inner.iter().any(|p| p.is_satisfied(check)),
            Permission::AllOf(inner) => inner.iter().all(|p| p.is_satisfied(check)),
        }
    }
}

/// Flatten one level of same-variant nesting and drop duplicates.
fn flatten(
    permissions: impl IntoIterator<Item = Permission>,
    unwrap: impl Fn(Permission) -> Option<Vec<Permission>> + Copy,
) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for permission in permissions {
        let mut push = |p: Permission| {
            if !out.contains(&p) {
                out.push(p);
            }
        };
        match unwrap(permission.clone()) {
            Some(inner) => inner.into_iter().for_each(&mut push),
            None => push(permission),
        }
    }
    out
}

fn collapse(
    mut permissions: Vec<Permission>,
    wrap: impl FnOnce(Vec<Permission>) -> Permission,
) -> Permission {
    match permissions.len() {
        0 => Permission::None,
        1 => permissions.remove(0),
        _ => wrap(permissions),
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::None => write!(f, "(none)"),
            Permission::Node(node) => write!(f, "{node}"),
            Permission::AnyOf(inner) => write_joined(f, inner, "|"),
            Permission::AllOf(inner) => write_joined(f, inner, "&"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, inner: &[Permission], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, p) in inner.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{p}")?;
    }
    write!(f, ")")
}

/// The injected yes/no evaluator for `(sender, permission)` pairs.
pub trait PermissionAuthority<C>: Send + Sync {
    /// Whether `sender` satisfies `permission`.
    fn has_permission(&self, sender: &C, permission: &Permission) -> bool;
}

/// An authority that grants everything. Useful for hosts without a
/// permission concept and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardAuthority;

impl<C> PermissionAuthority<C> for WildcardAuthority {
    fn has_permission(&self, _sender: &C, _permission: &Permission) -> bool {
        true
    }
}

/// An authority backed by a closure over atomic permission nodes.
///
/// Compound expressions are evaluated structurally via
/// [`Permission::is_satisfied`]; the closure only ever sees `Node` strings.
pub struct FnAuthority<C> {
    check: Box<dyn Fn(&C, &str) -> bool + Send + Sync>,
}

impl<C> FnAuthority<C> {
    pub fn new(check: impl Fn(&C, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            check: Box::new(check),
        }
    }
}

impl<C: Send + Sync> PermissionAuthority<C> for FnAuthority<C> {
    fn has_permission(&self, sender: &C, permission: &Permission) -> bool {
        permission.is_satisfied(&|node| (self.check)(sender, node))
    }
}
