//! Dispatcher-wide settings recognized by the command tree.

use serde::{Deserialize, Serialize};

/// Settings that change how commands are grafted onto the tree and how
/// permissions aggregate along a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// When set, a command's flag group is reachable after every literal
    /// from the last one onward, instead of only at the very end of the
    /// command.
    pub liberal_flag_parsing: bool,
    /// When set, a mid-path node that carries its own executable command
    /// replaces the aggregated permission at that node instead of joining
    /// it as an alternative.
    pub enforce_intermediary_permissions: bool,
}
