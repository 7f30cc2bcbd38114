//! Core types shared across the Bosun command dispatch crates.
//!
//! Defines permissions, suggestions, and dispatcher settings used by the
//! command tree, the bundled parsers, and host integrations.

pub mod permission;
pub mod settings;
pub mod suggestion;

pub use permission::{FnAuthority, Permission, PermissionAuthority, WildcardAuthority};
pub use settings::Settings;
pub use suggestion::{
    PassthroughProcessor, SortingProcessor, Suggestion, SuggestionProcessor,
};
