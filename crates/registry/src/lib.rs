//! Path-addressed registries.
//!
//! Two registries share the dotted path syntax from `forged-primitives`:
//!
//! - [`Namespace`] - a tree of [`Symbol`]s with conflict policies, lazy
//!   loaders, glob queries and structural export/import
//! - [`FlatRegistry`] - a string-keyed store with version history, expiry,
//!   role permissions and aliases
//!
//! Both are cheap-clone handles guarded by one re-entrant lock per instance.
//! [`Registries`] builds one of each from a [`RegistryConfig`] at startup.

#[cfg(feature = "config")]
pub mod config;
pub mod error;
pub mod flat;
pub mod namespace;
pub mod node;
pub mod resolver;
pub mod symbol;

#[cfg(test)]
mod tests;

#[cfg(feature = "config")]
pub use config::{RegistryConfig, Registries};
pub use error::{Op, RegistryError, Result};
pub use flat::{FlatRegistry, Metadata, Permission, SetOptions, Version};
pub use forged_primitives::{Clock, Glob, ManualClock, NsPath, SystemClock, Timestamp};
pub use namespace::{CompositeNamespace, Namespace};
pub use node::NamespaceNode;
pub use resolver::{Collision, ConflictPolicy, ConflictPolicyKind, FirstWins, InsertAction, LastWins, LazyLoader, Resolution, Resolver, Strict};
pub use symbol::{Symbol, Tags};
