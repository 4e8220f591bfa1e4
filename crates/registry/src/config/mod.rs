//! TOML configuration for the registries.
//!
//! ```toml
//! [namespace]
//! name = "globe"
//! conflict-policy = "strict"
//!
//! [[grants]]
//! path = "services.db"
//! role = "admin"
//! permissions = ["read", "write"]
//!
//! [[aliases]]
//! alias = "db"
//! target = "services.db"
//! ```
//!
//! Every table is optional. Paths are validated when the config is applied
//! by [`Registries::from_config`].

use serde::Deserialize;

use crate::error::{Op, RegistryError, Result};
use crate::flat::Permission;
use crate::resolver::ConflictPolicyKind;

mod load;
mod registries;

pub use load::load;
pub use registries::Registries;

/// Root of a registry config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegistryConfig {
	pub namespace: NamespaceConfig,
	pub grants: Vec<GrantConfig>,
	pub aliases: Vec<AliasConfig>,
}

/// `[namespace]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct NamespaceConfig {
	/// Name of the tree namespace, used as the outer key of its export.
	pub name: String,
	pub conflict_policy: ConflictPolicyKind,
}

impl Default for NamespaceConfig {
	fn default() -> Self {
		Self {
			name: "root".to_string(),
			conflict_policy: ConflictPolicyKind::default(),
		}
	}
}

/// One `[[grants]]` entry: tokens for a role on a flat registry path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GrantConfig {
	pub path: String,
	pub role: String,
	#[serde(default)]
	pub permissions: Vec<Permission>,
}

/// One `[[aliases]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AliasConfig {
	pub alias: String,
	pub target: String,
}

/// Non-fatal issue found in an otherwise valid config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
	/// A grant lists no permissions and has no effect.
	EmptyGrant { path: String, role: String },
	/// A later `[[aliases]]` entry overrides an earlier one.
	AliasRedefined { alias: String, previous: String, target: String },
}

impl std::fmt::Display for ConfigWarning {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::EmptyGrant { path, role } => write!(f, "grant for role '{role}' on '{path}' lists no permissions"),
			Self::AliasRedefined { alias, previous, target } => {
				write!(f, "alias '{alias}' redefined: '{previous}' replaced by '{target}'")
			}
		}
	}
}

impl RegistryConfig {
	/// Parses a config from TOML text.
	pub fn from_toml_str(content: &str) -> Result<Self> {
		toml::from_str(content).map_err(|error| RegistryError::Config {
			op: Op::LoadConfig,
			reason: error.to_string(),
		})
	}

	/// Entries that parse and apply but probably do not do what was meant.
	pub fn warnings(&self) -> Vec<ConfigWarning> {
		let mut warnings: Vec<_> = self
			.grants
			.iter()
			.filter(|grant| grant.permissions.is_empty())
			.map(|grant| ConfigWarning::EmptyGrant {
				path: grant.path.clone(),
				role: grant.role.clone(),
			})
			.collect();

		for (index, entry) in self.aliases.iter().enumerate() {
			if let Some(earlier) = self.aliases[..index].iter().rev().find(|earlier| earlier.alias == entry.alias) {
				warnings.push(ConfigWarning::AliasRedefined {
					alias: entry.alias.clone(),
					previous: earlier.target.clone(),
					target: entry.target.clone(),
				});
			}
		}
		warnings
	}
}
