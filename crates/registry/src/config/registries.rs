//! Composition root: builds the shared registries from a config.

use std::sync::Arc;

use forged_primitives::{Clock, SystemClock};

use super::RegistryConfig;
use crate::error::{Op, RegistryError, Result};
use crate::flat::FlatRegistry;
use crate::namespace::Namespace;
use crate::resolver::Resolver;

/// The process's registry handles.
///
/// Build one at startup and pass clones to collaborators; every clone
/// addresses the same namespace tree and flat tables.
#[derive(Debug, Clone)]
pub struct Registries<V> {
	pub namespace: Namespace<V>,
	pub flat: FlatRegistry<V>,
}

impl<V: Clone + Send + 'static> Registries<V> {
	/// Builds both registries on the system clock.
	pub fn from_config(config: &RegistryConfig) -> Result<Self> {
		Self::with_clock(config, Arc::new(SystemClock))
	}

	/// Builds both registries, stamping flat history with `clock`.
	///
	/// Aliases are applied before grants, so a grant may name an alias. An
	/// invalid path fails the whole build with [`RegistryError::Config`].
	pub fn with_clock(config: &RegistryConfig, clock: Arc<dyn Clock>) -> Result<Self> {
		let policy = config.namespace.conflict_policy;
		let namespace = Namespace::with_resolver(config.namespace.name.as_str(), Resolver::with_shared_policy(policy.build()));
		let flat = FlatRegistry::with_clock(clock);

		for warning in config.warnings() {
			tracing::warn!(%warning, "registry config");
		}

		for (index, entry) in config.aliases.iter().enumerate() {
			flat.set_alias(&entry.alias, &entry.target)
				.map_err(|error| invalid_entry("aliases", index, error))?;
		}
		for (index, grant) in config.grants.iter().enumerate() {
			flat.grant(&grant.path, &grant.role, grant.permissions.iter().copied())
				.map_err(|error| invalid_entry("grants", index, error))?;
		}

		tracing::info!(
			namespace = %config.namespace.name,
			policy = namespace.policy_name(),
			grants = config.grants.len(),
			aliases = config.aliases.len(),
			"registries configured",
		);
		Ok(Self { namespace, flat })
	}
}

fn invalid_entry(table: &str, index: usize, error: RegistryError) -> RegistryError {
	RegistryError::Config {
		op: Op::LoadConfig,
		reason: format!("{table}[{index}]: {error}"),
	}
}
