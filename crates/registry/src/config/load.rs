//! Config file loading.

use std::path::Path;

use super::RegistryConfig;
use crate::error::{Op, RegistryError, Result};

/// Reads and parses the config file at `path`.
///
/// Read and parse failures both surface as [`RegistryError::Config`] naming
/// the file.
pub fn load(path: &Path) -> Result<RegistryConfig> {
	let content = std::fs::read_to_string(path).map_err(|error| RegistryError::Config {
		op: Op::LoadConfig,
		reason: format!("{}: {error}", path.display()),
	})?;

	let config = RegistryConfig::from_toml_str(&content).map_err(|error| match error {
		RegistryError::Config { op, reason } => RegistryError::Config {
			op,
			reason: format!("{}: {reason}", path.display()),
		},
		other => other,
	})?;

	tracing::debug!(path = %path.display(), grants = config.grants.len(), aliases = config.aliases.len(), "config loaded");
	Ok(config)
}
