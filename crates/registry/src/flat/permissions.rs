//! Role-based permission tokens keyed by path.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use forged_primitives::NsPath;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A permission token a role may hold on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
	Read,
	Write,
}

impl Permission {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Read => "read",
			Self::Write => "write",
		}
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission {0:?} (expected \"read\" or \"write\")")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
	type Err = UnknownPermission;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"read" => Ok(Self::Read),
			"write" => Ok(Self::Write),
			other => Err(UnknownPermission(other.to_string())),
		}
	}
}

/// Tokens each role holds on one path.
pub type RolePermissions = BTreeMap<String, BTreeSet<Permission>>;

/// Grants for every path. A role absent from a path's entry holds nothing.
#[derive(Debug, Default)]
pub(crate) struct PermissionTable {
	grants: FxHashMap<NsPath, RolePermissions>,
}

impl PermissionTable {
	pub(crate) fn grant(&mut self, path: &NsPath, role: &str, permission: Permission) {
		self.grants
			.entry(path.clone())
			.or_default()
			.entry(role.to_string())
			.or_default()
			.insert(permission);
	}

	/// Removes one token. The role entry goes with its last token, and the
	/// path entry with its last role.
	pub(crate) fn revoke(&mut self, path: &NsPath, role: &str, permission: Permission) -> bool {
		let Some(roles) = self.grants.get_mut(path) else {
			return false;
		};
		let Some(tokens) = roles.get_mut(role) else {
			return false;
		};
		let removed = tokens.remove(&permission);
		if tokens.is_empty() {
			roles.remove(role);
		}
		if roles.is_empty() {
			self.grants.remove(path);
		}
		removed
	}

	pub(crate) fn allows(&self, path: &NsPath, role: &str, permission: Permission) -> bool {
		self.grants
			.get(path)
			.and_then(|roles| roles.get(role))
			.is_some_and(|tokens| tokens.contains(&permission))
	}

	pub(crate) fn roles(&self, path: &NsPath) -> RolePermissions {
		self.grants.get(path).cloned().unwrap_or_default()
	}

	pub(crate) fn clear(&mut self, path: &NsPath) -> bool {
		self.grants.remove(path).is_some()
	}
}
