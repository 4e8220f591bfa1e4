//! Registry error taxonomy.

use std::fmt;

use forged_primitives::{NsPath, PathError};

use crate::flat::Permission;

/// Public operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
	Register,
	RegisterLazy,
	Resolve,
	Unregister,
	List,
	Import,
	Set,
	Get,
	Delete,
	Rollback,
	GetVersions,
	GetMetadata,
	ListKeys,
	SetAlias,
	SetPermission,
	RevokePermission,
	CheckPermission,
	GetPermissions,
	LoadConfig,
}

impl Op {
	/// Operation name as it appears in messages and log fields.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Register => "register",
			Self::RegisterLazy => "register_lazy",
			Self::Resolve => "resolve",
			Self::Unregister => "unregister",
			Self::List => "list",
			Self::Import => "import",
			Self::Set => "set",
			Self::Get => "get",
			Self::Delete => "delete",
			Self::Rollback => "rollback",
			Self::GetVersions => "get_versions",
			Self::GetMetadata => "get_metadata",
			Self::ListKeys => "list_keys",
			Self::SetAlias => "set_alias",
			Self::SetPermission => "set_permission",
			Self::RevokePermission => "revoke_permission",
			Self::CheckPermission => "check_permission",
			Self::GetPermissions => "get_permissions",
			Self::LoadConfig => "load_config",
		}
	}
}

impl fmt::Display for Op {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Errors raised by the namespace tree and the flat registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
	/// A segment along the path does not exist.
	#[error("{op}: path not found: {path}")]
	PathNotFound { op: Op, path: String },

	/// The path failed format validation.
	#[error("{op}: {source}")]
	PathFormatInvalid {
		op: Op,
		#[source]
		source: PathError,
	},

	/// The role holds no matching permission token for the path.
	#[error("{op}: role {role:?} lacks {permission} permission on {path}")]
	PermissionDenied {
		op: Op,
		path: String,
		role: String,
		permission: Permission,
	},

	/// Registration targeted an occupied path under a policy that rejects overwrites.
	#[error("{op}: conflict at {path}: path is already occupied (policy {policy})")]
	ConflictDetected { op: Op, path: String, policy: &'static str },

	/// A deferred loader failed. The loader stays registered and may be retried.
	#[error("{op}: lazy load failed for {path}")]
	LazyLoadFailed {
		op: Op,
		path: String,
		#[source]
		source: anyhow::Error,
	},

	/// A flat write would pass through or replace an incompatible slot.
	#[error("{op}: structural conflict at {path}: {at} {reason}")]
	StructuralConflict {
		op: Op,
		path: String,
		at: String,
		reason: &'static str,
	},

	/// An imported tree does not have the export shape.
	#[error("import: malformed export: {reason}")]
	MalformedExport { reason: String },

	/// Configuration could not be read, parsed, or applied.
	#[error("{op}: {reason}")]
	Config { op: Op, reason: String },
}

impl RegistryError {
	/// Operation that raised the error, where one applies.
	pub fn op(&self) -> Op {
		match self {
			Self::PathNotFound { op, .. }
			| Self::PathFormatInvalid { op, .. }
			| Self::PermissionDenied { op, .. }
			| Self::ConflictDetected { op, .. }
			| Self::LazyLoadFailed { op, .. }
			| Self::StructuralConflict { op, .. }
			| Self::Config { op, .. } => *op,
			Self::MalformedExport { .. } => Op::Import,
		}
	}

	pub(crate) fn not_found(op: Op, path: &NsPath) -> Self {
		Self::PathNotFound { op, path: path.to_string() }
	}
}

/// Result alias for registry operations.
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

/// Parses `raw` as a path, tagging failures with `op`.
pub(crate) fn parse_path(op: Op, raw: &str) -> Result<NsPath> {
	NsPath::parse(raw).map_err(|source| RegistryError::PathFormatInvalid { op, source })
}
