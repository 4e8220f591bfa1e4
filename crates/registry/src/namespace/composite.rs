//! Ordered, read-only view over several namespaces.

use forged_primitives::NsPath;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use super::Namespace;
use crate::error::{Op, RegistryError, Result, parse_path};

/// Resolves paths against member namespaces in order; the first member
/// holding a value wins.
///
/// Members are shared handles, so the view always sees their current
/// contents. The view itself never writes.
pub struct CompositeNamespace<V> {
	name: String,
	members: Vec<Namespace<V>>,
}

impl<V: Clone + Send + 'static> CompositeNamespace<V> {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			members: Vec::new(),
		}
	}

	/// Appends a member at the lowest precedence.
	pub fn with(mut self, member: Namespace<V>) -> Self {
		self.members.push(member);
		self
	}

	pub fn push(&mut self, member: Namespace<V>) {
		self.members.push(member);
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn members(&self) -> &[Namespace<V>] {
		&self.members
	}

	/// Resolves `path` against each member in turn.
	///
	/// Members where the path is missing or empty are skipped. Fails with
	/// [`RegistryError::PathNotFound`] only if no member has the path at all;
	/// any other member error is returned as is.
	pub fn resolve(&self, path: &str) -> Result<Option<V>> {
		let parsed = parse_path(Op::Resolve, path)?;
		let mut seen = false;
		for member in &self.members {
			match member.resolve(path) {
				Ok(Some(value)) => return Ok(Some(value)),
				Ok(None) => seen = true,
				Err(RegistryError::PathNotFound { .. }) => {}
				Err(other) => return Err(other),
			}
		}
		if seen { Ok(None) } else { Err(RegistryError::not_found(Op::Resolve, &parsed)) }
	}

	/// Pattern matches across all members, keeping the first member's value
	/// for paths present in several.
	pub fn resolve_pattern(&self, pattern: &str) -> Vec<(NsPath, V)> {
		let mut merged: IndexMap<NsPath, V, FxBuildHasher> = IndexMap::default();
		for member in &self.members {
			for (path, value) in member.resolve_pattern(pattern) {
				merged.entry(path).or_insert(value);
			}
		}
		merged.into_iter().collect()
	}
}
