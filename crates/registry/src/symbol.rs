//! Stored unit of the namespace tree.

use std::collections::BTreeMap;

use serde_json::Value;

/// Free-form tag metadata attached to a [`Symbol`].
pub type Tags = BTreeMap<String, Value>;

/// A value plus its identity metadata.
///
/// Symbols are replaced wholesale on re-registration and never mutated in
/// place by the registry. A symbol imported from an export carries only its
/// name and tags until a value is registered or lazily loaded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol<V> {
	value: Option<V>,
	name: Option<String>,
	tags: Tags,
}

impl<V> Symbol<V> {
	/// Wraps a value with no name or tags.
	pub fn new(value: V) -> Self {
		Self {
			value: Some(value),
			name: None,
			tags: Tags::new(),
		}
	}

	/// A value-less symbol carrying only identity metadata.
	pub fn detached(name: Option<String>, tags: Tags) -> Self {
		Self { value: None, name, tags }
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.tags.insert(key.into(), value.into());
		self
	}

	pub fn value(&self) -> Option<&V> {
		self.value.as_ref()
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn tags(&self) -> &Tags {
		&self.tags
	}

	/// Returns `true` if the symbol holds a value (not just metadata).
	pub fn has_value(&self) -> bool {
		self.value.is_some()
	}

	pub fn into_value(self) -> Option<V> {
		self.value
	}

	/// Returns a copy of this symbol's metadata around `value`.
	pub(crate) fn rehydrate(&self, value: V) -> Self {
		Self {
			value: Some(value),
			name: self.name.clone(),
			tags: self.tags.clone(),
		}
	}
}

impl<V> From<V> for Symbol<V> {
	fn from(value: V) -> Self {
		Self::new(value)
	}
}
