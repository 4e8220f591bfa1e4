//! Nested value storage behind [`FlatRegistry`](super::FlatRegistry).
//!
//! Each dotted path addresses a chain of branches ending in a leaf. A leaf
//! never has children, so a write that would pass through a leaf, or bury a
//! populated branch, is refused instead of silently dropping data.

use forged_primitives::NsPath;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::error::{Op, RegistryError, Result};

type Branch<V> = IndexMap<String, Slot<V>, FxBuildHasher>;

#[derive(Debug)]
pub(crate) enum Slot<V> {
	Branch(Branch<V>),
	Leaf(V),
}

#[derive(Debug)]
pub(crate) struct Store<V> {
	root: Branch<V>,
}

impl<V> Default for Store<V> {
	fn default() -> Self {
		Self { root: Branch::default() }
	}
}

impl<V> Store<V> {
	/// Stores `value` at `path`, returning the leaf it replaced.
	///
	/// Missing branches are created. Nothing changes if the write is refused.
	pub(crate) fn insert(&mut self, op: Op, path: &NsPath, value: V) -> Result<Option<V>> {
		self.check_insert(op, path)?;

		let mut branch = &mut self.root;
		let mut walked = String::new();
		let mut segments = path.segments();
		let leaf = segments.next_back().unwrap_or_default();
		for segment in segments {
			extend(&mut walked, segment);
			branch = match branch.entry(segment.to_string()).or_insert_with(|| Slot::Branch(Branch::default())) {
				Slot::Branch(next) => next,
				Slot::Leaf(_) => return Err(through_leaf(op, path, &walked)),
			};
		}

		match branch.insert(leaf.to_string(), Slot::Leaf(value)) {
			Some(Slot::Leaf(previous)) => Ok(Some(previous)),
			_ => Ok(None),
		}
	}

	fn check_insert(&self, op: Op, path: &NsPath) -> Result<()> {
		let mut branch = &self.root;
		let mut walked = String::new();
		for segment in path.segments() {
			extend(&mut walked, segment);
			match branch.get(segment) {
				None => return Ok(()),
				Some(Slot::Branch(next)) if walked.len() == path.as_str().len() => {
					return if next.is_empty() {
						Ok(())
					} else {
						Err(RegistryError::StructuralConflict {
							op,
							path: path.to_string(),
							at: walked,
							reason: "has children",
						})
					};
				}
				Some(Slot::Branch(next)) => branch = next,
				Some(Slot::Leaf(_)) if walked.len() == path.as_str().len() => return Ok(()),
				Some(Slot::Leaf(_)) => return Err(through_leaf(op, path, &walked)),
			}
		}
		Ok(())
	}

	/// Leaf value at `path`. Branches and paths running through a leaf have none.
	pub(crate) fn get(&self, path: &NsPath) -> Option<&V> {
		match self.slot(path)? {
			Slot::Leaf(value) => Some(value),
			Slot::Branch(_) => None,
		}
	}

	/// Removes the leaf at `path`. Branches are left alone, and emptied
	/// ancestors are not pruned.
	pub(crate) fn remove(&mut self, path: &NsPath) -> Option<V> {
		let mut segments = path.segments();
		let leaf = segments.next_back()?;
		let mut branch = &mut self.root;
		for segment in segments {
			branch = match branch.get_mut(segment)? {
				Slot::Branch(next) => next,
				Slot::Leaf(_) => return None,
			};
		}
		if !matches!(branch.get(leaf), Some(Slot::Leaf(_))) {
			return None;
		}
		match branch.shift_remove(leaf)? {
			Slot::Leaf(value) => Some(value),
			Slot::Branch(_) => None,
		}
	}

	/// Immediate child keys of `path`, or the top-level keys for `None`.
	pub(crate) fn keys(&self, path: Option<&NsPath>) -> Vec<String> {
		let branch = match path {
			None => &self.root,
			Some(path) => match self.slot(path) {
				Some(Slot::Branch(branch)) => branch,
				_ => return Vec::new(),
			},
		};
		branch.keys().cloned().collect()
	}

	/// Every leaf with its dotted path, depth-first in insertion order.
	pub(crate) fn leaves(&self) -> Vec<(NsPath, &V)> {
		let mut out = Vec::new();
		let mut prefix = String::new();
		collect_leaves(&self.root, &mut prefix, &mut out);
		out
	}

	fn slot(&self, path: &NsPath) -> Option<&Slot<V>> {
		let mut segments = path.segments();
		let first = self.root.get(segments.next()?)?;
		segments.try_fold(first, |slot, segment| match slot {
			Slot::Branch(branch) => branch.get(segment),
			Slot::Leaf(_) => None,
		})
	}
}

fn collect_leaves<'a, V>(branch: &'a Branch<V>, prefix: &mut String, out: &mut Vec<(NsPath, &'a V)>) {
	for (key, slot) in branch {
		let restore = prefix.len();
		extend(prefix, key);
		match slot {
			Slot::Leaf(value) => {
				if let Ok(path) = NsPath::parse(prefix.as_str()) {
					out.push((path, value));
				}
			}
			Slot::Branch(next) => collect_leaves(next, prefix, out),
		}
		prefix.truncate(restore);
	}
}

fn extend(walked: &mut String, segment: &str) {
	if !walked.is_empty() {
		walked.push('.');
	}
	walked.push_str(segment);
}

fn through_leaf(op: Op, path: &NsPath, at: &str) -> RegistryError {
	RegistryError::StructuralConflict {
		op,
		path: path.to_string(),
		at: at.to_string(),
		reason: "holds a value",
	}
}
