//! Tree node keyed by one path segment.
//!
//! Nodes own their children outright; there are no parent links because all
//! traversal runs root to leaf. Children keep insertion order, which fixes
//! the order of pattern matches, listings, exports, and rendering.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::symbol::Symbol;

type Children<V> = IndexMap<String, NamespaceNode<V>, FxBuildHasher>;

/// One node of a namespace tree.
#[derive(Debug, Clone)]
pub struct NamespaceNode<V> {
	segment: String,
	symbol: Option<Symbol<V>>,
	children: Children<V>,
}

impl<V> NamespaceNode<V> {
	/// Creates an empty node.
	pub fn new(segment: impl Into<String>) -> Self {
		Self {
			segment: segment.into(),
			symbol: None,
			children: Children::default(),
		}
	}

	pub fn segment(&self) -> &str {
		&self.segment
	}

	pub fn symbol(&self) -> Option<&Symbol<V>> {
		self.symbol.as_ref()
	}

	/// Returns `true` if a live symbol (one holding a value) lives here.
	///
	/// Value-less placeholders left by an import do not count: registering
	/// over them is rehydration, not a conflict.
	pub fn is_occupied(&self) -> bool {
		self.symbol.as_ref().is_some_and(Symbol::has_value)
	}

	/// Installs `symbol`, returning whatever was there before.
	pub fn set_symbol(&mut self, symbol: Symbol<V>) -> Option<Symbol<V>> {
		self.symbol.replace(symbol)
	}

	/// Clears the symbol. The node and its subtree stay in place.
	pub fn take_symbol(&mut self) -> Option<Symbol<V>> {
		self.symbol.take()
	}

	/// Returns the child for `segment`, creating an empty one if absent.
	pub fn add_child(&mut self, segment: &str) -> &mut NamespaceNode<V> {
		self.children.entry(segment.to_string()).or_insert_with(|| NamespaceNode::new(segment))
	}

	pub fn has_child(&self, segment: &str) -> bool {
		self.children.contains_key(segment)
	}

	pub fn get_child(&self, segment: &str) -> Option<&NamespaceNode<V>> {
		self.children.get(segment)
	}

	pub fn get_child_mut(&mut self, segment: &str) -> Option<&mut NamespaceNode<V>> {
		self.children.get_mut(segment)
	}

	/// Children in insertion order.
	pub fn children(&self) -> impl ExactSizeIterator<Item = &NamespaceNode<V>> {
		self.children.values()
	}

	/// Visits every descendant depth-first in insertion order.
	///
	/// `f` receives each node with its dotted path, built by appending
	/// segments to `base` (pass `""` to get paths relative to this node).
	pub fn visit_descendants<F>(&self, base: &str, mut f: F)
	where
		F: FnMut(&str, &NamespaceNode<V>),
	{
		let mut prefix = base.to_string();
		for child in self.children.values() {
			child.visit_into(&mut prefix, &mut f);
		}
	}

	fn visit_into<F>(&self, prefix: &mut String, f: &mut F)
	where
		F: FnMut(&str, &NamespaceNode<V>),
	{
		let restore = prefix.len();
		if !prefix.is_empty() {
			prefix.push('.');
		}
		prefix.push_str(&self.segment);
		f(prefix.as_str(), self);
		for child in self.children.values() {
			child.visit_into(prefix, f);
		}
		prefix.truncate(restore);
	}

	/// Follows `segments` down from this node.
	pub fn walk<'a, I>(&self, segments: I) -> Option<&NamespaceNode<V>>
	where
		I: IntoIterator<Item = &'a str>,
	{
		segments.into_iter().try_fold(self, |node, segment| node.get_child(segment))
	}

	/// Mutable counterpart of [`Self::walk`].
	pub fn walk_mut<'a, I>(&mut self, segments: I) -> Option<&mut NamespaceNode<V>>
	where
		I: IntoIterator<Item = &'a str>,
	{
		segments.into_iter().try_fold(self, |node, segment| node.get_child_mut(segment))
	}
}
