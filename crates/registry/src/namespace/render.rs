//! Outline rendering of a namespace tree.
//!
//! ```text
//! globe
//!   services
//!     db * (postgres)
//!     cache ~
//! ```
//!
//! `*` marks a node holding a value, `~` a value-less placeholder; a symbol
//! name follows in parentheses.

use std::fmt;

use super::Namespace;
use crate::node::NamespaceNode;

impl<V> fmt::Display for Namespace<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let guard = self.inner.lock();
		let state = guard.borrow();
		writeln!(f, "{}", state.name)?;
		for child in state.root.children() {
			render_node(f, child, 1)?;
		}
		Ok(())
	}
}

fn render_node<V>(f: &mut fmt::Formatter<'_>, node: &NamespaceNode<V>, depth: usize) -> fmt::Result {
	write!(f, "{:indent$}{}", "", node.segment(), indent = depth * 2)?;
	if let Some(symbol) = node.symbol() {
		f.write_str(if symbol.has_value() { " *" } else { " ~" })?;
		if let Some(name) = symbol.name() {
			write!(f, " ({name})")?;
		}
	}
	writeln!(f)?;
	for child in node.children() {
		render_node(f, child, depth + 1)?;
	}
	Ok(())
}
