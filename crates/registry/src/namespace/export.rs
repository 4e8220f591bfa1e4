//! Structural export and import.
//!
//! The export is a nested JSON object with exactly one outer key, the
//! namespace name. Each node is an object whose keys are child segments,
//! plus the reserved [`SYMBOL_KEY`] when a symbol lives there. Only a
//! symbol's name and tags are exported; values are not, so an import leaves
//! value-less placeholders that callers fill by registering again.

use forged_primitives::is_valid_segment;
use serde_json::{Map, Value, json};

use super::Namespace;
use crate::error::{RegistryError, Result};
use crate::node::NamespaceNode;
use crate::symbol::{Symbol, Tags};

/// Reserved key carrying a node's symbol metadata.
pub const SYMBOL_KEY: &str = "__symbol__";

impl<V: Clone + Send + 'static> Namespace<V> {
	/// Exports the full tree structure with symbol metadata.
	pub fn export(&self) -> Value {
		self.with_state(|state| {
			let mut outer = Map::new();
			outer.insert(state.name.clone(), node_to_value(&state.root));
			Value::Object(outer)
		})
	}

	/// Replaces this namespace's name and tree with an exported one.
	///
	/// The input is validated in full before anything changes; on error the
	/// namespace is left as it was. Pending loaders are kept and their nodes
	/// recreated if the imported tree lacks them, so paths they cover
	/// rehydrate on first resolve.
	pub fn import(&self, data: &Value) -> Result<()> {
		let (name, root) = parse_export(data)?;
		self.with_state(|state| {
			tracing::debug!(from = %state.name, to = %name, "namespace imported");
			state.name = name;
			state.root = root;
			state.restore_pending_nodes();
		});
		Ok(())
	}
}

fn node_to_value<V>(node: &NamespaceNode<V>) -> Value {
	let mut map = Map::new();
	if let Some(symbol) = node.symbol() {
		map.insert(SYMBOL_KEY.to_string(), json!({ "name": symbol.name(), "tags": symbol.tags() }));
	}
	for child in node.children() {
		map.insert(child.segment().to_string(), node_to_value(child));
	}
	Value::Object(map)
}

fn malformed(reason: impl Into<String>) -> RegistryError {
	RegistryError::MalformedExport { reason: reason.into() }
}

fn parse_export<V>(data: &Value) -> Result<(String, NamespaceNode<V>)> {
	let outer = data.as_object().ok_or_else(|| malformed("top level must be an object"))?;
	let mut entries = outer.iter();
	let (Some((name, body)), None) = (entries.next(), entries.next()) else {
		return Err(malformed(format!("expected exactly one namespace key, found {}", outer.len())));
	};

	let mut root = NamespaceNode::new(name.as_str());
	load_node(body, &mut root, name)?;
	Ok((name.clone(), root))
}

fn load_node<V>(body: &Value, node: &mut NamespaceNode<V>, at: &str) -> Result<()> {
	let map = body.as_object().ok_or_else(|| malformed(format!("{at}: expected an object")))?;
	for (key, value) in map {
		if key == SYMBOL_KEY {
			node.set_symbol(parse_symbol(value, at)?);
			continue;
		}
		if !is_valid_segment(key) {
			return Err(malformed(format!("{at}: invalid segment {key:?}")));
		}
		load_node(value, node.add_child(key), &format!("{at}.{key}"))?;
	}
	Ok(())
}

fn parse_symbol<V>(value: &Value, at: &str) -> Result<Symbol<V>> {
	let fields = value.as_object().ok_or_else(|| malformed(format!("{at}: {SYMBOL_KEY} must be an object")))?;

	let name = match fields.get("name") {
		None | Some(Value::Null) => None,
		Some(Value::String(name)) => Some(name.clone()),
		Some(_) => return Err(malformed(format!("{at}: symbol name must be a string or null"))),
	};
	let tags: Tags = match fields.get("tags") {
		None | Some(Value::Null) => Tags::new(),
		Some(Value::Object(tags)) => tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
		Some(_) => return Err(malformed(format!("{at}: symbol tags must be an object"))),
	};

	Ok(Symbol::detached(name, tags))
}
