//! Path-oriented API over a [`NamespaceNode`] tree.
//!
//! A [`Namespace`] is a cheap-clone handle; clones address the same tree.
//! Every public call runs start to finish under one re-entrant lock, so
//! concurrent callers see a total order of mutations. Lazy loaders and
//! conflict policies run with the lock held but the tree unborrowed, so they
//! may call back into the same namespace.

use std::cell::RefCell;
use std::sync::Arc;

use forged_primitives::NsPath;
use parking_lot::ReentrantMutex;

use crate::error::{Op, RegistryError, Result, parse_path};
use crate::node::NamespaceNode;
use crate::resolver::{Collision, Conflict, ConflictPolicy, InsertAction, LazyLoader, Resolution, Resolver, run_loader};
use crate::symbol::Symbol;

mod composite;
mod export;
mod render;


pub use composite::CompositeNamespace;
pub use export::SYMBOL_KEY;

struct NamespaceState<V> {
	name: String,
	root: NamespaceNode<V>,
	resolver: Resolver<V>,
}

impl<V> NamespaceState<V> {
	/// Walks to `path`, creating any missing nodes.
	fn ensure(&mut self, path: &NsPath) -> &mut NamespaceNode<V> {
		path.segments().fold(&mut self.root, |node, segment| node.add_child(segment))
	}

	/// Recreates the nodes of pending loaders that the tree no longer holds.
	fn restore_pending_nodes(&mut self) {
		let pending: Vec<NsPath> = self.resolver.pending_paths().cloned().collect();
		for path in &pending {
			self.ensure(path);
		}
	}
}

type StateCell<V> = RefCell<NamespaceState<V>>;

/// Clears the in-flight mark for a lazy load when dropped, including on
/// unwind, so a panicking loader leaves its path retryable.
struct Loading<'a, V> {
	state: &'a StateCell<V>,
	path: &'a NsPath,
}

impl<V> Drop for Loading<'_, V> {
	fn drop(&mut self) {
		if let Ok(mut state) = self.state.try_borrow_mut() {
			state.resolver.end_lazy(self.path);
		}
	}
}

/// Runs the conflict check for a registration at `path`.
///
/// The policy decides with the tree unborrowed, so it may read the same
/// namespace. Returns `None` when the policy keeps the existing symbol.
fn admit<V: Clone>(cell: &StateCell<V>, op: Op, path: &NsPath, incoming: Option<&Symbol<V>>) -> Result<Option<InsertAction>> {
	let (existing, policy) = {
		let state = cell.borrow();
		let existing = state.root.walk(path.segments()).and_then(NamespaceNode::symbol).filter(|symbol| symbol.has_value()).cloned();
		let Some(existing) = existing else {
			return Ok(Some(InsertAction::InsertedNew));
		};
		(existing, state.resolver.shared_policy())
	};

	let resolution = policy.decide(&Conflict {
		path,
		existing: &existing,
		incoming,
	});

	match cell.borrow_mut().resolver.record_conflict(op, path, &existing, incoming, resolution)? {
		Resolution::KeepExisting => Ok(None),
		_ => Ok(Some(InsertAction::ReplacedExisting)),
	}
}

/// A named, lockable namespace tree.
pub struct Namespace<V> {
	inner: Arc<ReentrantMutex<StateCell<V>>>,
}

impl<V> Clone for Namespace<V> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<V> std::fmt::Debug for Namespace<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let guard = self.inner.lock();
		let state = guard.borrow();
		f.debug_struct("Namespace").field("name", &state.name).field("resolver", &state.resolver).finish()
	}
}

impl<V: Clone + Send + 'static> Namespace<V> {
	/// Creates an empty namespace with the default conflict policy.
	pub fn new(name: impl Into<String>) -> Self {
		Self::with_resolver(name, Resolver::new())
	}

	pub fn with_policy(name: impl Into<String>, policy: impl ConflictPolicy<V> + 'static) -> Self {
		Self::with_resolver(name, Resolver::with_policy(policy))
	}

	pub fn with_resolver(name: impl Into<String>, resolver: Resolver<V>) -> Self {
		let name = name.into();
		let state = NamespaceState {
			root: NamespaceNode::new(name.clone()),
			name,
			resolver,
		};
		Self {
			inner: Arc::new(ReentrantMutex::new(RefCell::new(state))),
		}
	}

	fn with_state<R>(&self, f: impl FnOnce(&mut NamespaceState<V>) -> R) -> R {
		let guard = self.inner.lock();
		let mut state = guard.borrow_mut();
		f(&mut *state)
	}

	pub fn name(&self) -> String {
		self.with_state(|state| state.name.clone())
	}

	/// Registers `value` at `path`, wrapping it in an anonymous [`Symbol`].
	pub fn register(&self, path: &str, value: V) -> Result<InsertAction> {
		self.register_symbol(path, Symbol::new(value))
	}

	/// Registers a prepared symbol at `path`.
	///
	/// Missing intermediate nodes are created. If a live symbol already sits
	/// at `path` the conflict policy runs first; a rejected registration
	/// leaves the tree untouched. A pending loader for `path` is dropped.
	pub fn register_symbol(&self, path: &str, symbol: Symbol<V>) -> Result<InsertAction> {
		let path = parse_path(Op::Register, path)?;
		let guard = self.inner.lock();
		let Some(action) = admit(&guard, Op::Register, &path, Some(&symbol))? else {
			return Ok(InsertAction::KeptExisting);
		};
		let mut state = guard.borrow_mut();
		state.ensure(&path).set_symbol(symbol);
		state.resolver.remove_lazy(&path);
		tracing::debug!(namespace = %state.name, %path, ?action, "registered");
		Ok(action)
	}

	/// Registers a deferred producer for `path`.
	///
	/// The path becomes structurally reachable immediately; the loader runs
	/// on the first [`Self::resolve`] that finds no value there. Registering
	/// a loader over a live symbol goes through the conflict policy, and a
	/// replaced symbol is cleared so the loader takes effect.
	pub fn register_lazy(&self, path: &str, loader: impl LazyLoader<V> + 'static) -> Result<InsertAction> {
		let path = parse_path(Op::RegisterLazy, path)?;
		let loader: Arc<dyn LazyLoader<V>> = Arc::new(loader);
		let guard = self.inner.lock();
		let Some(action) = admit(&guard, Op::RegisterLazy, &path, None)? else {
			return Ok(InsertAction::KeptExisting);
		};
		let mut state = guard.borrow_mut();
		let node = state.ensure(&path);
		if node.is_occupied() {
			node.take_symbol();
		}
		state.resolver.add_lazy(path.clone(), loader);
		tracing::debug!(namespace = %state.name, %path, ?action, "registered lazy loader");
		Ok(action)
	}

	/// Resolves `path` to a copy of its value.
	///
	/// Fails with [`RegistryError::PathNotFound`] if any segment is missing.
	/// Returns `Ok(None)` if the node exists but holds no value.
	pub fn resolve(&self, path: &str) -> Result<Option<V>> {
		Ok(self.resolve_symbol(path)?.and_then(Symbol::into_value))
	}

	/// Resolves `path` to a copy of its full symbol, triggering a pending
	/// loader if the node holds no value.
	pub fn resolve_symbol(&self, path: &str) -> Result<Option<Symbol<V>>> {
		let path = parse_path(Op::Resolve, path)?;
		let guard = self.inner.lock();

		let loader = {
			let mut borrowed = guard.borrow_mut();
			let state = &mut *borrowed;
			let node = state
				.root
				.walk(path.segments())
				.ok_or_else(|| RegistryError::not_found(Op::Resolve, &path))?;
			if node.is_occupied() {
				return Ok(node.symbol().cloned());
			}
			match state.resolver.begin_lazy(Op::Resolve, &path)? {
				Some(loader) => loader,
				None => return Ok(node.symbol().cloned()),
			}
		};

		let outcome = {
			let _loading = Loading { state: &guard, path: &path };
			run_loader(Op::Resolve, loader.as_ref(), &path)
		};

		let mut borrowed = guard.borrow_mut();
		let state = &mut *borrowed;
		let value = outcome?;
		state.resolver.complete_lazy(&path);

		let node = state.ensure(&path);
		if !node.is_occupied() {
			let symbol = match node.symbol() {
				Some(placeholder) => placeholder.rehydrate(value),
				None => Symbol::new(value),
			};
			node.set_symbol(symbol);
		}
		Ok(node.symbol().cloned())
	}

	/// Every `(path, value)` whose dotted path matches the glob `pattern`.
	pub fn resolve_pattern(&self, pattern: &str) -> Vec<(NsPath, V)> {
		self.with_state(|state| state.resolver.match_pattern(&state.root, pattern))
	}

	/// Clears the symbol at `path`, returning it.
	///
	/// Fails with [`RegistryError::PathNotFound`] if an intermediate segment
	/// is missing; a missing final segment is not an error. The node stays in
	/// place along with its subtree, and any pending loader is dropped.
	pub fn unregister(&self, path: &str) -> Result<Option<Symbol<V>>> {
		let path = parse_path(Op::Unregister, path)?;
		self.with_state(|state| {
			let parent = match path.parent() {
				Some(parent) => state.root.walk_mut(parent.segments()),
				None => Some(&mut state.root),
			}
			.ok_or_else(|| RegistryError::not_found(Op::Unregister, &path))?;
			let removed = parent.get_child_mut(path.leaf()).and_then(NamespaceNode::take_symbol);
			let dropped_loader = state.resolver.remove_lazy(&path);
			tracing::debug!(namespace = %state.name, %path, removed = removed.is_some(), dropped_loader, "unregistered");
			Ok(removed)
		})
	}

	/// Returns `true` if `path` holds a value or a pending loader. Never
	/// triggers a loader.
	pub fn contains(&self, path: &str) -> bool {
		let Ok(path) = NsPath::parse(path) else {
			return false;
		};
		self.with_state(|state| {
			state.root.walk(path.segments()).is_some_and(NamespaceNode::is_occupied) || state.resolver.has_lazy(&path)
		})
	}

	/// Every occupied path at or under `prefix`, in traversal order. An empty
	/// prefix lists the whole tree.
	pub fn list(&self, prefix: &str) -> Result<Vec<NsPath>> {
		let prefix = if prefix.is_empty() { None } else { Some(parse_path(Op::List, prefix)?) };
		self.with_state(|state| {
			let mut paths = Vec::new();
			let mut push = |dotted: &str, node: &NamespaceNode<V>| {
				if node.is_occupied()
					&& let Ok(path) = NsPath::parse(dotted)
				{
					paths.push(path);
				}
			};

			match &prefix {
				None => state.root.visit_descendants("", &mut push),
				Some(prefix) => {
					let node = state
						.root
						.walk(prefix.segments())
						.ok_or_else(|| RegistryError::not_found(Op::List, prefix))?;
					push(prefix.as_str(), node);
					node.visit_descendants(prefix.as_str(), &mut push);
				}
			}
			Ok(paths)
		})
	}

	/// Copy of the conflicts the resolver has recorded.
	pub fn collisions(&self) -> Vec<Collision> {
		self.with_state(|state| state.resolver.collisions().to_vec())
	}

	/// Name of the active conflict policy.
	pub fn policy_name(&self) -> &'static str {
		self.with_state(|state| state.resolver.policy_name())
	}
}
