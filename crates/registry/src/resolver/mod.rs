//! Conflict handling, lazy loading, and wildcard matching over a tree.
//!
//! The resolver owns no tree. It is handed nodes by its [`Namespace`](crate::Namespace)
//! and keeps only policy state: the conflict policy, the collision log, and
//! the pending loaders keyed by path.

use std::sync::Arc;

use forged_primitives::{Glob, NsPath};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Op, RegistryError, Result};
use crate::node::NamespaceNode;
use crate::symbol::Symbol;

mod conflict;
mod lazy;


pub use conflict::{Collision, Conflict, ConflictPolicy, ConflictPolicyKind, FirstWins, InsertAction, LastWins, Resolution, Strict};
pub use lazy::LazyLoader;

/// Policy state for one namespace tree.
pub struct Resolver<V> {
	policy: Arc<dyn ConflictPolicy<V>>,
	loaders: FxHashMap<NsPath, Arc<dyn LazyLoader<V>>>,
	in_flight: FxHashSet<NsPath>,
	collisions: Vec<Collision>,
}

impl<V: 'static> Default for Resolver<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> std::fmt::Debug for Resolver<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Resolver")
			.field("policy", &self.policy.name())
			.field("pending_loaders", &self.loaders.len())
			.field("collisions", &self.collisions.len())
			.finish()
	}
}

impl<V: 'static> Resolver<V> {
	/// Creates a resolver with the [`LastWins`] policy.
	pub fn new() -> Self {
		Self::with_policy(LastWins)
	}

	pub fn with_policy(policy: impl ConflictPolicy<V> + 'static) -> Self {
		Self::with_shared_policy(Arc::new(policy))
	}

	pub fn with_shared_policy(policy: Arc<dyn ConflictPolicy<V>>) -> Self {
		Self {
			policy,
			loaders: FxHashMap::default(),
			in_flight: FxHashSet::default(),
			collisions: Vec::new(),
		}
	}
}

impl<V> Resolver<V> {
	pub fn policy_name(&self) -> &'static str {
		self.policy.name()
	}

	/// Handles a registration that targets `existing`.
	///
	/// Must be called before the node is mutated. Unoccupied nodes (including
	/// value-less placeholders) are not conflicts and yield
	/// [`Resolution::ReplaceExisting`] without touching the log. Every real
	/// conflict is appended to [`Self::collisions`], including rejected ones.
	pub fn handle_conflict(&mut self, op: Op, existing: &NamespaceNode<V>, incoming: Option<&Symbol<V>>, path: &NsPath) -> Result<Resolution> {
		let Some(current) = existing.symbol().filter(|symbol| symbol.has_value()) else {
			return Ok(Resolution::ReplaceExisting);
		};

		let resolution = self.policy.decide(&Conflict {
			path,
			existing: current,
			incoming,
		});
		self.record_conflict(op, path, current, incoming, resolution)
	}

	/// Shared handle to the active policy, for deciding outside a borrow.
	pub(crate) fn shared_policy(&self) -> Arc<dyn ConflictPolicy<V>> {
		Arc::clone(&self.policy)
	}

	/// Logs a decided conflict and turns a rejection into an error.
	pub(crate) fn record_conflict(&mut self, op: Op, path: &NsPath, current: &Symbol<V>, incoming: Option<&Symbol<V>>, resolution: Resolution) -> Result<Resolution> {
		let policy = self.policy.name();

		tracing::warn!(
			%path,
			policy,
			?resolution,
			deferred = incoming.is_none(),
			"registration conflict",
		);

		self.collisions.push(Collision {
			path: path.clone(),
			existing_name: current.name().map(str::to_string),
			incoming_name: incoming.and_then(Symbol::name).map(str::to_string),
			deferred: incoming.is_none(),
			policy,
			resolution,
		});

		match resolution {
			Resolution::Reject => Err(RegistryError::ConflictDetected {
				op,
				path: path.to_string(),
				policy,
			}),
			other => Ok(other),
		}
	}

	/// Every conflict detected so far, oldest first.
	pub fn collisions(&self) -> &[Collision] {
		&self.collisions
	}

	/// Drains the collision log.
	pub fn take_collisions(&mut self) -> Vec<Collision> {
		std::mem::take(&mut self.collisions)
	}

	/// Registers a deferred producer for `path`, replacing any pending one.
	pub fn add_lazy(&mut self, path: NsPath, loader: Arc<dyn LazyLoader<V>>) -> bool {
		self.loaders.insert(path, loader).is_some()
	}

	/// Returns `true` if a loader is pending for `path`.
	pub fn has_lazy(&self, path: &NsPath) -> bool {
		self.loaders.contains_key(path)
	}

	/// Drops the pending loader for `path`, if any.
	pub fn remove_lazy(&mut self, path: &NsPath) -> bool {
		self.loaders.remove(path).is_some()
	}

	/// Invokes the pending loader for `path` and drops it on success.
	///
	/// Returns `Ok(None)` when nothing is pending. On failure the loader is
	/// kept so a later call retries it.
	pub fn load_lazy(&mut self, path: &NsPath) -> Result<Option<V>> {
		let Some(loader) = self.begin_lazy(Op::Resolve, path)? else {
			return Ok(None);
		};
		let outcome = {
			let _loading = InFlight {
				set: &mut self.in_flight,
				path,
			};
			run_loader(Op::Resolve, loader.as_ref(), path)
		};
		if outcome.is_ok() {
			self.complete_lazy(path);
		}
		outcome.map(Some)
	}

	/// Marks `path` as loading and hands out its loader.
	///
	/// Split from [`Self::load_lazy`] so a namespace can run the loader with
	/// its own state unborrowed. A path that is already loading is a cycle.
	/// Every successful call must be paired with [`Self::end_lazy`], even
	/// when the loader unwinds.
	pub(crate) fn begin_lazy(&mut self, op: Op, path: &NsPath) -> Result<Option<Arc<dyn LazyLoader<V>>>> {
		let Some(loader) = self.loaders.get(path).cloned() else {
			return Ok(None);
		};
		if !self.in_flight.insert(path.clone()) {
			return Err(RegistryError::LazyLoadFailed {
				op,
				path: path.to_string(),
				source: anyhow::anyhow!("loader for {path} re-entered its own path"),
			});
		}
		Ok(Some(loader))
	}

	pub(crate) fn end_lazy(&mut self, path: &NsPath) {
		self.in_flight.remove(path);
	}

	/// Drops the loader for `path` after it produced a value.
	pub(crate) fn complete_lazy(&mut self, path: &NsPath) {
		self.loaders.remove(path);
	}

	/// Paths with a loader still pending.
	pub(crate) fn pending_paths(&self) -> impl Iterator<Item = &NsPath> {
		self.loaders.keys()
	}

	/// Collects every `(path, value)` under `root` whose dotted path matches
	/// `pattern`, in traversal order.
	///
	/// `root` itself is the namespace root and contributes no segment.
	/// Symbols without a value (imported placeholders) are skipped.
	pub fn match_pattern(&self, root: &NamespaceNode<V>, pattern: &str) -> Vec<(NsPath, V)>
	where
		V: Clone,
	{
		let glob = Glob::new(pattern);
		let mut matches = Vec::new();
		root.visit_descendants("", |dotted, node| {
			if let Some(value) = node.symbol().and_then(Symbol::value)
				&& glob.is_match(dotted)
				&& let Ok(path) = NsPath::parse(dotted)
			{
				matches.push((path, value.clone()));
			}
		});
		matches
	}
}

/// Clears the in-flight mark for `path` when dropped, including on unwind.
struct InFlight<'a> {
	set: &'a mut FxHashSet<NsPath>,
	path: &'a NsPath,
}

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.set.remove(self.path);
	}
}

pub(crate) fn run_loader<V>(op: Op, loader: &dyn LazyLoader<V>, path: &NsPath) -> Result<V> {
	match loader.load(path) {
		Ok(value) => {
			tracing::debug!(%path, "lazy value loaded");
			Ok(value)
		}
		Err(source) => {
			tracing::warn!(%path, error = %source, "lazy load failed; loader kept for retry");
			Err(RegistryError::LazyLoadFailed {
				op,
				path: path.to_string(),
				source,
			})
		}
	}
}
