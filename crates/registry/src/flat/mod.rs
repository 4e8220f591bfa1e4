//! String-keyed registry with history, expiry, permissions and aliases.
//!
//! Every call first maps its path through the alias table, then validates
//! it, then checks the caller's role before touching data. A role with no
//! grant on a path is denied. Expired entries are reclaimed lazily when a
//! read reaches them; nothing runs in the background.
//!
//! [`FlatRegistry`] is a cheap-clone handle: construct one at startup and
//! hand clones to every collaborator.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use forged_primitives::{Clock, Glob, NsPath, SystemClock, Timestamp};
use indexmap::IndexMap;
use parking_lot::ReentrantMutex;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::error::{Op, RegistryError, Result, parse_path};

mod history;
mod permissions;
mod store;

#[cfg(test)]
mod tests;

pub use history::{Metadata, Version};
pub use permissions::{Permission, RolePermissions, UnknownPermission};

use history::EntryRecord;
use permissions::PermissionTable;
use store::Store;

/// Optional parameters of a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
	/// Replaces the stored description; `None` keeps the current one.
	pub description: Option<String>,
	/// Expires the entry this long after the write; `None` keeps any
	/// existing expiration.
	pub ttl: Option<Duration>,
}

impl SetOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(ttl);
		self
	}
}

struct Tables<V> {
	store: Store<V>,
	records: FxHashMap<NsPath, EntryRecord<V>>,
	permissions: PermissionTable,
	aliases: IndexMap<NsPath, NsPath, FxBuildHasher>,
}

impl<V: Clone> Tables<V> {
	/// Maps `raw` through the alias table, then validates it.
	fn target(&self, op: Op, raw: &str) -> Result<NsPath> {
		match self.aliases.get(raw) {
			Some(target) => Ok(target.clone()),
			None => parse_path(op, raw),
		}
	}

	fn authorize(&self, op: Op, path: &NsPath, role: &str, permission: Permission) -> Result<()> {
		if self.permissions.allows(path, role, permission) {
			return Ok(());
		}
		tracing::debug!(%op, %path, role, %permission, "permission denied");
		Err(RegistryError::PermissionDenied {
			op,
			path: path.to_string(),
			role: role.to_string(),
			permission,
		})
	}

	/// Drops `path` if its expiration has passed. Permissions survive.
	fn reclaim_if_expired(&mut self, path: &NsPath, now: Timestamp) -> bool {
		if !self.records.get(path).is_some_and(|record| record.is_expired(now)) {
			return false;
		}
		self.records.remove(path);
		self.store.remove(path);
		tracing::debug!(%path, "expired entry reclaimed");
		true
	}

	fn reclaim_expired(&mut self, now: Timestamp) {
		let expired: Vec<NsPath> = self
			.records
			.iter()
			.filter(|(_, record)| record.is_expired(now))
			.map(|(path, _)| path.clone())
			.collect();
		for path in expired {
			self.reclaim_if_expired(&path, now);
		}
	}

	/// Shared write path of `set` and `rollback`.
	fn write(&mut self, op: Op, path: &NsPath, value: V, options: SetOptions, now: Timestamp) -> Result<Timestamp> {
		self.reclaim_if_expired(path, now);
		self.store.insert(op, path, value.clone())?;
		let expires_at = options.ttl.map(|ttl| deadline(now, ttl));
		let record = self.records.entry(path.clone()).or_insert_with(|| EntryRecord::new(now));
		Ok(record.stamp(now, value, options.description, expires_at))
	}
}

fn deadline(now: Timestamp, ttl: Duration) -> Timestamp {
	TimeDelta::from_std(ttl)
		.ok()
		.and_then(|delta| now.checked_add_signed(delta))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

struct Inner<V> {
	tables: ReentrantMutex<RefCell<Tables<V>>>,
	clock: Arc<dyn Clock>,
}

/// Process-wide flat registry handle. Clones share one set of tables.
pub struct FlatRegistry<V> {
	inner: Arc<Inner<V>>,
}

impl<V> Clone for FlatRegistry<V> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<V> std::fmt::Debug for FlatRegistry<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let guard = self.inner.tables.lock();
		let tables = guard.borrow();
		f.debug_struct("FlatRegistry")
			.field("entries", &tables.records.len())
			.field("aliases", &tables.aliases.len())
			.field("clock", &self.inner.clock)
			.finish()
	}
}

impl<V: Clone + Send + 'static> Default for FlatRegistry<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V: Clone + Send + 'static> FlatRegistry<V> {
	/// Creates an empty registry on the system clock.
	pub fn new() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}

	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		let tables = Tables {
			store: Store::default(),
			records: FxHashMap::default(),
			permissions: PermissionTable::default(),
			aliases: IndexMap::default(),
		};
		Self {
			inner: Arc::new(Inner {
				tables: ReentrantMutex::new(RefCell::new(tables)),
				clock,
			}),
		}
	}

	/// Runs `f` with the tables locked and the current time.
	fn with_tables<R>(&self, f: impl FnOnce(&mut Tables<V>, Timestamp) -> R) -> R {
		let guard = self.inner.tables.lock();
		let mut tables = guard.borrow_mut();
		f(&mut *tables, self.inner.clock.now())
	}

	/// Stores `value` at `path`, returning the timestamp of the new version.
	///
	/// Requires [`Permission::Write`]. The previous value stays in history;
	/// `created_at` is kept from the first write.
	pub fn set(&self, path: &str, value: V, role: &str, options: SetOptions) -> Result<Timestamp> {
		self.with_tables(|tables, now| {
			let path = tables.target(Op::Set, path)?;
			tables.authorize(Op::Set, &path, role, Permission::Write)?;
			let stamped = tables.write(Op::Set, &path, value, options, now)?;
			tracing::debug!(%path, role, "value set");
			Ok(stamped)
		})
	}

	/// Current value at `path`. Requires [`Permission::Read`].
	///
	/// An expired entry is reclaimed and reads as absent, as does a missing
	/// path or one that names a branch.
	pub fn get(&self, path: &str, role: &str) -> Result<Option<V>> {
		self.with_tables(|tables, now| {
			let path = tables.target(Op::Get, path)?;
			tables.authorize(Op::Get, &path, role, Permission::Read)?;
			tables.reclaim_if_expired(&path, now);
			Ok(tables.store.get(&path).cloned())
		})
	}

	/// Like [`Self::get`], falling back to `default` when nothing is stored.
	pub fn get_or(&self, path: &str, default: V, role: &str) -> Result<V> {
		Ok(self.get(path, role)?.unwrap_or(default))
	}

	/// Full history of `path`, oldest first. Requires [`Permission::Read`].
	pub fn get_versions(&self, path: &str, role: &str) -> Result<Vec<Version<V>>> {
		self.with_tables(|tables, now| {
			let path = tables.target(Op::GetVersions, path)?;
			tables.authorize(Op::GetVersions, &path, role, Permission::Read)?;
			tables.reclaim_if_expired(&path, now);
			Ok(tables.records.get(&path).map(|record| record.versions().to_vec()).unwrap_or_default())
		})
	}

	/// Metadata of `path`, if it holds an entry. Requires [`Permission::Read`].
	pub fn get_metadata(&self, path: &str, role: &str) -> Result<Option<Metadata>> {
		self.with_tables(|tables, now| {
			let path = tables.target(Op::GetMetadata, path)?;
			tables.authorize(Op::GetMetadata, &path, role, Permission::Read)?;
			tables.reclaim_if_expired(&path, now);
			Ok(tables.records.get(&path).map(EntryRecord::metadata))
		})
	}

	/// Re-applies the newest version stamped at or before `at` as a new
	/// version. Requires [`Permission::Write`].
	///
	/// Returns the appended version, or `None` (changing nothing) when no
	/// version is that old. Description and expiration are kept.
	pub fn rollback(&self, path: &str, at: Timestamp, role: &str) -> Result<Option<Version<V>>> {
		self.with_tables(|tables, now| {
			let path = tables.target(Op::Rollback, path)?;
			tables.authorize(Op::Rollback, &path, role, Permission::Write)?;
			tables.reclaim_if_expired(&path, now);
			let Some(value) = tables.records.get(&path).and_then(|record| record.restore_point(at)).map(|version| version.value.clone())
			else {
				return Ok(None);
			};
			let timestamp = tables.write(Op::Rollback, &path, value.clone(), SetOptions::default(), now)?;
			tracing::debug!(%path, role, restored_from = %at, "rolled back");
			Ok(Some(Version { timestamp, value }))
		})
	}

	/// Removes the value at `path` with its metadata, history, expiration and
	/// permissions. Requires [`Permission::Write`].
	///
	/// Emptied parent branches stay in place. Aliases pointing at `path` are
	/// kept.
	pub fn delete(&self, path: &str, role: &str) -> Result<Option<V>> {
		self.with_tables(|tables, _| {
			let path = tables.target(Op::Delete, path)?;
			tables.authorize(Op::Delete, &path, role, Permission::Write)?;
			let removed = tables.store.remove(&path);
			tables.records.remove(&path);
			tables.permissions.clear(&path);
			tracing::debug!(%path, role, removed = removed.is_some(), "deleted");
			Ok(removed)
		})
	}

	/// Immediate child keys under `path`, or the top-level keys when `path`
	/// is empty. A leaf or missing path has none.
	pub fn list_keys(&self, path: &str) -> Result<Vec<String>> {
		self.with_tables(|tables, now| {
			tables.reclaim_expired(now);
			if path.is_empty() {
				return Ok(tables.store.keys(None));
			}
			let path = tables.target(Op::ListKeys, path)?;
			Ok(tables.store.keys(Some(&path)))
		})
	}

	/// Every stored `(path, value)` matching the glob `pattern` that `role`
	/// may read, in traversal order.
	pub fn search(&self, pattern: &str, role: &str) -> Vec<(NsPath, V)> {
		let glob = Glob::new(pattern);
		self.with_tables(|tables, now| {
			tables.reclaim_expired(now);
			tables
				.store
				.leaves()
				.into_iter()
				.filter(|(path, _)| glob.is_match(path.as_str()) && tables.permissions.allows(path, role, Permission::Read))
				.map(|(path, value)| (path, value.clone()))
				.collect()
		})
	}

	/// Every stored path, in traversal order.
	pub fn list_all(&self) -> Vec<NsPath> {
		self.with_tables(|tables, now| {
			tables.reclaim_expired(now);
			tables.store.leaves().into_iter().map(|(path, _)| path).collect()
		})
	}

	/// Redirects `alias` to `target`. Aliases are one level deep: `target`
	/// is stored as given, never itself resolved.
	pub fn set_alias(&self, alias: &str, target: &str) -> Result<()> {
		let alias = parse_path(Op::SetAlias, alias)?;
		let target = parse_path(Op::SetAlias, target)?;
		self.with_tables(|tables, _| {
			tracing::debug!(%alias, %target, "alias set");
			tables.aliases.insert(alias, target);
		});
		Ok(())
	}

	pub fn get_alias(&self, alias: &str) -> Option<NsPath> {
		self.with_tables(|tables, _| tables.aliases.get(alias).cloned())
	}

	/// Removes `alias`, returning its target.
	pub fn delete_alias(&self, alias: &str) -> Option<NsPath> {
		self.with_tables(|tables, _| tables.aliases.shift_remove(alias))
	}

	/// Grants `permission` on `path` to `role`.
	pub fn set_permission(&self, path: &str, role: &str, permission: Permission) -> Result<()> {
		self.grant(path, role, [permission])
	}

	/// Grants several tokens at once.
	pub fn grant(&self, path: &str, role: &str, permissions: impl IntoIterator<Item = Permission>) -> Result<()> {
		self.with_tables(|tables, _| {
			let path = tables.target(Op::SetPermission, path)?;
			for permission in permissions {
				tables.permissions.grant(&path, role, permission);
				tracing::debug!(%path, role, %permission, "permission granted");
			}
			Ok(())
		})
	}

	/// Revokes one token, returning whether the role held it.
	pub fn revoke_permission(&self, path: &str, role: &str, permission: Permission) -> Result<bool> {
		self.with_tables(|tables, _| {
			let path = tables.target(Op::RevokePermission, path)?;
			Ok(tables.permissions.revoke(&path, role, permission))
		})
	}

	/// Returns `true` if `role` holds `permission` on `path`. Invalid paths
	/// hold nothing.
	pub fn check_permission(&self, path: &str, role: &str, permission: Permission) -> bool {
		self.with_tables(|tables, _| match tables.target(Op::CheckPermission, path) {
			Ok(path) => tables.permissions.allows(&path, role, permission),
			Err(error) => {
				tracing::debug!(%error, role, %permission, "permission check on invalid path");
				false
			}
		})
	}

	/// Every role's tokens on `path`.
	pub fn get_permissions(&self, path: &str) -> Result<RolePermissions> {
		self.with_tables(|tables, _| {
			let path = tables.target(Op::GetPermissions, path)?;
			Ok(tables.permissions.roles(&path))
		})
	}
}
