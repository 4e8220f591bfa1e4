//! Per-path bookkeeping: metadata, expiration and version history.

use forged_primitives::Timestamp;
use serde::Serialize;

/// One historical value of a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Version<V> {
	pub timestamp: Timestamp,
	pub value: V,
}

/// Snapshot of a path's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
	pub created_at: Timestamp,
	pub updated_at: Timestamp,
	pub description: Option<String>,
	pub expires_at: Option<Timestamp>,
}

#[derive(Debug)]
pub(crate) struct EntryRecord<V> {
	created_at: Timestamp,
	updated_at: Timestamp,
	description: Option<String>,
	expires_at: Option<Timestamp>,
	versions: Vec<Version<V>>,
}

impl<V: Clone> EntryRecord<V> {
	pub(crate) fn new(now: Timestamp) -> Self {
		Self {
			created_at: now,
			updated_at: now,
			description: None,
			expires_at: None,
			versions: Vec::new(),
		}
	}

	/// Appends `value` as the newest version and returns its timestamp.
	///
	/// The stamp is never earlier than the previous one, so history stays
	/// ordered when the clock steps backwards. `None` keeps the current
	/// description or expiration.
	pub(crate) fn stamp(&mut self, now: Timestamp, value: V, description: Option<String>, expires_at: Option<Timestamp>) -> Timestamp {
		let at = self.versions.last().map_or(now, |last| now.max(last.timestamp));
		self.updated_at = at;
		if description.is_some() {
			self.description = description;
		}
		if expires_at.is_some() {
			self.expires_at = expires_at;
		}
		self.versions.push(Version { timestamp: at, value });
		at
	}

	/// An entry is live through its deadline and expired only after it.
	pub(crate) fn is_expired(&self, now: Timestamp) -> bool {
		self.expires_at.is_some_and(|deadline| now > deadline)
	}

	/// Newest version stamped at or before `at`.
	pub(crate) fn restore_point(&self, at: Timestamp) -> Option<&Version<V>> {
		self.versions.iter().rev().find(|version| version.timestamp <= at)
	}

	pub(crate) fn versions(&self) -> &[Version<V>] {
		&self.versions
	}

	pub(crate) fn metadata(&self) -> Metadata {
		Metadata {
			created_at: self.created_at,
			updated_at: self.updated_at,
			description: self.description.clone(),
			expires_at: self.expires_at,
		}
	}
}
