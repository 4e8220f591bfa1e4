//! Conflict vocabulary and the shipped policies.
//!
//! A conflict is any registration that targets a node already holding a
//! symbol. The resolver detects it before the node is touched, records it,
//! and asks the policy what to do.

use std::fmt;
use std::sync::Arc;

use forged_primitives::NsPath;
use serde::Deserialize;

use crate::symbol::Symbol;

/// What a policy decided for one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	/// Incoming symbol replaces the existing one.
	ReplaceExisting,
	/// Existing symbol kept; incoming dropped.
	KeepExisting,
	/// Registration aborted with [`ConflictDetected`](crate::RegistryError::ConflictDetected).
	Reject,
}

/// Result of a successful registration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertAction {
	/// Path was unoccupied; symbol inserted.
	InsertedNew,
	/// Path was occupied; kept the existing symbol (policy chose existing).
	KeptExisting,
	/// Path was occupied; replaced with the incoming symbol.
	ReplacedExisting,
}

/// A detected conflict, as presented to a policy.
#[derive(Debug)]
pub struct Conflict<'a, V> {
	pub path: &'a NsPath,
	pub existing: &'a Symbol<V>,
	/// The incoming symbol, or `None` when a deferred loader is being registered.
	pub incoming: Option<&'a Symbol<V>>,
}

/// Decides how a registration over an occupied path proceeds.
///
/// A [`Namespace`](crate::Namespace) consults its policy with the tree
/// unborrowed, so `decide` may resolve other paths of that namespace.
pub trait ConflictPolicy<V>: Send + Sync {
	/// Short name used in logs and error messages.
	fn name(&self) -> &'static str;

	fn decide(&self, conflict: &Conflict<'_, V>) -> Resolution;
}

/// Overwrites, logging a warning. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastWins;

/// Keeps the first registration and drops later ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstWins;

/// Aborts any registration over an occupied path.
#[derive(Debug, Default, Clone, Copy)]
pub struct Strict;

impl<V> ConflictPolicy<V> for LastWins {
	fn name(&self) -> &'static str {
		"last-wins"
	}

	fn decide(&self, _conflict: &Conflict<'_, V>) -> Resolution {
		Resolution::ReplaceExisting
	}
}

impl<V> ConflictPolicy<V> for FirstWins {
	fn name(&self) -> &'static str {
		"first-wins"
	}

	fn decide(&self, _conflict: &Conflict<'_, V>) -> Resolution {
		Resolution::KeepExisting
	}
}

impl<V> ConflictPolicy<V> for Strict {
	fn name(&self) -> &'static str {
		"strict"
	}

	fn decide(&self, _conflict: &Conflict<'_, V>) -> Resolution {
		Resolution::Reject
	}
}

/// Config-selectable policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicyKind {
	#[default]
	LastWins,
	FirstWins,
	Strict,
}

impl ConflictPolicyKind {
	pub fn build<V: 'static>(self) -> Arc<dyn ConflictPolicy<V>> {
		match self {
			Self::LastWins => Arc::new(LastWins),
			Self::FirstWins => Arc::new(FirstWins),
			Self::Strict => Arc::new(Strict),
		}
	}
}

/// Record of one detected conflict, kept whatever the policy decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
	pub path: NsPath,
	pub existing_name: Option<String>,
	pub incoming_name: Option<String>,
	/// `true` when the incoming registration was a deferred loader.
	pub deferred: bool,
	pub policy: &'static str,
	pub resolution: Resolution,
}

impl fmt::Display for Collision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} ({}): {:?} existing={:?} incoming={:?}",
			self.path, self.policy, self.resolution, self.existing_name, self.incoming_name
		)
	}
}
