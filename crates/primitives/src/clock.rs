//! Time sources for history stamps and expiration.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// Wall-clock timestamp used throughout the registries.
pub type Timestamp = DateTime<Utc>;

/// A source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
	/// Returns the current time.
	fn now(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> Timestamp {
		Utc::now()
	}
}

/// A manually driven clock for deterministic expiry and history tests.
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
	now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: Timestamp) -> Self {
		Self {
			now: Arc::new(Mutex::new(start)),
		}
	}

	/// Creates a clock frozen at the Unix epoch.
	pub fn at_epoch() -> Self {
		Self::new(DateTime::<Utc>::UNIX_EPOCH)
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: TimeDelta) {
		*self.now.lock() += delta;
	}

	/// Moves the clock forward by `secs` whole seconds.
	pub fn advance_secs(&self, secs: i64) {
		self.advance(TimeDelta::seconds(secs));
	}

	/// Jumps the clock to `at`, which may be in the past.
	pub fn set(&self, at: Timestamp) {
		*self.now.lock() = at;
	}
}

impl Default for ManualClock {
	fn default() -> Self {
		Self::at_epoch()
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Timestamp {
		*self.now.lock()
	}
}
