//! Cross-module tests: concurrent access and property checks.

mod concurrency;
mod properties;

/// Routes `tracing` output to the test harness. Safe to call repeatedly.
pub(crate) fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
