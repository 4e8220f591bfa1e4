//! Deferred producers for lazily materialized paths.

use forged_primitives::NsPath;

/// Produces the value for a path on first resolve.
///
/// A loader runs at most once successfully; after that the value is cached
/// at the node and the loader is dropped. A failed load leaves the loader in
/// place so the next resolve retries it.
pub trait LazyLoader<V>: Send + Sync {
	fn load(&self, path: &NsPath) -> anyhow::Result<V>;
}

impl<V, F> LazyLoader<V> for F
where
	F: Fn(&NsPath) -> anyhow::Result<V> + Send + Sync,
{
	fn load(&self, path: &NsPath) -> anyhow::Result<V> {
		self(path)
	}
}
