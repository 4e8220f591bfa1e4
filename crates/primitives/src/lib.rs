//! Shared building blocks for the registries: validated dotted paths, the
//! glob matcher used by pattern queries, and injectable clocks.

/// Time sources for history stamps and expiration.
pub mod clock;
/// Shell-style glob matching over dotted paths.
pub mod glob;
/// Dotted path parsing and validation.
pub mod path;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use glob::{Glob, glob_matches};
pub use path::{NsPath, PathError, is_valid, is_valid_segment};
