//! Dotted registry paths.
//!
//! A path is one or more `[A-Za-z0-9_]+` segments joined by `.`. It is the
//! only addressing scheme the registries expose, so every public entry point
//! parses its input into an [`NsPath`] before touching any state.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;


static PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)*$").expect("path regex is valid"));

/// Path separator between segments.
pub const SEPARATOR: char = '.';

/// Errors produced while parsing a path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
	/// The input was empty; a path needs at least one segment.
	#[error("empty path: at least one segment is required")]
	Empty,
	/// The input did not match `segment(.segment)*`.
	#[error("invalid path {path:?}: expected dot-separated [A-Za-z0-9_]+ segments")]
	Invalid { path: String },
}

/// Returns `true` if `path` is a well-formed dotted path.
pub fn is_valid(path: &str) -> bool {
	PATH_RE.is_match(path)
}

/// Returns `true` if `segment` is a single well-formed path segment.
pub fn is_valid_segment(segment: &str) -> bool {
	!segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// A validated dotted path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NsPath(Box<str>);

impl NsPath {
	/// Parses and validates a path.
	pub fn parse(path: &str) -> Result<Self, PathError> {
		if path.is_empty() {
			return Err(PathError::Empty);
		}
		if !is_valid(path) {
			return Err(PathError::Invalid { path: path.to_string() });
		}
		Ok(Self(Box::from(path)))
	}

	/// Builds a path from already-split segments.
	pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut joined = String::new();
		for segment in segments {
			if !joined.is_empty() {
				joined.push(SEPARATOR);
			}
			joined.push_str(segment.as_ref());
		}
		Self::parse(&joined)
	}

	/// Returns the path as a string slice.
	#[inline]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Iterates the segments root-first.
	pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
		self.0.split(SEPARATOR)
	}

	/// Number of segments (always at least one).
	pub fn depth(&self) -> usize {
		self.segments().count()
	}

	/// The final segment.
	pub fn leaf(&self) -> &str {
		self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
	}

	/// The path without its final segment, or `None` for a single-segment path.
	pub fn parent(&self) -> Option<NsPath> {
		self.0.rsplit_once(SEPARATOR).map(|(parent, _)| Self(Box::from(parent)))
	}

	/// Appends one segment.
	pub fn child(&self, segment: &str) -> Result<NsPath, PathError> {
		if !is_valid_segment(segment) {
			return Err(PathError::Invalid {
				path: format!("{}{SEPARATOR}{segment}", self.0),
			});
		}
		Ok(Self(format!("{}{SEPARATOR}{segment}", self.0).into_boxed_str()))
	}

	/// Returns `true` if `self` equals `prefix` or lies underneath it.
	pub fn starts_with(&self, prefix: &NsPath) -> bool {
		match self.0.strip_prefix(&*prefix.0) {
			Some("") => true,
			Some(rest) => rest.starts_with(SEPARATOR),
			None => false,
		}
	}
}

impl fmt::Debug for NsPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "NsPath({:?})", &*self.0)
	}
}

impl fmt::Display for NsPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for NsPath {
	type Err = PathError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<&str> for NsPath {
	type Error = PathError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl TryFrom<String> for NsPath {
	type Error = PathError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

impl AsRef<str> for NsPath {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for NsPath {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<NsPath> for String {
	fn from(path: NsPath) -> Self {
		path.0.into_string()
	}
}
