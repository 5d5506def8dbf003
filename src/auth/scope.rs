//! OAuth scope identifiers as declared by descriptors.

// self
use crate::_prelude::*;

/// Opaque OAuth scope string; the empty string is the default scope.
///
/// Unlike a token request's scope *set*, descriptors name exactly one scope per method and the
/// value is forwarded verbatim, so no normalization happens here. The default scope is always
/// requested once a descriptor exposes authenticated methods.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);
impl Scope {
	/// Wraps a scope string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns true for the default (empty) scope.
	pub fn is_default(&self) -> bool {
		self.0.is_empty()
	}

	/// Raw value sent as the `scope` form parameter.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Human-readable label used in probe descriptions.
	pub fn label(&self) -> String {
		if self.is_default() { "the default scope".into() } else { format!("scope `{}`", self.0) }
	}
}
impl AsRef<str> for Scope {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl From<&str> for Scope {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl Debug for Scope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Scope({:?})", self.0)
	}
}
impl Display for Scope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
