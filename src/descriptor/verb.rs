// self
use crate::_prelude::*;

/// Raised when a string does not name one of the recognized HTTP verbs.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("`{0}` is not a recognized HTTP verb.")]
pub struct UnknownVerb(pub String);

/// The fixed HTTP verb enumeration probed by the matrix.
///
/// Variant order is the matrix order; it drives every `BTreeSet`/`BTreeMap` keyed by verb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
	/// `GET`
	Get,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
	/// `PATCH`
	Patch,
	/// `POST`
	Post,
	/// `HEAD`
	Head,
}
impl Verb {
	/// Every recognized verb, in matrix order.
	pub const ALL: [Verb; 6] =
		[Verb::Get, Verb::Put, Verb::Delete, Verb::Patch, Verb::Post, Verb::Head];

	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Verb::Get => "GET",
			Verb::Put => "PUT",
			Verb::Delete => "DELETE",
			Verb::Patch => "PATCH",
			Verb::Post => "POST",
			Verb::Head => "HEAD",
		}
	}
}
impl Display for Verb {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Verb {
	type Err = UnknownVerb;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Verb::ALL
			.into_iter()
			.find(|verb| verb.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| UnknownVerb(s.to_owned()))
	}
}
#[cfg(feature = "reqwest")]
impl From<Verb> for reqwest::Method {
	fn from(verb: Verb) -> Self {
		match verb {
			Verb::Get => reqwest::Method::GET,
			Verb::Put => reqwest::Method::PUT,
			Verb::Delete => reqwest::Method::DELETE,
			Verb::Patch => reqwest::Method::PATCH,
			Verb::Post => reqwest::Method::POST,
			Verb::Head => reqwest::Method::HEAD,
		}
	}
}
