//! Redacted secrets and the access tokens issued for one assessment run.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::Scope};

/// Redacted secret wrapper keeping API keys, client secrets, and tokens out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Base64 (no padding) SHA-256 digest of the value, safe to log.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.0.as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access token acquired through the client-credentials grant for a single scope.
///
/// Tokens live only inside the [`TokenCache`](crate::cache::TokenCache) of one assessment and are
/// never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Scope the token was requested for.
	pub scope: Scope,
	/// Token value.
	pub secret: Secret,
	/// Moment the token endpoint answered.
	pub acquired_at: OffsetDateTime,
}
impl AccessToken {
	/// Wraps a freshly issued token.
	pub fn new(scope: Scope, secret: Secret) -> Self {
		Self { scope, secret, acquired_at: OffsetDateTime::now_utc() }
	}

	/// The token with its final character removed; an empty token stays empty.
	pub fn corrupted(&self) -> Secret {
		let mut value = self.secret.expose().to_owned();

		value.pop();

		Secret::new(value)
	}
}
