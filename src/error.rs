//! Assessment error taxonomy shared across validation, discovery, token acquisition, and probes.
//!
//! Discovery and token failures are memoized by [`TokenCache`](crate::cache::TokenCache), so
//! their sources are `Arc`-shared and the enums are cheap to clone.

// self
use crate::{_prelude::*, descriptor::Violations};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;
type SharedError = Arc<dyn StdError + Send + Sync>;
type JsonPathError = Arc<serde_path_to_error::Error<serde_json::Error>>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Descriptor or local configuration problem; nothing was sent.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity provider discovery failed.
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),
	/// A token could not be acquired for one scope.
	#[error(transparent)]
	Token(#[from] TokenError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Any other failure; aborts the remaining work for the current descriptor.
	#[error("Assessment aborted: {message}.")]
	Unexpected {
		/// Human-readable reason.
		message: String,
	},
}
impl Error {
	/// Builds an [`Error::Unexpected`] from any displayable reason.
	pub fn unexpected(message: impl Display) -> Self {
		Self::Unexpected { message: message.to_string() }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Descriptor failed validation; every detected violation is listed.
	#[error("Descriptor{} is invalid: {violations}.", fmt_owner(.owner))]
	InvalidDescriptor {
		/// Owner field, when it could be read.
		owner: Option<String>,
		/// All violations, in detection order.
		violations: Violations,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// OIDC discovery failures; fatal to every token request of the descriptor.
#[derive(Clone, Debug, ThisError)]
pub enum DiscoveryError {
	/// Issuer URL cannot host a discovery document.
	#[error("Issuer `{issuer}` cannot host a discovery document.")]
	InvalidIssuer {
		/// Issuer URL as configured.
		issuer: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Discovery request never produced a response.
	#[error("Issuer `{issuer}` is unreachable.")]
	Unreachable {
		/// Issuer URL as configured.
		issuer: String,
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// Discovery document request returned a non-success status.
	#[error("Discovery document request returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Discovery document is not valid JSON of the expected shape.
	#[error("Discovery document is malformed.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
	},
	/// Discovery document omitted `token_endpoint`.
	#[error("Discovery document is missing token_endpoint.")]
	MissingTokenEndpoint,
	/// Discovery document advertised an unparsable `token_endpoint`.
	#[error("Discovery document token_endpoint `{value}` is not a valid URL.")]
	InvalidTokenEndpoint {
		/// Advertised value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl DiscoveryError {
	pub(crate) fn parse(source: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Parse { source: Arc::new(source) }
	}
}

/// Token acquisition failures; fatal only to probes depending on the affected scope.
#[derive(Clone, Debug, ThisError)]
pub enum TokenError {
	/// Discovery failed earlier in the run, so no token endpoint is known.
	#[error("OIDC discovery failed, so no token can be requested.")]
	DiscoveryFailed {
		/// Memoized discovery failure.
		#[source]
		source: DiscoveryError,
	},
	/// Token request never produced a response.
	#[error("Token endpoint is unreachable.")]
	Unreachable {
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// Token endpoint answered with an OAuth `error` field.
	#[error("Token endpoint rejected the request with `{error}` (HTTP {status}){}.", fmt_description(.description))]
	Rejected {
		/// OAuth error code.
		error: String,
		/// Optional `error_description`.
		description: Option<String>,
		/// HTTP status code.
		status: u16,
	},
	/// Token endpoint answered with a non-success status and no OAuth error.
	#[error("Token endpoint returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Successful response without `access_token`.
	#[error("Token endpoint response is missing access_token.")]
	MissingAccessToken,
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON (HTTP {status}).")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
		/// HTTP status code.
		status: u16,
	},
}
impl TokenError {
	pub(crate) fn parse(source: serde_path_to_error::Error<serde_json::Error>, status: u16) -> Self {
		Self::Parse { source: Arc::new(source), status }
	}
}

/// Transport-level failures (network, timeout, malformed request).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Request did not complete before the configured timeout.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Target URL.
		url: String,
		/// Transport-specific timeout error.
		#[source]
		source: SharedError,
	},
	/// Request could not be built (for example an API key that is not a valid header value).
	#[error("Request to {url} could not be built.")]
	InvalidRequest {
		/// Target URL.
		url: String,
		/// Transport-specific builder error.
		#[source]
		source: SharedError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.to_string(), source: Arc::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(url: &Url, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Timeout { url: url.to_string(), source: Arc::new(src) }
	}

	/// Wraps a transport-specific request construction error.
	pub fn invalid_request(url: &Url, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::InvalidRequest { url: url.to_string(), source: Arc::new(src) }
	}

	/// Returns true when the failure is local to one probe rather than the whole descriptor.
	pub fn is_probe_local(&self) -> bool {
		!matches!(self, Self::InvalidRequest { .. })
	}
}

/// Renders an error and its source chain on one line.
///
/// Messages are joined with `: ` after dropping their trailing period, so
/// `Token endpoint is unreachable.` caused by `connection refused` renders as
/// `Token endpoint is unreachable: connection refused`.
pub fn render_chain(err: &(dyn StdError + 'static)) -> String {
	let mut parts = vec![err.to_string()];
	let mut current = err.source();

	while let Some(source) = current {
		parts.push(source.to_string());

		current = source.source();
	}

	parts.iter().map(|part| part.trim_end_matches('.')).collect::<Vec<_>>().join(": ")
}

fn fmt_owner(owner: &Option<String>) -> String {
	owner.as_ref().map(|owner| format!(" for `{owner}`")).unwrap_or_default()
}

fn fmt_description(description: &Option<String>) -> String {
	description.as_ref().map(|description| format!(": {description}")).unwrap_or_default()
}
