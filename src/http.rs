//! Transport primitives shared by discovery, token exchanges, and probes.
//!
//! [`HttpClient`] is the crate's only dependency on an HTTP stack: a single polymorphic `send`
//! capability that every outbound request goes through. [`ReqwestHttpClient`] is the default
//! implementation; tests plug in recording fakes.

// std
#[cfg(feature = "reqwest")] use std::{ops::Deref, time::Duration as StdDuration};
// self
use crate::{_prelude::*, descriptor::Verb, error::TransportError};

/// Boxed future returned by [`HttpClient::send`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Outbound request description.
///
/// Header values and form fields routinely carry secrets, so [`Debug`] prints header names and
/// form keys only.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
	/// Request method.
	pub method: Verb,
	/// Absolute target URL.
	pub url: Url,
	/// Header name/value pairs, in insertion order.
	pub headers: Vec<(&'static str, String)>,
	/// Optional `application/x-www-form-urlencoded` body.
	pub form: Option<Vec<(&'static str, String)>>,
	/// Only the status is needed; transports may skip reading the response body.
	pub status_only: bool,
}
impl HttpRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Verb, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), form: None, status_only: false }
	}

	/// Appends a header.
	pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
		self.headers.push((name, value.into()));

		self
	}

	/// Sets a form-encoded body.
	pub fn with_form(mut self, form: Vec<(&'static str, String)>) -> Self {
		self.form = Some(form);

		self
	}

	/// Marks the response body as irrelevant.
	pub fn status_only(mut self) -> Self {
		self.status_only = true;

		self
	}

	/// Looks up the first header with the given (case-insensitive) name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &self.headers.iter().map(|(name, _)| *name).collect::<Vec<_>>())
			.field(
				"form",
				&self.form.as_ref().map(|form| form.iter().map(|(key, _)| *key).collect::<Vec<_>>()),
			)
			.field("status_only", &self.status_only)
			.finish()
	}
}

/// Response status and body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes (empty for `HEAD` and status-only requests).
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Abstraction over HTTP transports.
///
/// Implementations must be `Send + Sync + 'static` so a single client can be shared (behind
/// `Arc`) by the token cache and the probe executor. Implementations must not follow redirects:
/// a redirect answered by the target API is an observed status, not a hop.
pub trait HttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends one request and returns the response, or a [`TransportError`] when no response was
	/// received.
	fn send(&self, request: HttpRequest) -> HttpFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Clients built here never follow redirects and apply a request timeout. Configure any custom
/// [`ReqwestClient`] passed to [`ReqwestHttpClient::with_client`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Request timeout applied by [`ReqwestHttpClient::new`].
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

	/// Builds a client with [`Self::DEFAULT_TIMEOUT`].
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		Self::with_timeout(Self::DEFAULT_TIMEOUT)
	}

	/// Builds a non-redirecting client with the provided request timeout.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpClient for ReqwestHttpClient {
	fn send(&self, request: HttpRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			let HttpRequest { method, url, headers, form, status_only } = request;
			let mut builder = self.0.request(method.into(), url.clone());

			for (name, value) in headers {
				builder = builder.header(name, value);
			}
			if let Some(form) = form {
				builder = builder.form(&form);
			}

			let response = builder.send().await.map_err(|e| map_reqwest_error(&url, e))?;
			let status = response.status().as_u16();

			if status_only {
				return Ok(HttpResponse { status, body: Vec::new() });
			}

			let body = response.bytes().await.map_err(|e| map_reqwest_error(&url, e))?.to_vec();

			Ok(HttpResponse { status, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(url: &Url, e: ReqwestError) -> TransportError {
	if e.is_builder() {
		TransportError::invalid_request(url, e)
	} else if e.is_timeout() {
		TransportError::timeout(url, e)
	} else {
		TransportError::network(url, e)
	}
}
