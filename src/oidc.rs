//! OIDC discovery and the client-credentials token exchange.
//!
//! Only two identity-provider interactions exist: `GET {iss}/.well-known/openid-configuration`
//! to learn the token endpoint, and a form-encoded `POST` of the client-credentials grant to it.
//! Both go through [`HttpClient`] so transports stay swappable.

// self
use crate::{
	_prelude::*,
	auth::{Scope, Secret},
	descriptor::{Verb, join_path},
	error::{DiscoveryError, TokenError},
	http::{HttpClient, HttpRequest, HttpResponse},
};

/// Path of the discovery document relative to the issuer.
pub const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

/// Subset of the discovery document the assessment relies on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct DiscoveryDocument {
	/// Advertised issuer, informational.
	#[serde(default)]
	pub issuer: Option<String>,
	/// Token endpoint used for the client-credentials grant.
	#[serde(default)]
	pub token_endpoint: Option<String>,
}

/// Token endpoint response, success or OAuth error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TokenEndpointResponse {
	/// Issued token.
	#[serde(default)]
	pub access_token: Option<String>,
	/// OAuth error code.
	#[serde(default)]
	pub error: Option<String>,
	/// OAuth error description.
	#[serde(default)]
	pub error_description: Option<String>,
}

/// Client-credentials grant parameters for one scope.
#[derive(Clone, Debug)]
pub struct ClientCredentialsRequest<'a> {
	/// Client identifier.
	pub client_id: &'a str,
	/// Client secret.
	pub client_secret: &'a Secret,
	/// Requested audience.
	pub audience: &'a str,
	/// Requested scope; the default scope is sent as an empty `scope` parameter.
	pub scope: &'a Scope,
}
impl ClientCredentialsRequest<'_> {
	/// Form fields in wire order.
	pub fn form(&self) -> Vec<(&'static str, String)> {
		vec![
			("client_id", self.client_id.to_owned()),
			("client_secret", self.client_secret.expose().to_owned()),
			("grant_type", "client_credentials".to_owned()),
			("audience", self.audience.to_owned()),
			("scope", self.scope.as_str().to_owned()),
		]
	}
}

/// `{issuer}/.well-known/openid-configuration`, tolerating a trailing slash on the issuer.
pub fn discovery_url(issuer: &Url) -> Result<Url, DiscoveryError> {
	Url::parse(&join_path(issuer.as_str(), DISCOVERY_PATH)).map_err(|source| {
		DiscoveryError::InvalidIssuer { issuer: issuer.to_string(), source }
	})
}

/// Fetches the discovery document and extracts `token_endpoint`.
pub async fn discover_token_endpoint<C>(client: &C, issuer: &Url) -> Result<Url, DiscoveryError>
where
	C: ?Sized + HttpClient,
{
	let url = discovery_url(issuer)?;
	let response = client
		.send(HttpRequest::new(Verb::Get, url))
		.await
		.map_err(|source| DiscoveryError::Unreachable { issuer: issuer.to_string(), source })?;

	interpret_discovery_response(&response)
}

/// Classifies a discovery response.
pub fn interpret_discovery_response(response: &HttpResponse) -> Result<Url, DiscoveryError> {
	if !response.is_success() {
		return Err(DiscoveryError::Status { status: response.status });
	}

	let document: DiscoveryDocument =
		parse_json(&response.body).map_err(DiscoveryError::parse)?;
	let value = document.token_endpoint.ok_or(DiscoveryError::MissingTokenEndpoint)?;

	Url::parse(&value).map_err(|source| DiscoveryError::InvalidTokenEndpoint { value, source })
}

/// Performs the client-credentials grant and returns the issued token value.
pub async fn request_token<C>(
	client: &C,
	token_endpoint: &Url,
	request: &ClientCredentialsRequest<'_>,
) -> Result<Secret, TokenError>
where
	C: ?Sized + HttpClient,
{
	let response = client
		.send(HttpRequest::new(Verb::Post, token_endpoint.clone()).with_form(request.form()))
		.await
		.map_err(|source| TokenError::Unreachable { source })?;

	interpret_token_response(&response)
}

/// Classifies a token endpoint response.
///
/// An OAuth `error` field wins over everything else; a non-success status without one is a
/// status failure; a success without `access_token` is reported as such.
pub fn interpret_token_response(response: &HttpResponse) -> Result<Secret, TokenError> {
	let status = response.status;
	let body: TokenEndpointResponse = match parse_json(&response.body) {
		Ok(body) => body,
		Err(_) if !response.is_success() => return Err(TokenError::Status { status }),
		Err(e) => return Err(TokenError::parse(e, status)),
	};

	if let Some(error) = body.error {
		return Err(TokenError::Rejected { error, description: body.error_description, status });
	}
	if !response.is_success() {
		return Err(TokenError::Status { status });
	}

	body.access_token.map(Secret::new).ok_or(TokenError::MissingAccessToken)
}

fn parse_json<T>(body: &[u8]) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
	T: for<'de> Deserialize<'de>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
}
