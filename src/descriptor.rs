//! Typed representation of one API's declarative authorization contract.
//!
//! Descriptors are only ever produced by [`validate`], which turns the raw JSON input into an
//! [`ApiDescriptor`] or a [`ConfigError`](crate::error::ConfigError) listing every violation.

/// Descriptor validation.
pub mod validate;
/// The fixed verb enumeration.
pub mod verb;

pub use validate::*;
pub use verb::*;

// self
use crate::{
	_prelude::*,
	auth::{Scope, Secret},
};

/// OAuth 2.0 client configuration; present iff the descriptor exposes authenticated methods.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthClient {
	/// Issuer URL whose discovery document advertises the token endpoint.
	pub issuer: Url,
	/// Client identifier for the client-credentials grant.
	pub client_id: String,
	/// Client secret for the client-credentials grant.
	pub client_secret: Secret,
	/// Explicit audience override.
	pub audience: Option<String>,
}

/// Validated, read-only input for one assessment run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiDescriptor {
	/// Identifies the submission.
	pub owner: String,
	/// Static API key sent as `x-api-key`.
	pub api_key: Secret,
	/// Base URL exactly as supplied.
	pub base_url: String,
	/// Resource path exactly as supplied.
	pub resource: String,
	/// `{base_url}/{resource}`, parsed.
	pub resource_url: Url,
	/// Methods callable with the API key alone.
	pub public: BTreeSet<Verb>,
	/// Methods requiring a bearer token, mapped to the required scope.
	pub authenticated: BTreeMap<Verb, Scope>,
	/// OAuth client, `Some` iff `authenticated` is non-empty.
	pub oauth: Option<OAuthClient>,
}
impl ApiDescriptor {
	/// Audience requested for every token: the explicit override, else `{base_url}/{resource}`.
	pub fn audience(&self) -> String {
		self.oauth
			.as_ref()
			.and_then(|client| client.audience.clone())
			.unwrap_or_else(|| join_path(&self.base_url, &self.resource))
	}

	/// Verbs that are neither public nor authenticated.
	pub fn forbidden_verbs(&self) -> Vec<Verb> {
		Verb::ALL
			.into_iter()
			.filter(|verb| !self.public.contains(verb) && !self.authenticated.contains_key(verb))
			.collect()
	}

	/// Distinct scopes needing a token: every non-empty required scope in verb order, then the
	/// default scope. Empty when no method is authenticated.
	pub fn distinct_scopes(&self) -> Vec<Scope> {
		if self.authenticated.is_empty() {
			return Vec::new();
		}

		let mut scopes = Vec::new();

		for scope in self.authenticated.values() {
			if !scope.is_default() && !scopes.contains(scope) {
				scopes.push(scope.clone());
			}
		}

		scopes.push(Scope::default());

		scopes
	}
}

/// Joins a base URL and a path with exactly one `/` between them.
pub(crate) fn join_path(base: &str, path: &str) -> String {
	format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn scenario() -> ApiDescriptor {
		validate(&json!({
			"owner": "team-7",
			"api_key": "key",
			"api": "https://api.example.com/",
			"resource": "/orders",
			"public": ["GET"],
			"authenticated": { "PUT": "write", "DELETE": "admin" },
			"iss": "https://idp.example.com/",
			"client_id": "cid",
			"client_secret": "secret",
		}))
		.expect("Scenario descriptor should validate.")
	}

	#[test]
	fn forbidden_verbs_exclude_public_and_authenticated() {
		assert_eq!(scenario().forbidden_verbs(), vec![Verb::Patch, Verb::Post, Verb::Head]);
	}

	#[test]
	fn distinct_scopes_end_with_default() {
		let scopes = scenario().distinct_scopes();

		assert_eq!(scopes, vec![Scope::new("write"), Scope::new("admin"), Scope::default()]);
	}

	#[test]
	fn audience_defaults_to_resource_endpoint() {
		let mut descriptor = scenario();

		assert_eq!(descriptor.audience(), "https://api.example.com/orders");

		if let Some(client) = descriptor.oauth.as_mut() {
			client.audience = Some("urn:orders".into());
		}

		assert_eq!(descriptor.audience(), "urn:orders");
	}
}
