//! Shared helpers for integration tests: descriptor fixtures, token form bodies, and an in-process
//! identity provider plus target API that records every request.

#![allow(dead_code)]

// std
use std::collections::{BTreeMap, BTreeSet};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value, json};
// self
use authz_assess::{
	descriptor::Verb,
	http::{HttpClient, HttpFuture, HttpRequest, HttpResponse, ReqwestHttpClient},
	reqwest::{Client, redirect::Policy},
	url::{Url, form_urlencoded},
};

pub const API_KEY: &str = "api-key-123";
pub const CLIENT_ID: &str = "assess-client";
pub const CLIENT_SECRET: &str = "assess-secret";

/// Non-redirecting client that trusts the self-signed certificates of the mock servers.
pub fn test_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// `public = ["GET"]`, `authenticated = { PUT: write, DELETE: admin }`.
pub fn scenario_descriptor(api: &str, iss: &str) -> Value {
	json!({
		"owner": "team-scenario",
		"api_key": API_KEY,
		"api": api,
		"resource": "orders",
		"public": ["GET"],
		"authenticated": { "PUT": "write", "DELETE": "admin" },
		"iss": iss,
		"client_id": CLIENT_ID,
		"client_secret": CLIENT_SECRET,
	})
}

/// Form body the assessor sends for one scope.
pub fn token_form(audience: &str, scope: &str) -> String {
	form_urlencoded::Serializer::new(String::new())
		.append_pair("client_id", CLIENT_ID)
		.append_pair("client_secret", CLIENT_SECRET)
		.append_pair("grant_type", "client_credentials")
		.append_pair("audience", audience)
		.append_pair("scope", scope)
		.finish()
}

/// How the simulated target API enforces scopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiBehavior {
	/// Enforces API key, token validity, scopes, and method exposure.
	Conformant,
	/// Accepts any valid token regardless of scope.
	IgnoresScope,
}

/// In-process identity provider and target API.
///
/// Discovery lives at `https://idp.test/.well-known/openid-configuration`, tokens are issued at
/// `https://idp.test/token` as `tok-{scope}`, and the target API lives at `https://api.test`.
pub struct FakeEnvironment {
	pub behavior: ApiBehavior,
	pub discovery_status: u16,
	pub denied_scopes: BTreeSet<String>,
	pub public: BTreeSet<Verb>,
	pub authenticated: BTreeMap<Verb, String>,
	pub requests: Mutex<Vec<HttpRequest>>,
	issued: Mutex<BTreeMap<String, String>>,
}
impl FakeEnvironment {
	pub const ISSUER: &'static str = "https://idp.test";
	pub const API: &'static str = "https://api.test";

	pub fn scenario(behavior: ApiBehavior) -> Self {
		Self {
			behavior,
			discovery_status: 200,
			denied_scopes: BTreeSet::new(),
			public: BTreeSet::from([Verb::Get]),
			authenticated: BTreeMap::from([
				(Verb::Put, "write".to_owned()),
				(Verb::Delete, "admin".to_owned()),
			]),
			requests: Mutex::new(Vec::new()),
			issued: Mutex::new(BTreeMap::new()),
		}
	}

	pub fn with_discovery_status(mut self, status: u16) -> Self {
		self.discovery_status = status;

		self
	}

	pub fn with_denied_scope(mut self, scope: &str) -> Self {
		self.denied_scopes.insert(scope.to_owned());

		self
	}

	pub fn descriptor(&self) -> Value {
		scenario_descriptor(Self::API, Self::ISSUER)
	}

	pub fn request_count(&self) -> usize {
		self.requests.lock().len()
	}

	pub fn count_host(&self, host: &str) -> usize {
		self.requests
			.lock()
			.iter()
			.filter(|request| request.url.host_str() == Some(host))
			.count()
	}

	pub fn token_requests(&self) -> usize {
		self.requests
			.lock()
			.iter()
			.filter(|request| request.url.path() == "/token")
			.count()
	}

	fn respond(&self, request: &HttpRequest) -> HttpResponse {
		match request.url.host_str() {
			Some("idp.test") => self.identity_provider(request),
			_ => self.target_api(request),
		}
	}

	fn identity_provider(&self, request: &HttpRequest) -> HttpResponse {
		if request.url.path() == "/.well-known/openid-configuration" {
			return response(
				self.discovery_status,
				json!({ "issuer": Self::ISSUER, "token_endpoint": format!("{}/token", Self::ISSUER) }),
			);
		}

		let scope = request
			.form
			.as_ref()
			.and_then(|form| form.iter().find(|(key, _)| *key == "scope"))
			.map(|(_, value)| value.clone())
			.unwrap_or_default();

		if self.denied_scopes.contains(&scope) {
			return response(400, json!({ "error": "invalid_scope" }));
		}

		let token = format!("tok-{scope}");

		self.issued.lock().insert(token.clone(), scope);

		response(200, json!({ "access_token": token, "token_type": "Bearer" }))
	}

	fn target_api(&self, request: &HttpRequest) -> HttpResponse {
		if request.url.path() != "/orders" {
			return status(404);
		}
		if request.header("x-api-key") != Some(API_KEY) {
			return status(403);
		}
		if self.public.contains(&request.method) {
			return status(200);
		}

		let Some(required) = self.authenticated.get(&request.method) else {
			return status(405);
		};
		let Some(token) = request.header("authorization").and_then(|value| value.strip_prefix("Bearer "))
		else {
			return status(401);
		};
		let Some(granted) = self.issued.lock().get(token).cloned()
		else {
			return status(401);
		};

		match self.behavior {
			ApiBehavior::IgnoresScope => status(200),
			ApiBehavior::Conformant if required.is_empty() || *required == granted => status(200),
			ApiBehavior::Conformant => status(403),
		}
	}
}
impl HttpClient for FakeEnvironment {
	fn send(&self, request: HttpRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			let response = self.respond(&request);

			self.requests.lock().push(request);

			Ok(response)
		})
	}
}

fn response(status: u16, body: Value) -> HttpResponse {
	HttpResponse { status, body: body.to_string().into_bytes() }
}

fn status(status: u16) -> HttpResponse {
	HttpResponse { status, body: Vec::new() }
}

/// Parses a URL in tests.
pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Test URL should parse.")
}
