//! Structural validation of raw descriptor JSON.
//!
//! Validation never stops at the first problem: every violation is collected, in the order the
//! checks run, and reported together. Success yields the typed [`ApiDescriptor`].

// self
use crate::{
	_prelude::*,
	auth::{Scope, Secret},
	descriptor::{ApiDescriptor, OAuthClient, Verb, join_path},
	error::ConfigError,
};

type JsonMap = serde_json::Map<String, Value>;

/// Validation outcome: the typed descriptor or every detected violation.
pub type ValidationResult = Result<ApiDescriptor, ConfigError>;

/// One structural problem found in a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Violation {
	/// Descriptor is not a JSON object.
	#[error("descriptor must be a JSON object")]
	NotAnObject,
	/// Mandatory field is absent or `null`.
	#[error("{field} not set")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// Field is present with the wrong JSON type.
	#[error("{field} must be {expected}")]
	WrongType {
		/// Field name.
		field: &'static str,
		/// Expected JSON shape.
		expected: &'static str,
	},
	/// Neither `public` nor `authenticated` is present.
	#[error("at least one of public or authenticated must be set")]
	NoMethods,
	/// `public` is an empty array.
	#[error("public must list at least one method")]
	EmptyPublic,
	/// `authenticated` is an empty object.
	#[error("authenticated must map at least one method")]
	EmptyAuthenticated,
	/// Entry is not one of the recognized verbs.
	#[error("{field} contains unrecognized method `{verb}`")]
	UnknownVerb {
		/// Field name.
		field: &'static str,
		/// Offending entry.
		verb: String,
	},
	/// Scope value in `authenticated` is not a string.
	#[error("authenticated scope for `{verb}` must be a string")]
	ScopeNotString {
		/// Verb key whose value is wrong.
		verb: String,
	},
	/// `authenticated` names the same verb twice under different spellings.
	#[error("{field} declares {verb} more than once")]
	DuplicateVerb {
		/// Field name.
		field: &'static str,
		/// Verb declared twice.
		verb: Verb,
	},
	/// Field cannot be sent as an HTTP header value.
	#[error("{field} contains characters not allowed in an HTTP header value")]
	InvalidHeaderValue {
		/// Field name.
		field: &'static str,
	},
	/// A verb is declared both public and authenticated.
	#[error("{verb} is declared both public and authenticated")]
	ConflictingVerb {
		/// Verb declared twice.
		verb: Verb,
	},
	/// Field does not hold an absolute http(s) URL.
	#[error("{field} `{value}` is not a valid http(s) URL: {reason}")]
	InvalidUrl {
		/// Field name.
		field: &'static str,
		/// Offending value.
		value: String,
		/// Parser or scheme complaint.
		reason: String,
	},
}

/// Ordered list of violations rendered as `a; b; c`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);
impl Violations {
	/// Iterator over the violations in detection order.
	pub fn iter(&self) -> impl Iterator<Item = &Violation> {
		self.0.iter()
	}

	/// Number of violations.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when nothing was detected.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Display for Violations {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		for (idx, violation) in self.0.iter().enumerate() {
			if idx > 0 {
				f.write_str("; ")?;
			}

			Display::fmt(violation, f)?;
		}

		Ok(())
	}
}

/// Validates raw descriptor JSON and parses it into an [`ApiDescriptor`].
///
/// Checks run in this order: mandatory fields (`owner`, `api_key` and whether it is a valid
/// header value, `api`, `resource`, plus `iss`, `client_id`, `client_secret` whenever
/// `authenticated` is present), the optional `audience`, presence of `public` or
/// `authenticated`, the entries of each (including verbs spelled twice), verbs declared both
/// public and authenticated, and finally the URLs.
pub fn validate(value: &Value) -> ValidationResult {
	let Some(map) = value.as_object() else {
		return Err(invalid(None, vec![Violation::NotAnObject]));
	};
	let mut violations = Vec::new();
	let owner = required_str(map, "owner", &mut violations);
	let api_key = required_str(map, "api_key", &mut violations);

	if api_key.is_some_and(|api_key| !is_header_value(api_key)) {
		violations.push(Violation::InvalidHeaderValue { field: "api_key" });
	}

	let api = required_str(map, "api", &mut violations);
	let resource = required_str(map, "resource", &mut violations);
	let public_raw = present(map, "public");
	let authenticated_raw = present(map, "authenticated");
	let (iss, client_id, client_secret) = if authenticated_raw.is_some() {
		(
			required_str(map, "iss", &mut violations),
			required_str(map, "client_id", &mut violations),
			required_str(map, "client_secret", &mut violations),
		)
	} else {
		(None, None, None)
	};
	let audience = optional_str(map, "audience", &mut violations);

	if public_raw.is_none() && authenticated_raw.is_none() {
		violations.push(Violation::NoMethods);
	}

	let public = public_raw.map(|raw| parse_public(raw, &mut violations)).unwrap_or_default();
	let authenticated = authenticated_raw
		.map(|raw| parse_authenticated(raw, &mut violations))
		.unwrap_or_default();

	for verb in public.iter().filter(|verb| authenticated.contains_key(*verb)) {
		violations.push(Violation::ConflictingVerb { verb: *verb });
	}

	let base_url = api.and_then(|api| parse_http_url("api", api, &mut violations));
	let issuer = iss.and_then(|iss| parse_http_url("iss", iss, &mut violations));
	let resource_url = match (api, resource, base_url.as_ref()) {
		(Some(api), Some(resource), Some(_)) =>
			parse_http_url("resource", &join_path(api, resource), &mut violations),
		_ => None,
	};

	if !violations.is_empty() {
		return Err(invalid(owner, violations));
	}

	let (Some(owner), Some(api_key), Some(api), Some(resource), Some(resource_url)) =
		(owner, api_key, api, resource, resource_url)
	else {
		return Err(invalid(owner, vec![Violation::MissingField { field: "owner" }]));
	};
	let oauth = match (issuer, client_id, client_secret) {
		(Some(issuer), Some(client_id), Some(client_secret)) if !authenticated.is_empty() =>
			Some(OAuthClient {
				issuer,
				client_id: client_id.to_owned(),
				client_secret: Secret::new(client_secret),
				audience: audience.map(str::to_owned),
			}),
		_ => None,
	};

	Ok(ApiDescriptor {
		owner: owner.to_owned(),
		api_key: Secret::new(api_key),
		base_url: api.to_owned(),
		resource: resource.to_owned(),
		resource_url,
		public,
		authenticated,
		oauth,
	})
}

fn invalid(owner: Option<&str>, violations: Vec<Violation>) -> ConfigError {
	ConfigError::InvalidDescriptor {
		owner: owner.map(str::to_owned),
		violations: Violations(violations),
	}
}

fn present<'a>(map: &'a JsonMap, field: &str) -> Option<&'a Value> {
	map.get(field).filter(|value| !value.is_null())
}

fn required_str<'a>(
	map: &'a JsonMap,
	field: &'static str,
	violations: &mut Vec<Violation>,
) -> Option<&'a str> {
	match present(map, field) {
		None => {
			violations.push(Violation::MissingField { field });

			None
		},
		Some(value) => expect_str(value, field, violations),
	}
}

fn optional_str<'a>(
	map: &'a JsonMap,
	field: &'static str,
	violations: &mut Vec<Violation>,
) -> Option<&'a str> {
	present(map, field).and_then(|value| expect_str(value, field, violations))
}

fn expect_str<'a>(
	value: &'a Value,
	field: &'static str,
	violations: &mut Vec<Violation>,
) -> Option<&'a str> {
	let text = value.as_str();

	if text.is_none() {
		violations.push(Violation::WrongType { field, expected: "a string" });
	}

	text
}

fn parse_public(raw: &Value, violations: &mut Vec<Violation>) -> BTreeSet<Verb> {
	let Some(entries) = raw.as_array() else {
		violations.push(Violation::WrongType { field: "public", expected: "an array of methods" });

		return BTreeSet::new();
	};

	if entries.is_empty() {
		violations.push(Violation::EmptyPublic);
	}

	let mut public = BTreeSet::new();

	for entry in entries {
		match entry.as_str().map(Verb::from_str) {
			Some(Ok(verb)) => {
				public.insert(verb);
			},
			Some(Err(unknown)) =>
				violations.push(Violation::UnknownVerb { field: "public", verb: unknown.0 }),
			None => violations.push(Violation::UnknownVerb { field: "public", verb: entry.to_string() }),
		}
	}

	public
}

fn parse_authenticated(raw: &Value, violations: &mut Vec<Violation>) -> BTreeMap<Verb, Scope> {
	let Some(entries) = raw.as_object() else {
		violations.push(Violation::WrongType {
			field: "authenticated",
			expected: "an object mapping methods to scopes",
		});

		return BTreeMap::new();
	};

	if entries.is_empty() {
		violations.push(Violation::EmptyAuthenticated);
	}

	let mut authenticated = BTreeMap::new();

	for (key, value) in entries {
		let verb = key.parse::<Verb>();
		let scope = value.as_str();

		if let Err(unknown) = &verb {
			violations
				.push(Violation::UnknownVerb { field: "authenticated", verb: unknown.0.clone() });
		}
		if scope.is_none() {
			violations.push(Violation::ScopeNotString { verb: key.clone() });
		}
		if let (Ok(verb), Some(scope)) = (verb, scope) {
			// Verbs parse case-insensitively, so `PUT` and `put` collide here.
			if authenticated.insert(verb, Scope::new(scope)).is_some() {
				violations.push(Violation::DuplicateVerb { field: "authenticated", verb });
			}
		}
	}

	authenticated
}

#[cfg(feature = "reqwest")]
fn is_header_value(value: &str) -> bool {
	reqwest::header::HeaderValue::from_str(value).is_ok()
}

// Same rule as `http::HeaderValue`: tab or any byte from 0x20 upward except DEL.
#[cfg(not(feature = "reqwest"))]
fn is_header_value(value: &str) -> bool {
	value.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f))
}

fn parse_http_url(field: &'static str, value: &str, violations: &mut Vec<Violation>) -> Option<Url> {
	let reason = match Url::parse(value) {
		Ok(url) if matches!(url.scheme(), "http" | "https") => return Some(url),
		Ok(url) => format!("scheme `{}` is not http or https", url.scheme()),
		Err(e) => e.to_string(),
	};

	violations.push(Violation::InvalidUrl { field, value: value.to_owned(), reason });

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn violations_of(value: Value) -> Vec<Violation> {
		match validate(&value).expect_err("Descriptor should be rejected.") {
			ConfigError::InvalidDescriptor { violations, .. } => violations.0,
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn public_only_descriptor_validates() {
		let descriptor = validate(&json!({
			"owner": "team-1",
			"api_key": "key",
			"api": "https://api.example.com",
			"resource": "items",
			"public": ["get", "POST", "GET"],
		}))
		.expect("Public-only descriptor should validate.");

		assert_eq!(descriptor.public, BTreeSet::from([Verb::Get, Verb::Post]));
		assert!(descriptor.authenticated.is_empty());
		assert!(descriptor.oauth.is_none());
		assert_eq!(descriptor.resource_url.as_str(), "https://api.example.com/items");
	}

	#[test]
	fn every_violation_is_collected() {
		let violations = violations_of(json!({
			"api_key": 42,
			"api": "https://api.example.com",
			"authenticated": { "GET": "read", "OPTIONS": "x", "PUT": 7 },
		}));

		assert_eq!(violations, vec![
			Violation::MissingField { field: "owner" },
			Violation::WrongType { field: "api_key", expected: "a string" },
			Violation::MissingField { field: "resource" },
			Violation::MissingField { field: "iss" },
			Violation::MissingField { field: "client_id" },
			Violation::MissingField { field: "client_secret" },
			Violation::UnknownVerb { field: "authenticated", verb: "OPTIONS".into() },
			Violation::ScopeNotString { verb: "PUT".into() },
		]);
	}

	#[test]
	fn methods_are_required() {
		let violations = violations_of(json!({
			"owner": "team-2",
			"api_key": "key",
			"api": "https://api.example.com",
			"resource": "items",
			"public": null,
		}));

		assert_eq!(violations, vec![Violation::NoMethods]);
	}

	#[test]
	fn empty_collections_and_unknown_verbs_are_rejected() {
		let violations = violations_of(json!({
			"owner": "team-3",
			"api_key": "key",
			"api": "https://api.example.com",
			"resource": "items",
			"public": [],
			"authenticated": {},
			"iss": "https://idp.example.com",
			"client_id": "cid",
			"client_secret": "secret",
		}));

		assert_eq!(violations, vec![Violation::EmptyPublic, Violation::EmptyAuthenticated]);

		let violations = violations_of(json!({
			"owner": "team-3",
			"api_key": "key",
			"api": "https://api.example.com",
			"resource": "items",
			"public": ["GET", "TRACE", 1],
		}));

		assert_eq!(violations, vec![
			Violation::UnknownVerb { field: "public", verb: "TRACE".into() },
			Violation::UnknownVerb { field: "public", verb: "1".into() },
		]);
	}

	#[test]
	fn conflicting_verbs_and_bad_urls_are_rejected() {
		let violations = violations_of(json!({
			"owner": "team-4",
			"api_key": "key",
			"api": "ftp://api.example.com",
			"resource": "items",
			"public": ["GET"],
			"authenticated": { "GET": "" },
			"iss": "not a url",
			"client_id": "cid",
			"client_secret": "secret",
		}));

		assert_eq!(violations.len(), 3);
		assert_eq!(violations[0], Violation::ConflictingVerb { verb: Verb::Get });
		assert!(matches!(violations[1], Violation::InvalidUrl { field: "api", .. }));
		assert!(matches!(violations[2], Violation::InvalidUrl { field: "iss", .. }));
	}

	#[test]
	fn api_keys_must_be_sendable_as_headers() {
		let violations = violations_of(json!({
			"owner": "team-7",
			"api_key": "bad\nkey",
			"api": "https://api.example.com",
			"resource": "items",
			"public": ["GET"],
		}));

		assert_eq!(violations, vec![Violation::InvalidHeaderValue { field: "api_key" }]);
		assert!(
			validate(&json!({
				"owner": "team-7",
				"api_key": "key with\tspaces",
				"api": "https://api.example.com",
				"resource": "items",
				"public": ["GET"],
			}))
			.is_ok()
		);
	}

	#[test]
	fn verbs_spelled_twice_are_rejected() {
		let violations = violations_of(json!({
			"owner": "team-8",
			"api_key": "key",
			"api": "https://api.example.com",
			"resource": "items",
			"authenticated": { "PUT": "write", "put": "admin" },
			"iss": "https://idp.example.com",
			"client_id": "cid",
			"client_secret": "secret",
		}));

		assert_eq!(violations, vec![Violation::DuplicateVerb {
			field: "authenticated",
			verb: Verb::Put,
		}]);
	}

	#[test]
	fn non_objects_are_rejected_with_owner_when_known() {
		assert_eq!(violations_of(json!(["GET"])), vec![Violation::NotAnObject]);

		let err = validate(&json!({ "owner": "team-5" })).expect_err("Descriptor is incomplete.");

		assert_eq!(
			err.to_string(),
			"Descriptor for `team-5` is invalid: api_key not set; api not set; resource not set; \
			 at least one of public or authenticated must be set.",
		);
	}

	#[test]
	fn authenticated_descriptor_carries_oauth_client() {
		let descriptor = validate(&json!({
			"owner": "team-6",
			"api_key": "key",
			"api": "https://api.example.com",
			"resource": "items",
			"authenticated": { "DELETE": "admin", "GET": "" },
			"iss": "https://idp.example.com/",
			"client_id": "cid",
			"client_secret": "secret",
			"audience": "urn:items",
		}))
		.expect("Authenticated descriptor should validate.");
		let client = descriptor.oauth.as_ref().expect("OAuth client should be configured.");

		assert_eq!(client.issuer.as_str(), "https://idp.example.com/");
		assert_eq!(client.client_secret.expose(), "secret");
		assert_eq!(descriptor.audience(), "urn:items");
		assert_eq!(descriptor.authenticated.get(&Verb::Get), Some(&Scope::default()));
		assert_eq!(descriptor.authenticated.get(&Verb::Delete), Some(&Scope::new("admin")));
	}
}
