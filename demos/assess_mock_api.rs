//! Assesses a mock API whose identity provider and resource server are both served by httpmock,
//! then prints the report exactly as the CLI would.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use authz_assess::{
	assess::Assessor,
	http::ReqwestHttpClient,
	reqwest::{Client, redirect::Policy},
	url::form_urlencoded,
};

const API_KEY: &str = "demo-api-key";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let idp = MockServer::start_async().await;
	let api = MockServer::start_async().await;
	let audience = api.url("/orders");
	let discovery_body = json!({ "token_endpoint": idp.url("/token") }).to_string();

	idp.mock_async(|when, then| {
		when.method(GET).path("/.well-known/openid-configuration");
		then.status(200).header("content-type", "application/json").body(discovery_body);
	})
	.await;

	for scope in ["write", ""] {
		let form = form_urlencoded::Serializer::new(String::new())
			.append_pair("client_id", "demo-client")
			.append_pair("client_secret", "demo-secret")
			.append_pair("grant_type", "client_credentials")
			.append_pair("audience", &audience)
			.append_pair("scope", scope)
			.finish();
		let body = json!({ "access_token": format!("demo-token-{scope}") }).to_string();

		idp.mock_async(|when, then| {
			when.method(POST).path("/token").body(form);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await;
	}

	api.mock_async(|when, then| {
		when.method(GET).path("/orders").header("x-api-key", API_KEY);
		then.status(200).body("[]");
	})
	.await;
	// Accepts any bearer value, so the corrupted-token and wrong-scope probes fail.
	api.mock_async(|when, then| {
		when.method(PUT).path("/orders").header("x-api-key", API_KEY).header_exists("authorization");
		then.status(201);
	})
	.await;

	// httpmock serves TLS with a self-signed certificate.
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(Policy::none())
			.build()?,
	);
	let assessor = <Assessor<ReqwestHttpClient>>::with_http_client(http_client)
		.with_unmapped_path_seed(7);
	let entry = assessor
		.assess_entry(&json!({
			"owner": "demo-team",
			"api_key": API_KEY,
			"api": api.base_url(),
			"resource": "orders",
			"public": ["GET"],
			"authenticated": { "PUT": "write" },
			"iss": idp.base_url(),
			"client_id": "demo-client",
			"client_secret": "demo-secret",
		}))
		.await;

	println!("Processing demo-team");
	println!("{entry}");

	Ok(())
}
