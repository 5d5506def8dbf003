//! Probe execution against the target API.
//!
//! Probes are issued sequentially by the caller; this module sends exactly one request per probe
//! and grades the observed status. A transport failure the target is responsible for (refused
//! connection, timeout) becomes an error outcome for that probe only. A request that cannot even
//! be built aborts the descriptor.

// self
use crate::{
	_prelude::*,
	error::{self, TransportError},
	http::{HttpClient, HttpRequest},
	matrix::{Bearer, Probe},
	obs::{self, Stage, StageOutcome, StageSpan},
	report::{self, Outcome},
};

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Builds the request for one probe.
///
/// The bearer value is sent verbatim, so a corrupted or empty token still produces an
/// `Authorization: Bearer <value>` header.
pub fn build_request(probe: &Probe) -> HttpRequest {
	let mut request = HttpRequest::new(probe.verb, probe.url.clone()).status_only();

	if let Some(api_key) = &probe.api_key {
		request = request.with_header(API_KEY_HEADER, api_key.expose());
	}
	if let Bearer::Token(token) = &probe.bearer {
		request = request.with_header(AUTHORIZATION_HEADER, format!("Bearer {}", token.expose()));
	}

	request
}

/// Sends one probe and returns the observed status.
pub async fn send<C>(client: &C, probe: &Probe) -> Result<u16, TransportError>
where
	C: ?Sized + HttpClient,
{
	let response = client.send(build_request(probe)).await?;

	Ok(response.status)
}

/// Executes and grades one probe.
///
/// A probe whose token is unavailable is graded as an error without any request. Only a request
/// that cannot be built escapes as [`Error::Unexpected`].
pub async fn execute<C>(client: &C, owner: &str, probe: &Probe) -> Result<Outcome>
where
	C: ?Sized + HttpClient,
{
	const STAGE: Stage = Stage::Probe;

	let observed = match &probe.bearer {
		Bearer::Unavailable { reason, .. } => Err(reason.clone()),
		_ => {
			let span = StageSpan::new(STAGE, owner);

			obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

			match span.instrument(send(client, probe)).await {
				Ok(status) => {
					obs::record_stage_outcome(STAGE, StageOutcome::Success);

					Ok(status)
				},
				Err(e) if e.is_probe_local() => {
					obs::record_stage_outcome(STAGE, StageOutcome::Failure);

					Err(error::render_chain(&e))
				},
				Err(e) => {
					obs::record_stage_outcome(STAGE, StageOutcome::Failure);

					return Err(Error::unexpected(format!(
						"probe `{}` could not be sent: {}",
						probe.description,
						error::render_chain(&e)
					)));
				},
			}
		},
	};
	let outcome = report::classify(probe.label(), observed, &probe.expected);

	obs::record_probe_outcome(probe.kind, outcome.verdict());

	if let Outcome::Pass { observed, flagged: true, .. } = &outcome {
		obs::probe_diverged(owner, &probe.description, *observed);
	}

	Ok(outcome)
}
