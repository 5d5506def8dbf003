//! Assessment orchestration: validate, plan, acquire, execute, aggregate.
//!
//! [`Assessor`] owns the HTTP transport and the matrix options. Each phase returns its own value
//! (descriptor, plan, probes, outcomes) and the assessor folds them into an
//! [`AssessmentResult`]. Batches never stop at a failing descriptor.

// self
use crate::{
	_prelude::*,
	cache::TokenCache,
	descriptor::{self, ApiDescriptor},
	error::ConfigError,
	http::HttpClient,
	matrix::{MatrixBuilder, MatrixOptions, MatrixPlan, StatusPolicy},
	obs::{self, Stage, StageOutcome, StageSpan},
	probe,
	report::{AssessmentResult, Verdict},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Runs conformance assessments over a shared transport.
pub struct Assessor<C>
where
	C: ?Sized + HttpClient,
{
	http_client: Arc<C>,
	options: MatrixOptions,
}
#[cfg(feature = "reqwest")]
impl Assessor<ReqwestHttpClient> {
	/// Creates an assessor backed by a default [`ReqwestHttpClient`].
	pub fn new() -> Result<Self> {
		Ok(Self::with_http_client(ReqwestHttpClient::new()?))
	}
}
impl<C> Assessor<C>
where
	C: ?Sized + HttpClient,
{
	/// Creates an assessor over a caller-provided transport.
	pub fn with_http_client(http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), options: MatrixOptions::default() }
	}

	/// Replaces the expected-status policy.
	pub fn with_policy(mut self, policy: StatusPolicy) -> Self {
		self.options.policy = policy;

		self
	}

	/// Enables the unmapped-path probe, deriving its path from `seed`.
	pub fn with_unmapped_path_seed(mut self, seed: u64) -> Self {
		self.options.unmapped_path_seed = Some(seed);

		self
	}

	/// Options applied to every matrix.
	pub fn options(&self) -> &MatrixOptions {
		&self.options
	}

	/// Validates a raw descriptor, then assesses it.
	pub async fn assess_value(&self, value: &Value) -> Result<AssessmentResult> {
		let descriptor = validate(value)?;

		self.assess(&descriptor).await
	}

	/// Assesses a validated descriptor.
	///
	/// Probe-local failures become error outcomes; only an unexpected failure is returned as
	/// `Err`.
	pub async fn assess(&self, descriptor: &ApiDescriptor) -> Result<AssessmentResult> {
		const STAGE: Stage = Stage::Assessment;

		let span = StageSpan::new(STAGE, &descriptor.owner);

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span.instrument(self.run(descriptor)).await;

		match &result {
			Ok(result) if result.verdict() == Verdict::Pass =>
				obs::record_stage_outcome(STAGE, StageOutcome::Success),
			_ => obs::record_stage_outcome(STAGE, StageOutcome::Failure),
		}

		result
	}

	/// Assesses one raw descriptor, capturing an abort instead of returning it.
	pub async fn assess_entry(&self, value: &Value) -> BatchEntry {
		match self.assess_value(value).await {
			Ok(result) => BatchEntry::Assessed(result),
			Err(error) => {
				let owner = value.get("owner").and_then(Value::as_str).map(str::to_owned);

				obs::descriptor_aborted(owner.as_deref(), &error);

				BatchEntry::Aborted { owner, error }
			},
		}
	}

	/// Assesses every descriptor in order; an aborted descriptor never stops the batch.
	pub async fn assess_batch(&self, values: &[Value]) -> BatchReport {
		let mut entries = Vec::with_capacity(values.len());

		for value in values {
			entries.push(self.assess_entry(value).await);
		}

		BatchReport { entries }
	}

	async fn run(&self, descriptor: &ApiDescriptor) -> Result<AssessmentResult> {
		let started_at = OffsetDateTime::now_utc();
		let plan = MatrixPlan::new(descriptor, &self.options);
		let cache = TokenCache::<C>::for_descriptor(self.http_client.clone(), descriptor);
		let probes = MatrixBuilder::new(descriptor, cache.as_ref()).build(plan).await;
		let mut outcomes = Vec::with_capacity(probes.len());

		for probe in &probes {
			outcomes.push(probe::execute(self.http_client.as_ref(), &descriptor.owner, probe).await?);
		}

		Ok(AssessmentResult {
			owner: descriptor.owner.clone(),
			outcomes,
			started_at,
			finished_at: OffsetDateTime::now_utc(),
		})
	}
}
impl<C> Debug for Assessor<C>
where
	C: ?Sized + HttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Assessor").field("options", &self.options).finish()
	}
}

/// Result of one descriptor within a batch.
#[derive(Debug)]
pub enum BatchEntry {
	/// The matrix ran to completion.
	Assessed(AssessmentResult),
	/// The descriptor was rejected or its assessment aborted.
	Aborted {
		/// Owner, when the raw descriptor carried one.
		owner: Option<String>,
		/// Abort reason.
		error: Error,
	},
}
impl BatchEntry {
	/// Owner of the descriptor, when known.
	pub fn owner(&self) -> Option<&str> {
		match self {
			Self::Assessed(result) => Some(&result.owner),
			Self::Aborted { owner, .. } => owner.as_deref(),
		}
	}

	/// Verdict of the entry; an aborted descriptor fails.
	pub fn verdict(&self) -> Verdict {
		match self {
			Self::Assessed(result) => result.verdict(),
			Self::Aborted { .. } => Verdict::Fail,
		}
	}
}
impl Display for BatchEntry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Assessed(result) => write!(f, "{result}"),
			Self::Aborted { error, .. } =>
				write!(f, "error: {}\n{}", crate::error::render_chain(error), Verdict::Fail),
		}
	}
}

/// Ordered entries of a batch run.
#[derive(Debug)]
pub struct BatchReport {
	/// One entry per input descriptor, in input order.
	pub entries: Vec<BatchEntry>,
}
impl BatchReport {
	/// Pass iff every descriptor passed.
	pub fn verdict(&self) -> Verdict {
		if self.entries.iter().all(|entry| entry.verdict() == Verdict::Pass) {
			Verdict::Pass
		} else {
			Verdict::Fail
		}
	}
}

fn validate(value: &Value) -> Result<ApiDescriptor, ConfigError> {
	const STAGE: Stage = Stage::Validation;

	let owner = value.get("owner").and_then(Value::as_str).unwrap_or_default();
	let _span = StageSpan::new(STAGE, owner).entered();

	obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

	let result = descriptor::validate(value);

	match &result {
		Ok(_) => obs::record_stage_outcome(STAGE, StageOutcome::Success),
		Err(_) => obs::record_stage_outcome(STAGE, StageOutcome::Failure),
	}

	result
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		http::{HttpFuture, HttpRequest, HttpResponse},
		report::Outcome,
	};

	#[derive(Default)]
	struct StaticApi {
		calls: AtomicUsize,
	}
	impl HttpClient for StaticApi {
		fn send(&self, request: HttpRequest) -> HttpFuture<'_> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				let status = if request.url.path() == "/orders" { 200 } else { 404 };

				Ok(HttpResponse { status, body: Vec::new() })
			})
		}
	}

	#[tokio::test]
	async fn invalid_descriptors_abort_without_network_calls() {
		let assessor = Assessor::<StaticApi>::with_http_client(StaticApi::default());
		let entry = assessor.assess_entry(&json!({ "owner": "team-1", "api_key": "key" })).await;

		assert!(matches!(
			&entry,
			BatchEntry::Aborted {
				owner: Some(owner),
				error: Error::Config(ConfigError::InvalidDescriptor { .. }),
			} if owner == "team-1"
		));
		assert_eq!(entry.verdict(), Verdict::Fail);
		assert_eq!(assessor.http_client.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn unsendable_api_key_is_rejected_before_discovery() {
		let assessor = Assessor::<StaticApi>::with_http_client(StaticApi::default());
		let err = assessor
			.assess_value(&json!({
				"owner": "team-4",
				"api_key": "bad\nkey",
				"api": "https://api.example.com",
				"resource": "orders",
				"authenticated": { "PUT": "write" },
				"iss": "https://idp.example.com",
				"client_id": "cid",
				"client_secret": "secret",
			}))
			.await
			.expect_err("Header-unsafe API key should be rejected.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidDescriptor { ref violations, .. })
				if violations.iter().any(|violation| matches!(
					violation,
					descriptor::Violation::InvalidHeaderValue { field: "api_key" }
				))
		));
		assert_eq!(assessor.http_client.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn public_only_descriptor_runs_every_probe() {
		let assessor = Assessor::<StaticApi>::with_http_client(StaticApi::default())
			.with_unmapped_path_seed(42);
		let result = assessor
			.assess_value(&json!({
				"owner": "team-2",
				"api_key": "key",
				"api": "https://api.example.com",
				"resource": "orders",
				"public": ["GET"],
			}))
			.await
			.expect("Public-only descriptor should be assessed.");

		// 2 public + 5 forbidden + 1 unmapped path.
		assert_eq!(result.total(), 8);
		assert_eq!(assessor.http_client.calls.load(Ordering::SeqCst), 8);
		assert!(matches!(result.outcomes[0], Outcome::Pass { observed: 200, .. }));
		// The fake ignores the missing API key, so that probe fails.
		assert!(matches!(result.outcomes[1], Outcome::Fail { observed: 200, .. }));
		assert!(matches!(result.outcomes[7], Outcome::Pass { observed: 404, .. }));
		assert_eq!(result.verdict(), Verdict::Fail);
	}

	#[tokio::test]
	async fn batches_continue_past_aborted_descriptors() {
		let assessor = Assessor::<StaticApi>::with_http_client(StaticApi::default());
		let report = assessor
			.assess_batch(&[
				json!("not an object"),
				json!({
					"owner": "team-3",
					"api_key": "key",
					"api": "https://api.example.com",
					"resource": "orders",
					"public": ["GET"],
				}),
			])
			.await;

		assert_eq!(report.entries.len(), 2);
		assert!(matches!(report.entries[0], BatchEntry::Aborted { owner: None, .. }));
		assert_eq!(report.entries[1].owner(), Some("team-3"));
		assert_eq!(report.verdict(), Verdict::Fail);
	}
}
