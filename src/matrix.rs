//! Conformance matrix derivation.
//!
//! [`MatrixPlan::new`] is pure: it turns a validated descriptor into the ordered probe
//! specifications and the distinct scopes needing tokens. [`MatrixBuilder::build`] then acquires
//! every token up front (acquire-then-fan-out) and materializes the [`Probe`]s. A probe whose
//! token could not be acquired keeps the failure as its bearer and is recorded as an error
//! without touching the network.
//!
//! The matrix exercises three orthogonal axes: authentication (token present, absent, or
//! corrupt), authorization by API key (present or absent), and scoping (correct or incorrect
//! scope).

pub mod policy;

pub use policy::*;

// crates.io
use rand::{Rng, SeedableRng, distr::Alphanumeric, rngs::StdRng};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Scope, Secret},
	cache::TokenCache,
	descriptor::{ApiDescriptor, Verb, join_path},
	error::{self, TokenError},
	http::HttpClient,
	report::ProbeLabel,
};

/// Length of the random segment used by the unmapped-path probe.
pub const UNMAPPED_PATH_LEN: usize = 16;

/// What a probe is checking; selects the expected-status contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
	/// Fully valid credentials.
	Allowed,
	/// Valid credentials except the API key.
	MissingApiKey,
	/// Authenticated method called without a bearer token.
	MissingToken,
	/// Authenticated method called with a truncated token.
	CorruptedToken,
	/// Scoped method called with a token for another scope.
	WrongScope,
	/// Unscoped method called with a token for some other scope.
	AnyScope,
	/// Method outside the descriptor.
	ForbiddenMethod,
	/// Path outside the descriptor.
	UnmappedPath,
}
impl ProbeKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProbeKind::Allowed => "allowed",
			ProbeKind::MissingApiKey => "missing_api_key",
			ProbeKind::MissingToken => "missing_token",
			ProbeKind::CorruptedToken => "corrupted_token",
			ProbeKind::WrongScope => "wrong_scope",
			ProbeKind::AnyScope => "any_scope",
			ProbeKind::ForbiddenMethod => "forbidden_method",
			ProbeKind::UnmappedPath => "unmapped_path",
		}
	}
}
impl Display for ProbeKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Bearer credential a probe presents, by scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
	/// No `Authorization` header.
	None,
	/// The token issued for the scope.
	Token(Scope),
	/// The token issued for the scope, minus its final character.
	CorruptedToken(Scope),
}
impl Credential {
	fn describe(&self) -> String {
		match self {
			Self::None => "no token".into(),
			Self::Token(scope) => format!("token for {}", scope.label()),
			Self::CorruptedToken(scope) => format!("corrupted token for {}", scope.label()),
		}
	}
}

/// Token-independent description of one probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeSpec {
	/// What the probe checks.
	pub kind: ProbeKind,
	/// Request method.
	pub verb: Verb,
	/// Target URL.
	pub url: Url,
	/// Whether the valid API key is sent.
	pub api_key: bool,
	/// Bearer credential.
	pub credential: Credential,
	/// Scope the method requires, for authenticated methods.
	pub scope: Option<Scope>,
	/// Scopes whose tokens must exist for the probe to run.
	pub depends_on: Vec<Scope>,
	/// Expected-status contract.
	pub expected: StatusContract,
	/// Human-readable description.
	pub description: String,
}

/// Knobs that shape the matrix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatrixOptions {
	/// Expected-status contracts per probe kind.
	pub policy: StatusPolicy,
	/// Seed for the unmapped-path probe; `None` disables it.
	pub unmapped_path_seed: Option<u64>,
}

/// Ordered probe specifications plus the scopes they need, derived without I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatrixPlan {
	/// Distinct scopes to acquire, default scope last.
	pub scopes: Vec<Scope>,
	/// Probe specifications in execution order.
	pub specs: Vec<ProbeSpec>,
}
impl MatrixPlan {
	/// Derives the full matrix for a validated descriptor.
	pub fn new(descriptor: &ApiDescriptor, options: &MatrixOptions) -> Self {
		let mut planner = Planner { descriptor, policy: &options.policy, specs: Vec::new() };
		let scopes = descriptor.distinct_scopes();
		let authenticated = !descriptor.authenticated.is_empty();

		for verb in &descriptor.public {
			planner.push(ProbeKind::Allowed, *verb, None, true, Credential::None, &[], "public");
			planner.push(ProbeKind::MissingApiKey, *verb, None, false, Credential::None, &[], "public");
		}
		for (verb, scope) in &descriptor.authenticated {
			planner.plan_authenticated(*verb, scope, &scopes);
		}

		let default_token = |deps: &mut Vec<Scope>| {
			if authenticated {
				deps.push(Scope::default());

				Credential::Token(Scope::default())
			} else {
				Credential::None
			}
		};

		for verb in descriptor.forbidden_verbs() {
			let mut deps = Vec::new();
			let credential = default_token(&mut deps);

			planner.push(
				ProbeKind::ForbiddenMethod,
				verb,
				None,
				true,
				credential,
				&deps,
				"method not exposed",
			);
		}

		if let Some(url) = options.unmapped_path_seed.and_then(|seed| unmapped_url(descriptor, seed)) {
			let mut deps = Vec::new();
			let credential = default_token(&mut deps);

			planner.push_at(
				ProbeKind::UnmappedPath,
				Verb::Get,
				url,
				None,
				true,
				credential,
				&deps,
				"unmapped path",
			);
		}

		Self { scopes, specs: planner.specs }
	}

	/// Number of probes.
	pub fn len(&self) -> usize {
		self.specs.len()
	}

	/// Returns true when the plan holds no probe.
	pub fn is_empty(&self) -> bool {
		self.specs.is_empty()
	}
}

struct Planner<'a> {
	descriptor: &'a ApiDescriptor,
	policy: &'a StatusPolicy,
	specs: Vec<ProbeSpec>,
}
impl Planner<'_> {
	fn plan_authenticated(&mut self, verb: Verb, scope: &Scope, scopes: &[Scope]) {
		let required = Some(scope);
		let note = format!("requires {}", scope.label());
		let deps = [scope.clone()];

		self.push(ProbeKind::Allowed, verb, required, true, Credential::Token(scope.clone()), &deps, &note);
		self.push(
			ProbeKind::MissingApiKey,
			verb,
			required,
			false,
			Credential::Token(scope.clone()),
			&deps,
			&note,
		);
		self.push(ProbeKind::MissingToken, verb, required, true, Credential::None, &deps, &note);
		self.push(
			ProbeKind::CorruptedToken,
			verb,
			required,
			true,
			Credential::CorruptedToken(scope.clone()),
			&deps,
			&note,
		);

		// An unscoped method must accept any valid token; a scoped one must reject every other.
		let kind = if scope.is_default() { ProbeKind::AnyScope } else { ProbeKind::WrongScope };

		for other in scopes.iter().filter(|other| *other != scope) {
			let deps = [scope.clone(), other.clone()];

			self.push(kind, verb, required, true, Credential::Token(other.clone()), &deps, &note);
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn push(
		&mut self,
		kind: ProbeKind,
		verb: Verb,
		scope: Option<&Scope>,
		api_key: bool,
		credential: Credential,
		depends_on: &[Scope],
		note: &str,
	) {
		let url = self.descriptor.resource_url.clone();

		self.push_at(kind, verb, url, scope, api_key, credential, depends_on, note);
	}

	#[allow(clippy::too_many_arguments)]
	fn push_at(
		&mut self,
		kind: ProbeKind,
		verb: Verb,
		url: Url,
		scope: Option<&Scope>,
		api_key: bool,
		credential: Credential,
		depends_on: &[Scope],
		note: &str,
	) {
		let description = format!(
			"{verb} {url} ({note}) {}, {}",
			if api_key { "with API key" } else { "without API key" },
			credential.describe(),
		);

		self.specs.push(ProbeSpec {
			kind,
			verb,
			url,
			api_key,
			credential,
			scope: scope.cloned(),
			depends_on: depends_on.to_vec(),
			expected: self.policy.contract(kind).clone(),
			description,
		});
	}
}

/// Bearer a materialized probe presents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Bearer {
	/// No `Authorization` header.
	None,
	/// `Authorization: Bearer <token>`; the value may be corrupted or empty on purpose.
	Token(Secret),
	/// A token the probe depends on could not be acquired; the probe is not sent.
	Unavailable {
		/// Scope whose token is missing.
		scope: Scope,
		/// Rendered acquisition failure.
		reason: String,
	},
}

/// Immutable, executable probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Probe {
	/// What the probe checks.
	pub kind: ProbeKind,
	/// Request method.
	pub verb: Verb,
	/// Target URL.
	pub url: Url,
	/// API key to send, if any.
	pub api_key: Option<Secret>,
	/// Bearer credential.
	pub bearer: Bearer,
	/// Scope the method requires, for messages.
	pub scope: Option<Scope>,
	/// Expected-status contract.
	pub expected: StatusContract,
	/// Human-readable description.
	pub description: String,
}
impl Probe {
	/// Identity of the probe as reported in outcomes.
	pub fn label(&self) -> ProbeLabel {
		ProbeLabel {
			kind: self.kind,
			verb: self.verb,
			url: self.url.to_string(),
			scope: self.scope.clone(),
			description: self.description.clone(),
		}
	}

	fn materialize(
		spec: ProbeSpec,
		api_key: &Secret,
		tokens: &HashMap<Scope, Result<AccessToken, TokenError>>,
	) -> Self {
		let missing = spec.depends_on.iter().find_map(|scope| match tokens.get(scope) {
			Some(Ok(_)) => None,
			Some(Err(e)) => Some(Bearer::Unavailable {
				scope: scope.clone(),
				reason: format!("token for {} unavailable: {}", scope.label(), error::render_chain(e)),
			}),
			None => Some(Bearer::Unavailable {
				scope: scope.clone(),
				reason: format!("no token was requested for {}", scope.label()),
			}),
		});
		let token = |scope: &Scope| tokens.get(scope).and_then(|slot| slot.as_ref().ok());
		let bearer = match (missing, &spec.credential) {
			(Some(unavailable), _) => unavailable,
			(None, Credential::None) => Bearer::None,
			(None, Credential::Token(scope)) => token(scope)
				.map(|token| Bearer::Token(token.secret.clone()))
				.unwrap_or_else(|| unrequested(scope)),
			(None, Credential::CorruptedToken(scope)) => token(scope)
				.map(|token| Bearer::Token(token.corrupted()))
				.unwrap_or_else(|| unrequested(scope)),
		};

		Self {
			kind: spec.kind,
			verb: spec.verb,
			url: spec.url,
			api_key: spec.api_key.then(|| api_key.clone()),
			bearer,
			scope: spec.scope,
			expected: spec.expected,
			description: spec.description,
		}
	}
}

/// Acquires tokens and materializes the probes of a plan.
pub struct MatrixBuilder<'a, C>
where
	C: ?Sized + HttpClient,
{
	descriptor: &'a ApiDescriptor,
	cache: Option<&'a TokenCache<C>>,
}
impl<'a, C> MatrixBuilder<'a, C>
where
	C: ?Sized + HttpClient,
{
	/// Creates a builder; `cache` must be `Some` whenever the descriptor authenticates methods.
	pub fn new(descriptor: &'a ApiDescriptor, cache: Option<&'a TokenCache<C>>) -> Self {
		Self { descriptor, cache }
	}

	/// Acquires every scope of the plan, then materializes each specification in order.
	pub async fn build(self, plan: MatrixPlan) -> Vec<Probe> {
		let tokens = match self.cache {
			Some(cache) => cache.acquire_all(&plan.scopes).await,
			None => HashMap::new(),
		};

		plan.specs
			.into_iter()
			.map(|spec| Probe::materialize(spec, &self.descriptor.api_key, &tokens))
			.collect()
	}
}

fn unrequested(scope: &Scope) -> Bearer {
	Bearer::Unavailable {
		scope: scope.clone(),
		reason: format!("no token was requested for {}", scope.label()),
	}
}

fn unmapped_url(descriptor: &ApiDescriptor, seed: u64) -> Option<Url> {
	let segment = StdRng::seed_from_u64(seed)
		.sample_iter(Alphanumeric)
		.take(UNMAPPED_PATH_LEN)
		.map(char::from)
		.collect::<String>();

	Url::parse(&join_path(&descriptor.base_url, &segment)).ok()
}
