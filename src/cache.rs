//! Per-run token cache with memoized discovery and one token request per scope.
//!
//! [`TokenCache::get_token`] never requests the same scope twice within a run, the default scope
//! included, and it memoizes failures as well as successes: a scope that failed once stays
//! failed. Discovery runs on the first token request and its outcome (endpoint or error) is
//! reused for every later scope, so a discovery failure aborts all subsequent acquisition. A
//! per-scope singleflight guard lets concurrent callers share one in-flight request.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Scope, Secret},
	descriptor::{ApiDescriptor, OAuthClient},
	error::{DiscoveryError, TokenError},
	http::HttpClient,
	obs::{self, Stage, StageOutcome, StageSpan},
	oidc::{self, ClientCredentialsRequest},
};

/// Outcome of acquiring one scope, memoized for the whole run.
pub type TokenSlot = Result<AccessToken, TokenError>;

/// Memoized OAuth 2.0 client-credentials tokens for one assessment run.
pub struct TokenCache<C>
where
	C: ?Sized + HttpClient,
{
	http_client: Arc<C>,
	owner: String,
	issuer: Url,
	client_id: String,
	client_secret: Secret,
	audience: String,
	token_endpoint: AsyncMutex<Option<Result<Url, DiscoveryError>>>,
	tokens: Mutex<HashMap<Scope, TokenSlot>>,
	scope_guards: Mutex<HashMap<Scope, Arc<AsyncMutex<()>>>>,
}
impl<C> TokenCache<C>
where
	C: ?Sized + HttpClient,
{
	/// Creates an empty cache for one OAuth client.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		owner: impl Into<String>,
		client: &OAuthClient,
		audience: impl Into<String>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			owner: owner.into(),
			issuer: client.issuer.clone(),
			client_id: client.client_id.clone(),
			client_secret: client.client_secret.clone(),
			audience: audience.into(),
			token_endpoint: AsyncMutex::new(None),
			tokens: Default::default(),
			scope_guards: Default::default(),
		}
	}

	/// Creates a cache for the descriptor, or `None` when it exposes no authenticated method.
	pub fn for_descriptor(http_client: impl Into<Arc<C>>, descriptor: &ApiDescriptor) -> Option<Self> {
		descriptor
			.oauth
			.as_ref()
			.map(|client| Self::new(http_client, &descriptor.owner, client, descriptor.audience()))
	}

	/// Audience sent with every token request.
	pub fn audience(&self) -> &str {
		&self.audience
	}

	/// Returns the token endpoint, performing discovery on first use.
	pub async fn token_endpoint(&self) -> Result<Url, DiscoveryError> {
		let mut slot = self.token_endpoint.lock().await;

		if let Some(cached) = slot.as_ref() {
			return cached.clone();
		}

		const STAGE: Stage = Stage::Discovery;

		let span = StageSpan::new(STAGE, &self.owner);

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span
			.instrument(oidc::discover_token_endpoint(self.http_client.as_ref(), &self.issuer))
			.await;

		match &result {
			Ok(_) => obs::record_stage_outcome(STAGE, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(STAGE, StageOutcome::Failure),
		}

		*slot = Some(result.clone());

		result
	}

	/// Returns the token for `scope`, requesting it at most once per run.
	pub async fn get_token(&self, scope: &Scope) -> Result<AccessToken, TokenError> {
		if let Some(cached) = self.cached(scope) {
			return cached;
		}

		let guard = self.scope_guard(scope);
		let _singleflight = guard.lock().await;

		if let Some(cached) = self.cached(scope) {
			return cached;
		}

		const STAGE: Stage = Stage::TokenAcquisition;

		let span = StageSpan::new(STAGE, &self.owner);

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span.instrument(self.acquire(scope)).await;

		match &result {
			Ok(token) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Success);
				obs::token_acquired(&self.owner, scope, &token.secret.fingerprint());
			},
			Err(e) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);
				obs::token_failed(&self.owner, scope, e);
			},
		}

		self.tokens.lock().insert(scope.clone(), result.clone());

		result
	}

	/// Acquires every scope in order and returns the per-scope results.
	///
	/// All acquisition happens before any probe is issued; failures are kept per scope and do not
	/// stop the remaining scopes.
	pub async fn acquire_all(&self, scopes: &[Scope]) -> HashMap<Scope, TokenSlot> {
		let mut acquired = HashMap::with_capacity(scopes.len());

		for scope in scopes {
			acquired.insert(scope.clone(), self.get_token(scope).await);
		}

		acquired
	}

	/// Number of distinct scopes requested so far, successful or not.
	pub fn requested_scopes(&self) -> usize {
		self.tokens.lock().len()
	}

	async fn acquire(&self, scope: &Scope) -> TokenSlot {
		let endpoint = self
			.token_endpoint()
			.await
			.map_err(|source| TokenError::DiscoveryFailed { source })?;
		let request = ClientCredentialsRequest {
			client_id: &self.client_id,
			client_secret: &self.client_secret,
			audience: &self.audience,
			scope,
		};
		let secret = oidc::request_token(self.http_client.as_ref(), &endpoint, &request).await?;

		Ok(AccessToken::new(scope.clone(), secret))
	}

	fn cached(&self, scope: &Scope) -> Option<TokenSlot> {
		self.tokens.lock().get(scope).cloned()
	}

	fn scope_guard(&self, scope: &Scope) -> Arc<AsyncMutex<()>> {
		let mut guards = self.scope_guards.lock();

		guards.entry(scope.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl<C> Debug for TokenCache<C>
where
	C: ?Sized + HttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("owner", &self.owner)
			.field("issuer", &self.issuer.as_str())
			.field("client_id", &self.client_id)
			.field("audience", &self.audience)
			.field("requested_scopes", &self.requested_scopes())
			.finish()
	}
}
