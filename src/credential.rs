//! Client-credentials token acquisition with caching and single-flight guards.
//!
//! [`CredentialStore::get_token`] answers from the cache while the token is fresh (expiry more
//! than the safety margin away). Otherwise it takes the per-key async guard, re-checks the cache,
//! and performs exactly one exchange on behalf of every caller waiting on the same key. A
//! transport failure is retried once; the cache is only written after a successful exchange, so a
//! failed or abandoned refresh leaves the previous entry untouched.

mod cache;
mod metrics;

pub use cache::*;
pub use metrics::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CachedToken, ClientId, ClientSecret, ScopeSet, TenantId},
	error::{AuthenticationError, ConfigError},
	http::HttpTransport,
	oauth::ClientCredentialsExchange,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

/// Identity provider authority: host plus directory tenant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Authority {
	host: Url,
	tenant: TenantId,
}
impl Authority {
	/// Public cloud authority host.
	pub const DEFAULT_HOST: &str = "https://login.microsoftonline.com";

	/// Creates an authority for `tenant` on `host`.
	pub fn new(host: Url, tenant: TenantId) -> Self {
		Self { host, tenant }
	}

	/// Authority host.
	pub fn host(&self) -> &Url {
		&self.host
	}

	/// Directory tenant.
	pub fn tenant(&self) -> &TenantId {
		&self.tenant
	}

	/// Token endpoint `{host}/{tenant}/oauth2/v2.0/token`.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		Url::parse(&format!("{}/oauth2/v2.0/token", self.cache_label()))
			.map_err(|source| ConfigError::InvalidUrl { field: "authority_host", source })
	}

	pub(crate) fn cache_label(&self) -> String {
		format!("{}/{}", self.host.as_str().trim_end_matches('/'), self.tenant)
	}
}

/// Service principal credential used for the client-credentials grant.
#[derive(Clone, Debug)]
pub struct ClientIdentity {
	/// Authority issuing tokens for this principal.
	pub authority: Authority,
	/// Application (client) identifier.
	pub client_id: ClientId,
	/// Client secret; redacted in `Debug`.
	pub client_secret: ClientSecret,
}
impl ClientIdentity {
	/// Bundles the authority and client credential.
	pub fn new(authority: Authority, client_id: ClientId, client_secret: ClientSecret) -> Self {
		Self { authority, client_id, client_secret }
	}
}

/// Process-wide token cache shared by every sub-client of a context.
pub struct CredentialStore {
	transport: Arc<dyn HttpTransport>,
	cache: TokenCache,
	safety_margin: Duration,
	metrics: Arc<TokenMetrics>,
	flow_guards: Mutex<HashMap<TokenKey, Arc<AsyncMutex<()>>>>,
}
impl CredentialStore {
	/// Tokens expiring within this window are refreshed before use.
	pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(60);

	/// Creates an empty store that exchanges credentials over `transport`.
	pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
		Self {
			transport,
			cache: TokenCache::default(),
			safety_margin: Self::DEFAULT_SAFETY_MARGIN,
			metrics: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Overrides the safety margin. Negative values are clamped to zero.
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Returns the configured safety margin.
	pub fn safety_margin(&self) -> Duration {
		self.safety_margin
	}

	/// Returns the acquisition counters.
	pub fn metrics(&self) -> Arc<TokenMetrics> {
		self.metrics.clone()
	}

	/// Returns a bearer token valid for at least the safety margin.
	pub async fn get_token(
		&self,
		identity: &ClientIdentity,
		scope: &ScopeSet,
	) -> Result<AccessToken> {
		const KIND: OperationKind = OperationKind::TokenAcquire;

		let span = OperationSpan::new(KIND, "get_token");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.acquire(identity, scope)).await;

		if result.is_err() {
			self.metrics.record_failure();
		}

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result.map(|token| token.access_token)
	}

	/// Returns the cached entry for the principal and scopes, fresh or not.
	pub fn cached(&self, identity: &ClientIdentity, scope: &ScopeSet) -> Option<CachedToken> {
		self.cache.fetch(&TokenKey::new(&identity.authority, &identity.client_id, scope))
	}

	/// Drops the cached token for the principal and scopes so the next call refetches.
	pub fn invalidate(&self, identity: &ClientIdentity, scope: &ScopeSet) -> bool {
		self.cache.invalidate(&TokenKey::new(&identity.authority, &identity.client_id, scope))
	}

	/// Drops every cached token.
	pub fn clear(&self) {
		self.cache.clear();
	}

	async fn acquire(&self, identity: &ClientIdentity, scope: &ScopeSet) -> Result<CachedToken> {
		let key = TokenKey::new(&identity.authority, &identity.client_id, scope);

		if let Some(token) = self.fresh(&key) {
			return Ok(token);
		}

		let guard = self.flow_guard(&key);
		let _singleflight = guard.lock().await;

		// Another caller may have refreshed while this one waited on the guard.
		if let Some(token) = self.fresh(&key) {
			return Ok(token);
		}

		let exchange = ClientCredentialsExchange::new(identity, self.transport.clone())?;
		let token = match self.exchange_once(&exchange, scope).await {
			Err(AuthenticationError::Unreachable { .. }) => {
				obs::warn_token_retry(&identity.client_id);
				self.metrics.record_retry();

				self.exchange_once(&exchange, scope).await?
			},
			other => other?,
		};

		self.cache.save(key, token.clone());

		Ok(token)
	}

	async fn exchange_once(
		&self,
		exchange: &ClientCredentialsExchange,
		scope: &ScopeSet,
	) -> Result<CachedToken, AuthenticationError> {
		self.metrics.record_fetch();

		exchange.request(scope).await
	}

	fn fresh(&self, key: &TokenKey) -> Option<CachedToken> {
		let token =
			self.cache.fetch_fresh(key, OffsetDateTime::now_utc(), self.safety_margin)?;

		self.metrics.record_cache_hit();

		Some(token)
	}

	fn flow_guard(&self, key: &TokenKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.flow_guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore")
			.field("cached", &self.cache.len())
			.field("safety_margin", &self.safety_margin)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}
