//! Thread-safe in-memory token cache keyed by authority, client id and scope fingerprint.

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, ClientId, ScopeSet},
	credential::Authority,
};

/// Cache key for one service principal and one normalized scope set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenKey {
	/// Authority host and tenant, rendered as `host/tenant`.
	pub authority: String,
	/// Service principal identifier.
	pub client_id: ClientId,
	/// Fingerprint of the normalized scope set.
	pub scope_fingerprint: String,
}
impl TokenKey {
	/// Builds a key for the provided principal and scopes.
	pub fn new(authority: &Authority, client_id: &ClientId, scope: &ScopeSet) -> Self {
		Self {
			authority: authority.cache_label(),
			client_id: client_id.clone(),
			scope_fingerprint: scope.fingerprint(),
		}
	}
}
impl Display for TokenKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}|{}|{}", self.authority, self.client_id, self.scope_fingerprint)
	}
}

type CacheMap = Arc<RwLock<HashMap<TokenKey, CachedToken>>>;

/// Process-local token cache. Entries are only written after a successful exchange.
#[derive(Clone, Debug, Default)]
pub struct TokenCache(CacheMap);
impl TokenCache {
	/// Returns the entry for `key`, regardless of freshness.
	pub fn fetch(&self, key: &TokenKey) -> Option<CachedToken> {
		self.0.read().get(key).cloned()
	}

	/// Returns the entry for `key` only while it is fresh at `now` given `margin`.
	pub fn fetch_fresh(
		&self,
		key: &TokenKey,
		now: OffsetDateTime,
		margin: Duration,
	) -> Option<CachedToken> {
		self.0.read().get(key).filter(|token| token.is_fresh_at(now, margin)).cloned()
	}

	/// Stores `token` under `key`, replacing any previous entry.
	pub fn save(&self, key: TokenKey, token: CachedToken) {
		self.0.write().insert(key, token);
	}

	/// Removes the entry for `key`. Returns `true` when an entry existed.
	pub fn invalidate(&self, key: &TokenKey) -> bool {
		self.0.write().remove(key).is_some()
	}

	/// Drops every cached token.
	pub fn clear(&self) {
		self.0.write().clear();
	}

	/// Number of cached entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
