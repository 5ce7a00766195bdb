//! Cached access tokens and their freshness rules.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
};

/// Freshness of a cached token relative to an instant and a safety margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token may be attached to outgoing requests.
	Fresh,
	/// Token is still valid but expires inside the safety margin; refresh before use.
	Stale,
	/// Token exceeded its expiry instant.
	Expired,
}

/// Errors produced by [`CachedTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CachedTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the relative expiry lands outside the representable date range.
	#[error("Expiry is out of range.")]
	ExpiryOutOfRange,
}

/// Access token owned by the credential store for one scope set.
///
/// Sub-clients only ever receive clones of [`CachedToken::access_token`]; the record itself
/// never leaves the store.
#[derive(Clone)]
pub struct CachedToken {
	/// Normalized scopes the token was requested for.
	pub scope: ScopeSet,
	/// Bearer token; callers must avoid logging it.
	pub access_token: AccessToken,
	/// Instant the token response was received.
	pub issued_at: OffsetDateTime,
	/// Instant the provider declared the token expired.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Returns a builder for constructing cache entries.
	pub fn builder(scope: ScopeSet) -> CachedTokenBuilder {
		CachedTokenBuilder::new(scope)
	}

	/// Computes freshness at `instant`, treating the last `margin` of the lifetime as stale.
	pub fn status_at(&self, instant: OffsetDateTime, margin: Duration) -> TokenStatus {
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}
		if instant >= self.expires_at - margin {
			return TokenStatus::Stale;
		}

		TokenStatus::Fresh
	}

	/// Returns `true` while `instant < expires_at - margin`.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		matches!(self.status_at(instant, margin), TokenStatus::Fresh)
	}

	/// Remaining lifetime at `instant` (negative once expired).
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("scope", &self.scope)
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`CachedToken`].
#[derive(Clone, Debug)]
pub struct CachedTokenBuilder {
	scope: ScopeSet,
	access_token: Option<AccessToken>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CachedTokenBuilder {
	fn new(scope: ScopeSet) -> Self {
		Self { scope, access_token: None, issued_at: None, expires_at: None, expires_in: None }
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(AccessToken::new(token));

		self
	}

	/// Consumes the builder and produces a [`CachedToken`].
	pub fn build(self) -> Result<CachedToken, CachedTokenBuilderError> {
		let access_token = self.access_token.ok_or(CachedTokenBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(CachedTokenBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(CachedTokenBuilderError::MissingExpiry),
		};

		Ok(CachedToken { scope: self.scope, access_token, issued_at, expires_at })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn token(expires: OffsetDateTime) -> CachedToken {
		let scope = ScopeSet::from_str("https://api.fabric.microsoft.com/.default")
			.expect("Fabric scope should parse.");

		CachedToken::builder(scope)
			.access_token("bearer")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(expires)
			.build()
			.expect("Cached token builder should succeed.")
	}

	#[test]
	fn safety_margin_marks_tail_of_lifetime_stale() {
		let record = token(macros::datetime!(2025-01-01 01:00 UTC));
		let margin = Duration::seconds(60);

		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:58 UTC), margin),
			TokenStatus::Fresh
		);
		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:59 UTC), margin),
			TokenStatus::Stale
		);
		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 01:00 UTC), margin),
			TokenStatus::Expired
		);
		assert!(!record.is_fresh_at(macros::datetime!(2025-01-01 00:59:30 UTC), margin));
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let scope = ScopeSet::from_str("scope").expect("Scope should parse.");
		let record = CachedToken::builder(scope)
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Relative expiry should build.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
		assert_eq!(
			record.remaining_at(macros::datetime!(2025-01-01 00:10 UTC)),
			Duration::minutes(20)
		);
	}

	#[test]
	fn builder_requires_token_and_expiry() {
		let scope = ScopeSet::default();

		assert_eq!(
			CachedToken::builder(scope.clone()).expires_in(Duration::MINUTE).build().err(),
			Some(CachedTokenBuilderError::MissingAccessToken)
		);
		assert_eq!(
			CachedToken::builder(scope).access_token("t").build().err(),
			Some(CachedTokenBuilderError::MissingExpiry)
		);
	}

	#[test]
	fn builder_rejects_expiry_past_the_calendar() {
		let scope = ScopeSet::from_str("scope").expect("Scope should parse.");
		let result = CachedToken::builder(scope)
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::seconds(9_000_000_000_000_000))
			.build();

		assert_eq!(result.err(), Some(CachedTokenBuilderError::ExpiryOutOfRange));
	}

	#[test]
	fn debug_redacts_token() {
		let record = token(macros::datetime!(2025-01-01 01:00 UTC));

		assert!(!format!("{record:?}").contains("bearer"));
	}
}
