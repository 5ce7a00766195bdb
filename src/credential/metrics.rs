//! Token acquisition counters.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token acquisition.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	fetches: AtomicU64,
	cache_hits: AtomicU64,
	failures: AtomicU64,
	retries: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of token requests sent to the identity provider (retries included).
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Returns the number of calls answered from the cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of calls that ended in an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of retries issued after transport failures.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}
}
