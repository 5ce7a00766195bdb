//! Tracing spans and debug events for operations and API traffic.

// self
use crate::{_prelude::*, http::Method, obs::OperationKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by the credential store and the request envelope.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"fabric_airflow_client.operation",
				operation = kind.as_str(),
				stage
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for an outbound API request. Headers are never logged.
pub fn debug_request(method: &Method, url: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(%method, url, "Sending request.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, url);
	}
}

/// Emits a debug event for an inbound API response.
pub fn debug_response(status: u16, url: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(status, url, "Received response.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (status, url);
	}
}

/// Emits a warning when a token exchange is retried after a transport failure.
pub fn warn_token_retry(client_id: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(client_id, "Token endpoint unreachable; retrying once.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = client_id;
	}
}

/// Emits a debug event when a configuration generation is installed.
pub fn debug_configuration_installed(generation: u64) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(generation, "Configuration installed.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = generation;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OperationSpan::new(OperationKind::TokenAcquire, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn debug_helpers_accept_any_input() {
		debug_request(&Method::GET, "https://example.test/api/v1/dags");
		debug_response(200, "https://example.test/api/v1/dags");
		warn_token_retry("client-test");
		debug_configuration_installed(3);
	}
}
