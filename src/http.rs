//! Transport primitives shared by the identity provider exchange and every API call.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack. Requests and responses use
//! the `http` crate types re-exported by `oauth2`, so custom transports (test doubles, proxies,
//! recorded sessions) plug in without touching reqwest. Implementations must be
//! `Send + Sync + 'static` so one transport can be shared by the credential store and all
//! sub-clients through an `Arc<dyn HttpTransport>`.

pub use oauth2::{HttpRequest, HttpResponse, http::Method};

// std
#[cfg(feature = "reqwest")] use std::time::Duration as StdDuration;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one request.
///
/// A returned `Err` means no HTTP response was received. Any response, including 4xx and 5xx,
/// must come back as `Ok` so callers can classify it.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves once the full response body has been read.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Default per-request timeout applied by [`ReqwestTransport::default`].
#[cfg(feature = "reqwest")]
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(120);

/// reqwest-backed [`HttpTransport`].
///
/// Redirects are not followed: token endpoints must answer directly, and API redirects surface
/// to the caller as unexpected statuses instead of being replayed with the bearer token.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with the provided per-request timeout.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.timeout(timeout)
			.user_agent(USER_AGENT)
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestTransport {
	fn default() -> Self {
		// Builder failures only occur when the TLS backend cannot initialize; fall back to the
		// stock client in that case.
		Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
			.unwrap_or_else(|_| Self(ReqwestClient::default()))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(TransportError::from)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// `User-Agent` attached to every outgoing request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
