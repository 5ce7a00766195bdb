//! Client-credentials exchange against the identity provider's token endpoint.

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, ClientId as OAuthClientId, ClientSecret as OAuthClientSecret,
	EndpointNotSet, EndpointSet, HttpClientError, RequestTokenError, Scope, TokenResponse,
	TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{CachedToken, CachedTokenBuilderError, ScopeSet},
	credential::ClientIdentity,
	error::{AuthenticationError, ConfigError, TransportError},
	http::{HttpRequest, HttpResponse, HttpTransport},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type HandleFuture<'c> = Pin<
	Box<dyn Future<Output = Result<HttpResponse, HttpClientError<TransportError>>> + 'c + Send>,
>;

/// Lifetime assumed when the token response omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::HOUR;

/// Records the HTTP status of the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
struct StatusSlot(Arc<Mutex<Option<u16>>>);
impl StatusSlot {
	fn store(&self, status: u16) {
		*self.0.lock() = Some(status);
	}

	fn take(&self) -> Option<u16> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] adapter that routes `oauth2` requests through an [`HttpTransport`].
#[derive(Clone)]
struct TransportHandle {
	transport: Arc<dyn HttpTransport>,
	slot: StatusSlot,
}
impl<'c> AsyncHttpClient<'c> for TransportHandle {
	type Error = HttpClientError<TransportError>;
	type Future = HandleFuture<'c>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response = self.transport.send(request).await.map_err(Box::new)?;

			self.slot.store(response.status().as_u16());

			Ok(response)
		})
	}
}

/// Client-credentials grant bound to one service principal and token endpoint.
pub(crate) struct ClientCredentialsExchange {
	oauth_client: ConfiguredBasicClient,
	handle: TransportHandle,
}
impl ClientCredentialsExchange {
	pub(crate) fn new(
		identity: &ClientIdentity,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::from_url(identity.authority.token_endpoint()?);
		let oauth_client = BasicClient::new(OAuthClientId::new(identity.client_id.to_string()))
			.set_client_secret(OAuthClientSecret::new(identity.client_secret.expose().to_owned()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		let handle = TransportHandle { transport, slot: StatusSlot::default() };

		Ok(Self { oauth_client, handle })
	}

	/// Performs one token request. Transport failures map to
	/// [`AuthenticationError::Unreachable`]; the caller owns the retry decision.
	pub(crate) async fn request(
		&self,
		scope: &ScopeSet,
	) -> Result<CachedToken, AuthenticationError> {
		let request = self
			.oauth_client
			.exchange_client_credentials()
			.add_scopes(scope.iter().map(|value| Scope::new(value.to_owned())));
		let response = request
			.request_async(&self.handle)
			.await
			.map_err(|err| map_request_error(self.handle.slot.take(), err))?;
		let expires_in = match response.expires_in() {
			Some(lifetime) => {
				let secs = i64::try_from(lifetime.as_secs())
					.map_err(|_| AuthenticationError::InvalidExpiry)?;

				if secs <= 0 {
					return Err(AuthenticationError::InvalidExpiry);
				}

				Duration::seconds(secs)
			},
			None => DEFAULT_TOKEN_LIFETIME,
		};

		CachedToken::builder(scope.clone())
			.access_token(response.access_token().secret().to_owned())
			.issued_at(OffsetDateTime::now_utc())
			.expires_in(expires_in)
			.build()
			.map_err(|err| match err {
				CachedTokenBuilderError::ExpiryOutOfRange => AuthenticationError::InvalidExpiry,
				other => AuthenticationError::MalformedResponse {
					message: other.to_string(),
					status: None,
				},
			})
	}
}

fn map_request_error(
	status: Option<u16>,
	err: BasicRequestTokenError<HttpClientError<TransportError>>,
) -> AuthenticationError {
	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(status, response),
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(error, _body) => classify_unparsed(status, error.to_string()),
		RequestTokenError::Other(message) => classify_unparsed(status, message),
	}
}

fn map_server_response(status: Option<u16>, response: BasicErrorResponse) -> AuthenticationError {
	let code = response.error().as_ref().to_string();
	let reason = response.error_description().cloned().unwrap_or_else(|| code.clone());

	AuthenticationError::Rejected { reason, oauth_error: Some(code), status }
}

fn map_transport_error(err: HttpClientError<TransportError>) -> AuthenticationError {
	let source: Box<dyn StdError + Send + Sync> = match err {
		HttpClientError::Reqwest(inner) => inner,
		HttpClientError::Http(inner) => Box::new(inner),
		HttpClientError::Io(inner) => Box::new(inner),
		HttpClientError::Other(message) => message.into(),
		_ => "unknown transport failure".into(),
	};

	AuthenticationError::Unreachable { source }
}

// Bodies that are not OAuth error documents still reject the credential on 400/401/403.
fn classify_unparsed(status: Option<u16>, message: String) -> AuthenticationError {
	match status {
		Some(400 | 401 | 403) =>
			AuthenticationError::Rejected { reason: message, oauth_error: None, status },
		_ => AuthenticationError::MalformedResponse { message, status },
	}
}
