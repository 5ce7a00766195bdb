//! The request primitive every sub-client funnels through.

// std
use std::borrow::Cow;
// crates.io
use oauth2::http::{HeaderMap, HeaderName, HeaderValue, header};
// self
use crate::{
	_prelude::*,
	api::{ApiRequest, ApiResponse, RequestBody, envelope},
	auth::ScopeSet,
	credential::{ClientIdentity, CredentialStore},
	error::{ApiError, ApiErrorKind, ConfigError},
	http::{HttpRequest, HttpResponse, HttpTransport, USER_AGENT},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

const REQUEST_ID_HEADERS: [&str; 4] =
	["x-request-id", "x-ms-request-id", "request-id", "x-correlation-id"];

/// Where the request-correlation identifier of an error response is looked up first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestIdLookup {
	/// Headers, then the body's `requestId`/`request_id`.
	#[default]
	HeadersFirst,
	/// The body's `requestId`/`request_id`, then headers. Fabric APIs report it in the body.
	BodyFirst,
}

/// Authenticated HTTP client bound to one base URL and one OAuth scope set.
///
/// Cloning is cheap; clones share the same state and compare equal under [`ApiClient::ptr_eq`].
#[derive(Clone)]
pub struct ApiClient(Arc<ApiClientInner>);
struct ApiClientInner {
	transport: Arc<dyn HttpTransport>,
	credentials: Arc<CredentialStore>,
	identity: ClientIdentity,
	scope: ScopeSet,
	base_url: String,
	preview: bool,
	debug: bool,
	request_id_lookup: RequestIdLookup,
}
impl ApiClient {
	/// Starts building a client for `base_url`.
	pub fn builder(
		transport: Arc<dyn HttpTransport>,
		credentials: Arc<CredentialStore>,
		identity: ClientIdentity,
		scope: ScopeSet,
		base_url: impl Into<String>,
	) -> ApiClientBuilder {
		ApiClientBuilder {
			transport,
			credentials,
			identity,
			scope,
			base_url: base_url.into(),
			preview: false,
			debug: false,
			request_id_lookup: RequestIdLookup::default(),
		}
	}

	/// Base URL with trailing slashes removed.
	pub fn base_url(&self) -> &str {
		&self.0.base_url
	}

	/// Scope set requested for this client's bearer tokens.
	pub fn scope(&self) -> &ScopeSet {
		&self.0.scope
	}

	/// Service principal this client authenticates as.
	pub fn identity(&self) -> &ClientIdentity {
		&self.0.identity
	}

	/// Shared credential store.
	pub fn credentials(&self) -> &Arc<CredentialStore> {
		&self.0.credentials
	}

	/// Whether `preview=true` is appended to every call.
	pub fn is_preview_enabled(&self) -> bool {
		self.0.preview
	}

	/// Whether outbound requests are logged at debug level.
	pub fn is_debug(&self) -> bool {
		self.0.debug
	}

	/// Returns `true` when both handles share the same client state.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	/// Attaches a bearer token, sends `request`, and classifies the response.
	///
	/// Any 2xx status yields an [`ApiResponse`]. Other statuses become [`ApiError`] classified by
	/// [`ApiErrorKind::from_status`] unless the request opted out with
	/// [`ApiRequest::allow_error_status`]. A transport failure yields an [`ApiError`] without
	/// status.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OperationKind = OperationKind::ApiRequest;

		let span = OperationSpan::new(KIND, "execute");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.send(request)).await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	/// `GET path`.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.execute(ApiRequest::get(path)).await
	}

	/// `POST path` with a JSON body.
	pub async fn post_json<T>(&self, path: impl Into<String>, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.execute(ApiRequest::post(path).json(to_json(body)?)).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put_json<T>(&self, path: impl Into<String>, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.execute(ApiRequest::put(path).json(to_json(body)?)).await
	}

	/// `PATCH path` with a JSON body.
	pub async fn patch_json<T>(&self, path: impl Into<String>, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.execute(ApiRequest::patch(path).json(to_json(body)?)).await
	}

	/// `DELETE path`.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.execute(ApiRequest::delete(path)).await
	}

	/// Full URL for `request`, including the preview flag.
	pub fn url_for(&self, request: &ApiRequest) -> Result<Url, ConfigError> {
		let raw = format!("{}/{}", self.0.base_url, request.path.trim_start_matches('/'));
		let mut url = Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidUrl { field: "base_url", source })?;
		let mut query = request
			.query
			.iter()
			.filter(|(key, _)| !(self.0.preview && key == "preview"))
			.peekable();

		if query.peek().is_some() || self.0.preview {
			let mut pairs = url.query_pairs_mut();

			for (key, value) in query {
				pairs.append_pair(key, value);
			}
			if self.0.preview {
				pairs.append_pair("preview", "true");
			}
		}

		Ok(url)
	}

	async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let url = self.url_for(&request)?;
		let token = self.0.credentials.get_token(&self.0.identity, &self.0.scope).await?;
		let http_request = build_http_request(&request, &url, token.expose())?;

		if self.0.debug {
			obs::debug_request(&request.method, url.as_str());
		}

		let response = self.0.transport.send(http_request).await.map_err(ApiError::transport)?;
		let status = response.status().as_u16();

		if self.0.debug {
			obs::debug_response(status, url.as_str());
		}
		if request.raise_for_status && !(200..300).contains(&status) {
			return Err(error_from_response(response, self.0.request_id_lookup).into());
		}

		Ok(ApiResponse::from_http(response, request.stream))
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.0.base_url)
			.field("scope", &self.0.scope)
			.field("client_id", &self.0.identity.client_id)
			.field("preview", &self.0.preview)
			.field("debug", &self.0.debug)
			.finish_non_exhaustive()
	}
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
	transport: Arc<dyn HttpTransport>,
	credentials: Arc<CredentialStore>,
	identity: ClientIdentity,
	scope: ScopeSet,
	base_url: String,
	preview: bool,
	debug: bool,
	request_id_lookup: RequestIdLookup,
}
impl ApiClientBuilder {
	/// Appends `preview=true` to every call.
	pub fn preview(mut self, enabled: bool) -> Self {
		self.preview = enabled;

		self
	}

	/// Logs outbound method/URL and inbound status at debug level.
	pub fn debug(mut self, enabled: bool) -> Self {
		self.debug = enabled;

		self
	}

	/// Sets where error responses are searched for a request id.
	pub fn request_id_lookup(mut self, lookup: RequestIdLookup) -> Self {
		self.request_id_lookup = lookup;

		self
	}

	/// Validates the base URL and produces the client.
	pub fn build(self) -> Result<ApiClient, ConfigError> {
		let base_url = self.base_url.trim_end_matches('/').to_owned();

		Url::parse(&base_url)
			.map_err(|source| ConfigError::InvalidUrl { field: "base_url", source })?;

		Ok(ApiClient(Arc::new(ApiClientInner {
			transport: self.transport,
			credentials: self.credentials,
			identity: self.identity,
			scope: self.scope,
			base_url,
			preview: self.preview,
			debug: self.debug,
			request_id_lookup: self.request_id_lookup,
		})))
	}
}

pub(crate) fn to_json<T>(body: &T) -> Result<serde_json::Value, ConfigError>
where
	T: ?Sized + Serialize,
{
	Ok(serde_json::to_value(body)?)
}

fn build_http_request(
	request: &ApiRequest,
	url: &Url,
	token: &str,
) -> Result<HttpRequest, ConfigError> {
	let (default_content_type, body) = match &request.body {
		RequestBody::Empty => (Cow::Borrowed("application/json"), Vec::new()),
		RequestBody::Json(value) => (Cow::Borrowed("application/json"), serde_json::to_vec(value)?),
		RequestBody::Bytes { content_type, data } => (content_type.clone(), data.clone()),
	};
	let mut headers = HeaderMap::new();

	for (name, value) in &request.headers {
		headers.append(header_name(name)?, header_value(name, value)?);
	}
	if !request.has_header("accept") {
		headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
	}
	if !request.has_header("content-type") {
		headers.insert(header::CONTENT_TYPE, header_value("content-type", &default_content_type)?);
	}
	if !request.has_header("user-agent") {
		headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
	}

	let mut authorization = header_value("authorization", &format!("Bearer {token}"))?;

	authorization.set_sensitive(true);
	headers.insert(header::AUTHORIZATION, authorization);

	let mut http_request = HttpRequest::new(body);

	*http_request.method_mut() = request.method.clone();
	*http_request.uri_mut() = url
		.as_str()
		.parse()
		.map_err(|err| ConfigError::HttpRequest(oauth2::http::Error::from(err)))?;
	*http_request.headers_mut() = headers;

	Ok(http_request)
}

fn header_name(name: &str) -> Result<HeaderName, ConfigError> {
	HeaderName::from_bytes(name.as_bytes())
		.map_err(|_| ConfigError::InvalidHeader { name: name.to_owned() })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
	HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { name: name.to_owned() })
}

/// Classifies a non-success response, keeping its body and headers.
pub(crate) fn error_from_response(response: HttpResponse, lookup: RequestIdLookup) -> ApiError {
	let status = response.status().as_u16();
	let headers = envelope::collect_headers(&response);
	let body = response.into_body();
	let json = serde_json::from_slice::<serde_json::Value>(&body).ok();
	let message = error_message(status, json.as_ref(), &body);
	let request_id = match lookup {
		RequestIdLookup::BodyFirst =>
			body_request_id(json.as_ref()).or_else(|| header_request_id(&headers)),
		RequestIdLookup::HeadersFirst =>
			header_request_id(&headers).or_else(|| body_request_id(json.as_ref())),
	};

	ApiError {
		kind: ApiErrorKind::from_status(status),
		status: Some(status),
		message,
		request_id,
		body: if body.is_empty() { None } else { Some(body) },
		headers,
		source: None,
	}
}

fn error_message(status: u16, json: Option<&serde_json::Value>, raw: &[u8]) -> String {
	if let Some(json) = json {
		let field = |name: &str| json.get(name).and_then(|value| value.as_str()).map(str::to_owned);
		let nested_error = || {
			json.get("error")
				.and_then(|error| error.get("message"))
				.and_then(|value| value.as_str())
				.map(str::to_owned)
		};

		return field("description")
			.or_else(|| field("message"))
			.or_else(|| field("error"))
			.or_else(nested_error)
			.filter(|message| !message.is_empty())
			.unwrap_or_else(|| json.to_string());
	}

	let text = String::from_utf8_lossy(raw);

	if text.trim().is_empty() { format!("HTTP {status}") } else { text.into_owned() }
}

fn body_request_id(json: Option<&serde_json::Value>) -> Option<String> {
	let json = json?;

	["requestId", "request_id"]
		.into_iter()
		.filter_map(|key| json.get(key).and_then(|value| value.as_str()))
		.find(|value| !value.is_empty())
		.map(str::to_owned)
}

fn header_request_id(headers: &BTreeMap<String, String>) -> Option<String> {
	REQUEST_ID_HEADERS
		.into_iter()
		.filter_map(|name| headers.get(name))
		.find(|value| !value.is_empty())
		.cloned()
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use super::*;

	fn response(status: u16, headers: &[(&'static str, &'static str)], body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Status should be valid.");

		for (name, value) in headers {
			response
				.headers_mut()
				.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
		}

		response
	}

	#[test]
	fn message_prefers_description_then_message_then_error() {
		let err = error_from_response(
			response(400, &[], r#"{"message":"m","description":"d"}"#),
			RequestIdLookup::BodyFirst,
		);

		assert_eq!(err.kind, ApiErrorKind::Validation);
		assert_eq!(err.message, "d");

		let err = error_from_response(
			response(409, &[], r#"{"error":"conflict"}"#),
			RequestIdLookup::BodyFirst,
		);

		assert_eq!(err.kind, ApiErrorKind::Client);
		assert_eq!(err.message, "conflict");

		let err = error_from_response(
			response(400, &[], r#"{"error":{"code":"InvalidInput","message":"bad dag id"}}"#),
			RequestIdLookup::BodyFirst,
		);

		assert_eq!(err.message, "bad dag id");
	}

	#[test]
	fn message_falls_back_to_json_text_then_status() {
		let err = error_from_response(
			response(500, &[], r#"{"errorCode":"X"}"#),
			RequestIdLookup::default(),
		);

		assert_eq!(err.kind, ApiErrorKind::Server);
		assert_eq!(err.message, r#"{"errorCode":"X"}"#);

		let err =
			error_from_response(response(502, &[], "Bad Gateway"), RequestIdLookup::default());

		assert_eq!(err.message, "Bad Gateway");

		let err = error_from_response(response(503, &[], ""), RequestIdLookup::default());

		assert_eq!(err.message, "HTTP 503");
		assert!(err.body.is_none());
	}

	#[test]
	fn request_id_lookup_order() {
		let raw = || {
			response(404, &[("x-ms-request-id", "header-id")], r#"{"requestId":"body-id"}"#)
		};

		assert_eq!(
			error_from_response(raw(), RequestIdLookup::BodyFirst).request_id.as_deref(),
			Some("body-id")
		);
		assert_eq!(
			error_from_response(raw(), RequestIdLookup::HeadersFirst).request_id.as_deref(),
			Some("header-id")
		);

		let header_only = error_from_response(
			response(404, &[("x-correlation-id", "corr")], "missing"),
			RequestIdLookup::BodyFirst,
		);

		assert_eq!(header_only.request_id.as_deref(), Some("corr"));
		assert_eq!(header_only.text_body(), Some("missing"));
	}
}
