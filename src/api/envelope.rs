//! Request description and response envelope shared by every sub-client.

// std
use std::borrow::Cow;
// self
use crate::{
	_prelude::*,
	http::{HttpResponse, Method},
};

/// Body attached to an outgoing request.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// JSON document sent as `application/json`.
	Json(serde_json::Value),
	/// Raw payload with its content type.
	Bytes {
		/// `Content-Type` applied unless the caller sets one.
		content_type: Cow<'static, str>,
		/// Payload.
		data: Vec<u8>,
	},
}

/// One call routed through [`ApiClient::execute`](crate::api::ApiClient::execute).
#[derive(Clone, Debug)]
pub struct ApiRequest {
	pub(crate) method: Method,
	pub(crate) path: String,
	pub(crate) query: Vec<(String, String)>,
	pub(crate) headers: Vec<(String, String)>,
	pub(crate) body: RequestBody,
	pub(crate) stream: bool,
	pub(crate) raise_for_status: bool,
}
impl ApiRequest {
	/// Creates a request for `path`, relative to the client's base URL.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: Vec::new(),
			body: RequestBody::Empty,
			stream: false,
			raise_for_status: true,
		}
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Appends a query parameter when `value` is present and non-empty.
	pub fn query_opt<V>(self, key: impl Into<String>, value: Option<V>) -> Self
	where
		V: Into<String>,
	{
		match value.map(Into::into).filter(|value| !value.is_empty()) {
			Some(value) => self.query(key, value),
			None => self,
		}
	}

	/// Adds a header. Caller headers take precedence over the defaults.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sends `body` as JSON.
	pub fn json(mut self, body: serde_json::Value) -> Self {
		self.body = RequestBody::Json(body);

		self
	}

	/// Sends UTF-8 text as `text/plain`.
	pub fn text(mut self, content: impl Into<String>) -> Self {
		self.body = RequestBody::Bytes {
			content_type: Cow::Borrowed("text/plain"),
			data: content.into().into_bytes(),
		};

		self
	}

	/// Sends raw bytes as `application/octet-stream`.
	pub fn bytes(mut self, data: impl Into<Vec<u8>>) -> Self {
		self.body = RequestBody::Bytes {
			content_type: Cow::Borrowed("application/octet-stream"),
			data: data.into(),
		};

		self
	}

	/// Returns the response body as raw bytes regardless of its content type.
	pub fn stream(mut self) -> Self {
		self.stream = true;

		self
	}

	/// Returns non-success responses as [`ApiResponse`] instead of an error.
	pub fn allow_error_status(mut self) -> Self {
		self.raise_for_status = false;

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Path relative to the base URL.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Attached body.
	pub fn body(&self) -> &RequestBody {
		&self.body
	}

	pub(crate) fn has_header(&self, name: &str) -> bool {
		self.headers.iter().any(|(existing, _)| existing.eq_ignore_ascii_case(name))
	}
}

/// Body of a successful response.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResponseBody {
	/// Empty body.
	#[default]
	Empty,
	/// Body declared as JSON and parsed.
	Json(serde_json::Value),
	/// Any other body, or every body of a streamed request.
	Raw(Vec<u8>),
}

/// Response envelope returned by every sub-client call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lower-cased name; repeated headers are joined with `, `.
	pub headers: BTreeMap<String, String>,
	/// Response body.
	pub body: ResponseBody,
}
impl ApiResponse {
	pub(crate) fn from_http(response: HttpResponse, stream: bool) -> Self {
		let status = response.status().as_u16();
		let headers = collect_headers(&response);
		let data = response.into_body();
		let body = if stream {
			ResponseBody::Raw(data)
		} else if data.is_empty() {
			ResponseBody::Empty
		} else if headers.get("content-type").is_some_and(|value| is_json_content_type(value)) {
			serde_json::from_slice(&data).map(ResponseBody::Json).unwrap_or(ResponseBody::Raw(data))
		} else {
			ResponseBody::Raw(data)
		};

		Self { status, headers, body }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Parsed JSON body, if the body was JSON.
	pub fn json(&self) -> Option<&serde_json::Value> {
		match &self.body {
			ResponseBody::Json(value) => Some(value),
			_ => None,
		}
	}

	/// Raw body bytes, if the body was not parsed.
	pub fn bytes(&self) -> Option<&[u8]> {
		match &self.body {
			ResponseBody::Raw(data) => Some(data),
			_ => None,
		}
	}

	/// Body rendered as text: raw bodies decoded lossily, JSON bodies serialized.
	pub fn text(&self) -> Cow<'_, str> {
		match &self.body {
			ResponseBody::Empty => Cow::Borrowed(""),
			ResponseBody::Json(value) => Cow::Owned(value.to_string()),
			ResponseBody::Raw(data) => String::from_utf8_lossy(data),
		}
	}

	/// Deserializes the JSON body into `T`.
	pub fn deserialize<T>(&self) -> Result<T, serde_json::Error>
	where
		T: serde::de::DeserializeOwned,
	{
		match &self.body {
			ResponseBody::Json(value) => T::deserialize(value),
			ResponseBody::Raw(data) => serde_json::from_slice(data),
			ResponseBody::Empty => serde_json::from_slice(b"null"),
		}
	}
}

pub(crate) fn collect_headers(response: &HttpResponse) -> BTreeMap<String, String> {
	let mut headers = BTreeMap::<String, String>::new();

	for (name, value) in response.headers() {
		let value = String::from_utf8_lossy(value.as_bytes());

		headers
			.entry(name.as_str().to_owned())
			.and_modify(|existing| {
				existing.push_str(", ");
				existing.push_str(&value);
			})
			.or_insert_with(|| value.into_owned());
	}

	headers
}

fn is_json_content_type(value: &str) -> bool {
	let value = value.to_ascii_lowercase();

	value.contains("application/json") || value.contains("text/json") || value.contains("+json")
}
