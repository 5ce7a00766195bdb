//! Crate-level error types shared across configuration, credentials, and API calls.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Structural configuration problem or a required field missing at its point of use.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity provider rejected the credential or could not be reached.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// API call failed with a classified status code or transport failure.
	#[error(transparent)]
	Api(#[from] ApiError),
}
impl Error {
	/// Returns the API error classification, if this is an API failure.
	pub fn api_kind(&self) -> Option<ApiErrorKind> {
		match self {
			Self::Api(err) => Some(err.kind),
			_ => None,
		}
	}

	/// Returns `true` when the identity provider or the API rejected the credential.
	pub fn is_authentication(&self) -> bool {
		matches!(self, Self::Authentication(_))
			|| matches!(self.api_kind(), Some(ApiErrorKind::Authentication))
	}

	/// Returns `true` for 404 responses.
	pub fn is_not_found(&self) -> bool {
		matches!(self.api_kind(), Some(ApiErrorKind::NotFound))
	}

	/// Returns `true` for 5xx responses.
	pub fn is_server_error(&self) -> bool {
		matches!(self.api_kind(), Some(ApiErrorKind::Server))
	}
}
impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		ApiError::transport(e).into()
	}
}

/// Configuration failures: structural file problems and deferred missing-field checks.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration file path does not exist.
	#[error("Configuration file not found: {}.", .path.display())]
	FileNotFound {
		/// Requested configuration path.
		path: PathBuf,
	},
	/// Configuration file extension is not `.ini` or `.cfg`.
	#[error("Unsupported config file format: {extension}. Supported formats: .ini, .cfg.")]
	UnsupportedExtension {
		/// Requested configuration path.
		path: PathBuf,
		/// Offending extension (empty when the path has none).
		extension: String,
	},
	/// Configuration file exists but could not be read.
	#[error("Failed to read configuration from {}.", .path.display())]
	Read {
		/// Requested configuration path.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration file could not be parsed as INI.
	#[error("Failed to load configuration from {}: {message}.", .path.display())]
	Parse {
		/// Requested configuration path.
		path: PathBuf,
		/// Parser diagnostic.
		message: String,
	},
	/// A field required by the attempted operation is not configured.
	#[error("{field} not configured. Set {env_var} or pass it explicitly.")]
	MissingField {
		/// Field name as used in configuration files.
		field: &'static str,
		/// Environment variable that would supply the field.
		env_var: &'static str,
	},
	/// A configured URL could not be parsed.
	#[error("{field} is not a valid URL.")]
	InvalidUrl {
		/// Field name as used in configuration files.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured scope string cannot be normalized.
	#[error("Configured scope is invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// A configured identifier (tenant, client) is malformed.
	#[error("Configured identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A header name or value supplied by the caller is not valid HTTP.
	#[error("Header `{name}` is not a valid HTTP header.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// A request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Identity-provider failures surfaced by the credential store.
#[derive(Debug, ThisError)]
pub enum AuthenticationError {
	/// Provider rejected the client credential (bad secret, disabled principal, wrong tenant).
	#[error("Identity provider rejected the credential: {reason}.")]
	Rejected {
		/// Provider-supplied description or error code.
		reason: String,
		/// OAuth `error` field, when supplied.
		oauth_error: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider could not be reached, even after one retry.
	#[error("Identity provider is unreachable.")]
	Unreachable {
		/// Final transport failure.
		#[source]
		source: BoxError,
	},
	/// Provider answered with a payload that is not a token response.
	#[error("Identity provider returned a malformed token response: {message}.")]
	MalformedResponse {
		/// Parser or provider diagnostic.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token response carried an unusable `expires_in`.
	#[error("Token response carried an unusable expires_in value.")]
	InvalidExpiry,
}

/// Classification applied to API failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorKind {
	/// HTTP 400.
	Validation,
	/// HTTP 401.
	Authentication,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// Any other 4xx status.
	Client,
	/// Any 5xx status.
	Server,
	/// Informational or redirect status where success was expected.
	Unexpected,
	/// No response was received.
	Transport,
}
impl ApiErrorKind {
	/// Classifies a non-success status code.
	pub fn from_status(status: u16) -> Self {
		match status {
			400 => Self::Validation,
			401 => Self::Authentication,
			403 => Self::Forbidden,
			404 => Self::NotFound,
			402 | 405..=499 => Self::Client,
			500..=599 => Self::Server,
			_ => Self::Unexpected,
		}
	}

	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Validation => "validation",
			Self::Authentication => "authentication",
			Self::Forbidden => "forbidden",
			Self::NotFound => "not_found",
			Self::Client => "client",
			Self::Server => "server",
			Self::Unexpected => "unexpected",
			Self::Transport => "transport",
		}
	}
}
impl Display for ApiErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// API failure carrying everything the server returned.
#[derive(Debug)]
pub struct ApiError {
	/// Failure classification.
	pub kind: ApiErrorKind,
	/// HTTP status code; `None` for transport failures.
	pub status: Option<u16>,
	/// Human-readable message extracted from the response.
	pub message: String,
	/// Request-correlation identifier, when the server supplied one.
	pub request_id: Option<String>,
	/// Raw response body, when one was received.
	pub body: Option<Vec<u8>>,
	/// Response headers (lower-cased names).
	pub headers: BTreeMap<String, String>,
	/// Transport failure that prevented a response.
	pub source: Option<TransportError>,
}
impl ApiError {
	/// Builds an error for a transport failure (no response).
	pub fn transport(source: TransportError) -> Self {
		Self {
			kind: ApiErrorKind::Transport,
			status: None,
			message: source.to_string(),
			request_id: None,
			body: None,
			headers: BTreeMap::new(),
			source: Some(source),
		}
	}

	/// Returns the body parsed as JSON, when it is JSON.
	pub fn json_body(&self) -> Option<serde_json::Value> {
		self.body.as_deref().and_then(|bytes| serde_json::from_slice(bytes).ok())
	}

	/// Returns the body as UTF-8 text, when it is valid UTF-8.
	pub fn text_body(&self) -> Option<&str> {
		self.body.as_deref().and_then(|bytes| std::str::from_utf8(bytes).ok())
	}
}

impl Display for ApiError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self.status {
			Some(status) => write!(f, "[{status}] {}", self.message)?,
			None => write!(f, "[{}] {}", self.kind, self.message)?,
		}
		if let Some(request_id) = &self.request_id {
			write!(f, " (Request ID: {request_id})")?;
		}

		Ok(())
	}
}
impl StdError for ApiError {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source.as_ref().map(|err| err as &(dyn StdError + 'static))
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request timed out before a response arrived.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Box::new(e) } } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_classification_matches_table() {
		assert_eq!(ApiErrorKind::from_status(400), ApiErrorKind::Validation);
		assert_eq!(ApiErrorKind::from_status(401), ApiErrorKind::Authentication);
		assert_eq!(ApiErrorKind::from_status(403), ApiErrorKind::Forbidden);
		assert_eq!(ApiErrorKind::from_status(404), ApiErrorKind::NotFound);
		assert_eq!(ApiErrorKind::from_status(409), ApiErrorKind::Client);
		assert_eq!(ApiErrorKind::from_status(429), ApiErrorKind::Client);
		assert_eq!(ApiErrorKind::from_status(402), ApiErrorKind::Client);
		assert_eq!(ApiErrorKind::from_status(500), ApiErrorKind::Server);
		assert_eq!(ApiErrorKind::from_status(503), ApiErrorKind::Server);
		assert_eq!(ApiErrorKind::from_status(302), ApiErrorKind::Unexpected);
	}

	#[test]
	fn api_error_display_includes_request_id() {
		let err = ApiError {
			kind: ApiErrorKind::NotFound,
			status: Some(404),
			message: "Item not found".into(),
			request_id: Some("req-42".into()),
			body: Some(b"{\"message\":\"Item not found\"}".to_vec()),
			headers: BTreeMap::new(),
			source: None,
		};

		assert_eq!(err.to_string(), "[404] Item not found (Request ID: req-42)");
		assert_eq!(
			err.json_body().and_then(|v| v.get("message").cloned()),
			Some(serde_json::Value::from("Item not found"))
		);
	}

	#[test]
	fn transport_errors_have_no_status() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
		let err: Error = TransportError::from(io).into();

		assert_eq!(err.api_kind(), Some(ApiErrorKind::Transport));
		assert!(matches!(&err, Error::Api(api) if api.status.is_none()));
		assert!(StdError::source(&err).is_some());
	}

	#[test]
	fn missing_field_names_env_var() {
		let err = ConfigError::MissingField {
			field: "workspace_id",
			env_var: "FABRIC_WORKSPACE_ID",
		};

		assert!(err.to_string().contains("FABRIC_WORKSPACE_ID"));
	}
}
