//! Recognized configuration fields with their file keys, environment variables and defaults.

// self
use crate::{_prelude::*, error::ConfigError};

/// Fields understood by the resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
	/// Directory tenant of the service principal.
	TenantId,
	/// Application (client) identifier.
	ClientId,
	/// Client secret.
	ClientSecret,
	/// Fabric workspace holding the Airflow job.
	WorkspaceId,
	/// Apache Airflow job item identifier.
	AirflowJobId,
	/// Fabric REST API base URL.
	FabricBaseUrl,
	/// Airflow webserver base URL used by the native client.
	AirflowWebserverUrl,
	/// OAuth scope requested for Fabric APIs.
	FabricApiScope,
	/// OAuth scope requested for the Airflow REST API.
	AirflowApiScope,
	/// Identity provider authority host.
	AuthorityHost,
	/// Debug logging of outbound requests.
	Debug,
	/// Appends `preview=true` to Fabric API calls.
	PreviewEnabled,
}
impl ConfigField {
	/// Every recognized field, in resolution order.
	pub const ALL: [ConfigField; 12] = [
		ConfigField::TenantId,
		ConfigField::ClientId,
		ConfigField::ClientSecret,
		ConfigField::WorkspaceId,
		ConfigField::AirflowJobId,
		ConfigField::FabricBaseUrl,
		ConfigField::AirflowWebserverUrl,
		ConfigField::FabricApiScope,
		ConfigField::AirflowApiScope,
		ConfigField::AuthorityHost,
		ConfigField::Debug,
		ConfigField::PreviewEnabled,
	];

	/// Key used inside configuration file sections.
	pub const fn key(self) -> &'static str {
		match self {
			ConfigField::TenantId => "tenant_id",
			ConfigField::ClientId => "client_id",
			ConfigField::ClientSecret => "client_secret",
			ConfigField::WorkspaceId => "workspace_id",
			ConfigField::AirflowJobId => "airflow_job_id",
			ConfigField::FabricBaseUrl => "fabric_base_url",
			ConfigField::AirflowWebserverUrl => "airflow_webserver_url",
			ConfigField::FabricApiScope => "fabric_api_scope",
			ConfigField::AirflowApiScope => "airflow_api_scope",
			ConfigField::AuthorityHost => "authority_host",
			ConfigField::Debug => "debug",
			ConfigField::PreviewEnabled => "is_preview_enabled",
		}
	}

	/// Environment variable consulted for this field, if any.
	pub const fn env_var(self) -> Option<&'static str> {
		match self {
			ConfigField::TenantId => Some("FABRIC_TENANT_ID"),
			ConfigField::ClientId => Some("FABRIC_CLIENT_ID"),
			ConfigField::ClientSecret => Some("FABRIC_CLIENT_SECRET"),
			ConfigField::WorkspaceId => Some("FABRIC_WORKSPACE_ID"),
			ConfigField::AirflowJobId => Some("FABRIC_AIRFLOW_JOB_ID"),
			ConfigField::FabricBaseUrl => Some("FABRIC_BASE_URL"),
			ConfigField::AirflowWebserverUrl => Some("AIRFLOW_WEBSERVER_URL"),
			ConfigField::FabricApiScope => Some("FABRIC_API_SCOPE"),
			ConfigField::AirflowApiScope => Some("AIRFLOW_API_SCOPE"),
			ConfigField::AuthorityHost => Some("AZURE_AUTHORITY_HOST"),
			ConfigField::Debug => Some("DEBUG"),
			ConfigField::PreviewEnabled => None,
		}
	}

	/// Built-in fallback for fields that have one.
	///
	/// The Fabric scope default depends on the resolved base URL and is derived by the resolver.
	pub const fn default_value(self) -> Option<&'static str> {
		match self {
			ConfigField::FabricBaseUrl => Some(DEFAULT_FABRIC_BASE_URL),
			ConfigField::AirflowApiScope => Some(DEFAULT_AIRFLOW_API_SCOPE),
			ConfigField::AuthorityHost => Some(crate::credential::Authority::DEFAULT_HOST),
			ConfigField::Debug => Some("false"),
			ConfigField::PreviewEnabled => Some("true"),
			_ => None,
		}
	}

	/// Looks a field up by its file key (case-insensitive).
	pub fn from_key(key: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|field| field.key().eq_ignore_ascii_case(key))
	}

	/// Error reported when this field is required but unresolved.
	pub fn missing(self) -> ConfigError {
		ConfigError::MissingField { field: self.key(), env_var: self.env_var().unwrap_or("") }
	}
}
impl Display for ConfigField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.key())
	}
}

/// Public Fabric REST API endpoint.
pub const DEFAULT_FABRIC_BASE_URL: &str = "https://api.fabric.microsoft.com";
/// Scope of the Airflow REST API application.
pub const DEFAULT_AIRFLOW_API_SCOPE: &str = "5d13f7d7-0567-429c-9880-320e9555e5fc/.default";

/// Parses a boolean flag, returning `None` for unrecognized input.
pub fn parse_flag(value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"true" | "yes" | "1" | "on" => Some(true),
		"false" | "no" | "0" | "off" => Some(false),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn keys_round_trip_case_insensitively() {
		for field in ConfigField::ALL {
			assert_eq!(ConfigField::from_key(&field.key().to_ascii_uppercase()), Some(field));
		}

		assert_eq!(ConfigField::from_key("unknown"), None);
	}

	#[test]
	fn flags_accept_common_spellings() {
		assert_eq!(parse_flag("Yes"), Some(true));
		assert_eq!(parse_flag("ON"), Some(true));
		assert_eq!(parse_flag("0"), Some(false));
		assert_eq!(parse_flag("off"), Some(false));
		assert_eq!(parse_flag("maybe"), None);
	}

	#[test]
	fn missing_error_names_env_var() {
		let message = ConfigField::AirflowJobId.missing().to_string();

		assert!(message.contains("airflow_job_id"));
		assert!(message.contains("FABRIC_AIRFLOW_JOB_ID"));
	}
}
