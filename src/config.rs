//! Layered configuration resolution.
//!
//! Each field is resolved independently by walking an ordered list of [`FieldProvider`]s and
//! taking the first non-empty value. The full precedence is: explicit value > file section >
//! file `DEFAULT` section > environment variable > built-in default. Resolution only fails on
//! structural problems (unsupported extension, missing or unparsable file); a required field that
//! is absent is reported by its accessor on [`ResolvedConfiguration`] when first needed.

mod env;
mod field;
mod file;
mod provider;
mod resolved;

pub use env::*;
pub use field::*;
pub use file::{ConfigFile, DEFAULT_SECTION};
pub use provider::*;
pub use resolved::*;

// std
use std::path::PathBuf;
// self
use crate::{_prelude::*, error::ConfigError};

/// Where a configuration comes from.
#[derive(Clone, Debug, Default)]
pub enum ConfigurationSource {
	/// Configuration file section (inheriting `DEFAULT`), then built-in defaults.
	File {
		/// `.ini` or `.cfg` file.
		path: PathBuf,
		/// Section to read; `None` reads `DEFAULT` only.
		section: Option<String>,
	},
	/// Environment variables, then built-in defaults.
	#[default]
	Environment,
	/// Programmatic values, then built-in defaults.
	Explicit(ExplicitFields),
	/// File values first; fields absent from the file fall back to the environment chain.
	Hybrid {
		/// `.ini` or `.cfg` file.
		path: PathBuf,
		/// Section to read; `None` reads `DEFAULT` only.
		section: Option<String>,
	},
}
impl ConfigurationSource {
	/// File source reading `section` (or `DEFAULT` only).
	pub fn file(path: impl Into<PathBuf>, section: Option<&str>) -> Self {
		Self::File { path: path.into(), section: section.map(ToOwned::to_owned) }
	}

	/// Hybrid file-then-environment source.
	pub fn hybrid(path: impl Into<PathBuf>, section: Option<&str>) -> Self {
		Self::Hybrid { path: path.into(), section: section.map(ToOwned::to_owned) }
	}

	/// Resolves this source, reading variables from `env` where the source uses them.
	pub fn resolve(&self, env: &EnvironmentProvider) -> Result<ResolvedConfiguration, ConfigError> {
		let resolver = match self {
			Self::File { path, section } => Resolver::new().with_file(path, section.as_deref())?,
			Self::Environment => Resolver::new().with_environment(env.clone()),
			Self::Explicit(fields) => Resolver::new().with_explicit(fields.clone()),
			Self::Hybrid { path, section } => Resolver::new()
				.with_file(path, section.as_deref())?
				.with_environment(env.clone()),
		};

		Ok(resolver.resolve())
	}
}

/// Programmatic field values. Empty strings count as unset.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExplicitFields(BTreeMap<ConfigField, String>);
impl ExplicitFields {
	/// Sets `field` to `value`.
	pub fn set(mut self, field: ConfigField, value: impl Into<String>) -> Self {
		self.0.insert(field, value.into());

		self
	}

	/// Returns the non-empty value set for `field`.
	pub fn get(&self, field: ConfigField) -> Option<&str> {
		self.0.get(&field).map(String::as_str).filter(|value| !value.is_empty())
	}

	/// Sets the tenant id.
	pub fn tenant_id(self, value: impl Into<String>) -> Self {
		self.set(ConfigField::TenantId, value)
	}

	/// Sets the client id.
	pub fn client_id(self, value: impl Into<String>) -> Self {
		self.set(ConfigField::ClientId, value)
	}

	/// Sets the client secret.
	pub fn client_secret(self, value: impl Into<String>) -> Self {
		self.set(ConfigField::ClientSecret, value)
	}

	/// Sets the workspace id.
	pub fn workspace_id(self, value: impl Into<String>) -> Self {
		self.set(ConfigField::WorkspaceId, value)
	}

	/// Sets the Airflow job id.
	pub fn airflow_job_id(self, value: impl Into<String>) -> Self {
		self.set(ConfigField::AirflowJobId, value)
	}

	/// Sets the Fabric API base URL.
	pub fn fabric_base_url(self, value: impl Into<String>) -> Self {
		self.set(ConfigField::FabricBaseUrl, value)
	}

	/// Sets the Airflow webserver URL.
	pub fn airflow_webserver_url(self, value: impl Into<String>) -> Self {
		self.set(ConfigField::AirflowWebserverUrl, value)
	}

	/// Sets the identity provider authority host.
	pub fn authority_host(self, value: impl Into<String>) -> Self {
		self.set(ConfigField::AuthorityHost, value)
	}

	/// Sets both OAuth scopes.
	pub fn scopes(self, fabric: impl Into<String>, airflow: impl Into<String>) -> Self {
		self.set(ConfigField::FabricApiScope, fabric).set(ConfigField::AirflowApiScope, airflow)
	}

	/// Sets the debug flag.
	pub fn debug(self, enabled: bool) -> Self {
		self.set(ConfigField::Debug, enabled.to_string())
	}

	/// Sets the preview flag.
	pub fn preview(self, enabled: bool) -> Self {
		self.set(ConfigField::PreviewEnabled, enabled.to_string())
	}
}
impl Debug for ExplicitFields {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut map = f.debug_map();

		for (field, value) in &self.0 {
			if matches!(field, ConfigField::ClientSecret) {
				map.entry(field, &"<redacted>");
			} else {
				map.entry(field, value);
			}
		}

		map.finish()
	}
}
