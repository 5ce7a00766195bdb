//! Layer resolution into an immutable, provenance-tracking configuration snapshot.

// std
use std::path::Path;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ClientSecret, ScopeSet, TenantId},
	config::{
		BuiltinDefaults, ConfigField, ConfigFile, DEFAULT_SECTION, EnvironmentProvider,
		ExplicitFields, FieldProvider, FileDefaultProvider, FileSectionProvider, Provenance,
		parse_flag,
	},
	credential::{Authority, ClientIdentity},
	error::ConfigError,
};

/// Ordered provider chain. Providers are consulted in the order they were added, followed by
/// the built-in defaults.
#[derive(Default)]
pub struct Resolver {
	providers: Vec<Box<dyn FieldProvider>>,
}
impl Resolver {
	/// Creates an empty chain.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a caller-supplied provider.
	pub fn with_provider(mut self, provider: impl 'static + FieldProvider) -> Self {
		self.providers.push(Box::new(provider));

		self
	}

	/// Appends explicit values.
	pub fn with_explicit(self, fields: ExplicitFields) -> Self {
		self.with_provider(fields)
	}

	/// Loads `path` and appends its `section` followed by its `DEFAULT` section.
	pub fn with_file(
		self,
		path: impl AsRef<Path>,
		section: Option<&str>,
	) -> Result<Self, ConfigError> {
		let file = Arc::new(ConfigFile::load(path)?);

		Ok(self.with_config_file(file, section))
	}

	/// Appends an already loaded file. An unknown section contributes nothing, leaving `DEFAULT`.
	pub fn with_config_file(self, file: Arc<ConfigFile>, section: Option<&str>) -> Self {
		let resolver = match section.filter(|name| *name != DEFAULT_SECTION) {
			Some(name) => self.with_provider(FileSectionProvider::new(file.clone(), name)),
			None => self,
		};

		resolver.with_provider(FileDefaultProvider(file))
	}

	/// Appends environment variables.
	pub fn with_environment(self, env: EnvironmentProvider) -> Self {
		self.with_provider(env)
	}

	/// Resolves every recognized field.
	pub fn resolve(self) -> ResolvedConfiguration {
		let mut values = BTreeMap::new();

		for field in ConfigField::ALL {
			let found = self
				.providers
				.iter()
				.map(|provider| provider.as_ref())
				.chain([&BuiltinDefaults as &dyn FieldProvider])
				.filter_map(|provider| provider.lookup(field))
				.find(|(value, _)| !value.is_empty());

			if let Some((value, provenance)) = found {
				values.insert(field, ResolvedValue { value, provenance });
			}
		}

		if !values.contains_key(&ConfigField::FabricApiScope) {
			let base = values
				.get(&ConfigField::FabricBaseUrl)
				.map(|resolved| resolved.value.as_str())
				.unwrap_or(crate::config::DEFAULT_FABRIC_BASE_URL);

			values.insert(
				ConfigField::FabricApiScope,
				ResolvedValue {
					value: format!("{}/.default", base.trim_end_matches('/')),
					provenance: Provenance::Default,
				},
			);
		}

		ResolvedConfiguration { values }
	}
}
impl Debug for Resolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Resolver").field("providers", &self.providers.len()).finish()
	}
}

#[derive(Clone, PartialEq, Eq)]
struct ResolvedValue {
	value: String,
	provenance: Provenance,
}

/// Immutable, resolved settings.
///
/// Construction never fails on missing business fields; the accessors for required fields return
/// [`ConfigError::MissingField`] instead.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfiguration {
	values: BTreeMap<ConfigField, ResolvedValue>,
}
impl ResolvedConfiguration {
	/// Builds a configuration from explicit values and built-in defaults only.
	pub fn from_explicit(fields: ExplicitFields) -> Self {
		Resolver::new().with_explicit(fields).resolve()
	}

	/// Raw resolved value of `field`.
	pub fn get(&self, field: ConfigField) -> Option<&str> {
		self.values.get(&field).map(|resolved| resolved.value.as_str())
	}

	/// Which provider satisfied `field`.
	pub fn provenance(&self, field: ConfigField) -> Option<&Provenance> {
		self.values.get(&field).map(|resolved| &resolved.provenance)
	}

	/// Value of a field the operation cannot proceed without.
	pub fn require(&self, field: ConfigField) -> Result<&str, ConfigError> {
		self.get(field).ok_or_else(|| field.missing())
	}

	/// Directory tenant.
	pub fn tenant_id(&self) -> Result<&str, ConfigError> {
		self.require(ConfigField::TenantId)
	}

	/// Application (client) id.
	pub fn client_id(&self) -> Result<&str, ConfigError> {
		self.require(ConfigField::ClientId)
	}

	/// Client secret. Callers must avoid logging it.
	pub fn client_secret(&self) -> Result<&str, ConfigError> {
		self.require(ConfigField::ClientSecret)
	}

	/// Workspace id, required by workspace-scoped clients.
	pub fn workspace_id(&self) -> Result<&str, ConfigError> {
		self.require(ConfigField::WorkspaceId)
	}

	/// Airflow job id, required by job-scoped clients.
	pub fn airflow_job_id(&self) -> Result<&str, ConfigError> {
		self.require(ConfigField::AirflowJobId)
	}

	/// Airflow webserver URL, required by the native client.
	pub fn airflow_webserver_url(&self) -> Result<&str, ConfigError> {
		self.require(ConfigField::AirflowWebserverUrl)
	}

	/// Fabric API base URL.
	pub fn fabric_base_url(&self) -> &str {
		self.with_default(ConfigField::FabricBaseUrl)
	}

	/// Scope string requested for Fabric APIs.
	pub fn fabric_api_scope(&self) -> &str {
		self.with_default(ConfigField::FabricApiScope)
	}

	/// Scope string requested for the Airflow REST API.
	pub fn airflow_api_scope(&self) -> &str {
		self.with_default(ConfigField::AirflowApiScope)
	}

	/// Identity provider authority host.
	pub fn authority_host(&self) -> &str {
		self.with_default(ConfigField::AuthorityHost)
	}

	/// Debug logging flag. Unrecognized values count as `false`.
	pub fn debug(&self) -> bool {
		self.get(ConfigField::Debug).and_then(parse_flag).unwrap_or(false)
	}

	/// Preview flag. Unrecognized values count as `true`.
	pub fn is_preview_enabled(&self) -> bool {
		self.get(ConfigField::PreviewEnabled).and_then(parse_flag).unwrap_or(true)
	}

	/// Builds the service principal identity from tenant, client id, secret and authority host.
	pub fn identity(&self) -> Result<ClientIdentity, ConfigError> {
		let tenant = TenantId::new(self.tenant_id()?)?;
		let client_id = ClientId::new(self.client_id()?)?;
		let client_secret = ClientSecret::new(self.client_secret()?);
		let host = parse_url(ConfigField::AuthorityHost, self.authority_host())?;

		Ok(ClientIdentity::new(Authority::new(host, tenant), client_id, client_secret))
	}

	/// Normalized Fabric scope set.
	pub fn fabric_scope(&self) -> Result<ScopeSet, ConfigError> {
		Ok(ScopeSet::from_str(self.fabric_api_scope())?)
	}

	/// Normalized Airflow scope set.
	pub fn airflow_scope(&self) -> Result<ScopeSet, ConfigError> {
		Ok(ScopeSet::from_str(self.airflow_api_scope())?)
	}

	fn with_default(&self, field: ConfigField) -> &str {
		self.get(field).or(field.default_value()).unwrap_or_default()
	}
}
impl Debug for ResolvedConfiguration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut map = f.debug_map();

		for (field, resolved) in &self.values {
			let value = if matches!(field, ConfigField::ClientSecret) {
				"<redacted>"
			} else {
				resolved.value.as_str()
			};

			map.entry(field, &format_args!("{value} ({})", resolved.provenance));
		}

		map.finish()
	}
}

pub(crate) fn parse_url(field: ConfigField, value: &str) -> Result<Url, ConfigError> {
	Url::parse(value).map_err(|source| ConfigError::InvalidUrl { field: field.key(), source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const INI: &str = "\
[DEFAULT]
tenant_id = file-default-tenant
client_id = file-default-client

[DEV]
tenant_id = file-dev-tenant
workspace_id = dev-workspace
";

	fn file() -> Arc<ConfigFile> {
		Arc::new(
			ConfigFile::parse("fixture.ini".into(), INI).expect("Fixture INI should parse."),
		)
	}

	fn env() -> EnvironmentProvider {
		EnvironmentProvider::from_pairs([
			("FABRIC_TENANT_ID", "env-tenant"),
			("FABRIC_CLIENT_ID", "env-client"),
			("FABRIC_CLIENT_SECRET", "env-secret"),
			("FABRIC_WORKSPACE_ID", "env-workspace"),
		])
	}

	#[test]
	fn precedence_explicit_then_file_then_env() {
		let explicit = ExplicitFields::default().tenant_id("explicit-tenant");
		let all = Resolver::new()
			.with_explicit(explicit)
			.with_config_file(file(), Some("DEV"))
			.with_environment(env())
			.resolve();

		assert_eq!(all.tenant_id().ok(), Some("explicit-tenant"));
		assert_eq!(all.provenance(ConfigField::TenantId), Some(&Provenance::Explicit));

		let no_explicit =
			Resolver::new().with_config_file(file(), Some("DEV")).with_environment(env()).resolve();

		assert_eq!(no_explicit.tenant_id().ok(), Some("file-dev-tenant"));
		assert_eq!(no_explicit.client_id().ok(), Some("file-default-client"));
		assert_eq!(no_explicit.provenance(ConfigField::ClientId), Some(&Provenance::FileDefault));
		assert_eq!(no_explicit.client_secret().ok(), Some("env-secret"));

		let env_only = Resolver::new().with_environment(env()).resolve();

		assert_eq!(env_only.tenant_id().ok(), Some("env-tenant"));
		assert_eq!(
			env_only.provenance(ConfigField::TenantId),
			Some(&Provenance::Environment("FABRIC_TENANT_ID".into()))
		);
	}

	#[test]
	fn section_inherits_default_keys() {
		let config = Resolver::new().with_config_file(file(), Some("DEV")).resolve();

		assert_eq!(config.workspace_id().ok(), Some("dev-workspace"));
		assert_eq!(config.client_id().ok(), Some("file-default-client"));

		let unknown = Resolver::new().with_config_file(file(), Some("PROD")).resolve();

		assert_eq!(unknown.tenant_id().ok(), Some("file-default-tenant"));
		assert!(unknown.workspace_id().is_err());
	}

	#[test]
	fn missing_fields_fail_at_point_of_use() {
		let config = ResolvedConfiguration::from_explicit(ExplicitFields::default());

		assert!(matches!(
			config.workspace_id(),
			Err(ConfigError::MissingField { env_var: "FABRIC_WORKSPACE_ID", .. })
		));
		assert!(config.identity().is_err());
		assert_eq!(config.fabric_base_url(), "https://api.fabric.microsoft.com");
		assert_eq!(config.fabric_api_scope(), "https://api.fabric.microsoft.com/.default");
		assert_eq!(config.airflow_api_scope(), "5d13f7d7-0567-429c-9880-320e9555e5fc/.default");
		assert_eq!(config.authority_host(), "https://login.microsoftonline.com");
		assert!(!config.debug());
		assert!(config.is_preview_enabled());
	}

	#[test]
	fn fabric_scope_default_follows_base_url() {
		let config = ResolvedConfiguration::from_explicit(
			ExplicitFields::default().fabric_base_url("https://msitapi.fabric.microsoft.com/"),
		);

		assert_eq!(config.fabric_api_scope(), "https://msitapi.fabric.microsoft.com/.default");
		assert_eq!(config.provenance(ConfigField::FabricApiScope), Some(&Provenance::Default));
	}

	#[test]
	fn explicit_values_round_trip_unmodified() {
		let fields = ExplicitFields::default()
			.tenant_id(" tenant ")
			.client_id("client")
			.client_secret("s3cr3t==")
			.workspace_id("ws")
			.airflow_job_id("job")
			.fabric_base_url("https://fabric.example.test/")
			.airflow_webserver_url("https://airflow.example.test")
			.authority_host("https://login.example.test")
			.scopes("fabric/.default", "airflow/.default")
			.debug(true)
			.preview(false);
		let config = ResolvedConfiguration::from_explicit(fields);

		assert_eq!(config.tenant_id().ok(), Some(" tenant "));
		assert_eq!(config.client_id().ok(), Some("client"));
		assert_eq!(config.client_secret().ok(), Some("s3cr3t=="));
		assert_eq!(config.workspace_id().ok(), Some("ws"));
		assert_eq!(config.airflow_job_id().ok(), Some("job"));
		assert_eq!(config.fabric_base_url(), "https://fabric.example.test/");
		assert_eq!(config.airflow_webserver_url().ok(), Some("https://airflow.example.test"));
		assert_eq!(config.authority_host(), "https://login.example.test");
		assert_eq!(config.fabric_api_scope(), "fabric/.default");
		assert_eq!(config.airflow_api_scope(), "airflow/.default");
		assert!(config.debug());
		assert!(!config.is_preview_enabled());
	}

	#[test]
	fn empty_values_fall_through() {
		let config = Resolver::new()
			.with_explicit(ExplicitFields::default().tenant_id(""))
			.with_environment(env())
			.resolve();

		assert_eq!(config.tenant_id().ok(), Some("env-tenant"));
	}

	#[test]
	fn debug_output_redacts_secret() {
		let config = Resolver::new().with_environment(env()).resolve();
		let rendered = format!("{config:?}");

		assert!(!rendered.contains("env-secret"));
		assert!(rendered.contains("env-tenant"));
	}
}
