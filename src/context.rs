//! Injectable configuration registry with a generation-keyed sub-client cache.
//!
//! A [`ConfigContext`] holds at most one installed [`ResolvedConfiguration`]. Every install bumps
//! the generation counter, and the client cache only hands out clients built for the current
//! generation, so a client obtained before a reconfiguration is never returned after it. The
//! credential store is shared across generations: tokens are keyed by principal and scopes, not
//! by configuration.

// self
use crate::{
	_prelude::*,
	api::{
		CachedClient, ClientCache, ClientFactory, ClientKind, ControlPlaneClient, CrudClient,
		FilesClient, NativeClient, SubClient,
	},
	config::{ConfigurationSource, EnvironmentProvider, ResolvedConfiguration, Resolver},
	credential::CredentialStore,
	error::ConfigError,
	http::HttpTransport,
	obs,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[derive(Clone, Debug)]
struct Installed {
	generation: u64,
	config: Arc<ResolvedConfiguration>,
}
impl Installed {
	fn next(previous: Option<&Installed>, config: ResolvedConfiguration) -> Self {
		let generation = previous.map_or(0, |installed| installed.generation) + 1;

		Self { generation, config: Arc::new(config) }
	}
}

/// Registry slot plus the factory and cache serving sub-clients for it.
pub struct ConfigContext {
	factory: ClientFactory,
	credentials: Arc<CredentialStore>,
	environment: EnvironmentProvider,
	slot: RwLock<Option<Installed>>,
	clients: ClientCache,
}
impl ConfigContext {
	/// Creates an uninitialized context that sends every request through `transport`.
	///
	/// The context owns a fresh [`CredentialStore`] and reads the process environment; use
	/// [`ConfigContext::with_credentials`] and [`ConfigContext::with_environment`] to replace
	/// either.
	pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
		let credentials = Arc::new(CredentialStore::new(transport.clone()));

		Self {
			factory: ClientFactory::new(transport, credentials.clone()),
			credentials,
			environment: EnvironmentProvider::process(),
			slot: Default::default(),
			clients: Default::default(),
		}
	}

	/// Shares `credentials` with every sub-client built by this context.
	pub fn with_credentials(mut self, credentials: Arc<CredentialStore>) -> Self {
		self.factory = self.factory.with_credentials(credentials.clone());
		self.credentials = credentials;

		self
	}

	/// Reads environment variables from `environment` instead of the process.
	pub fn with_environment(mut self, environment: EnvironmentProvider) -> Self {
		self.environment = environment;

		self
	}

	/// Resolves `source` and installs the result, invalidating every cached sub-client.
	pub fn setup(
		&self,
		source: &ConfigurationSource,
	) -> Result<Arc<ResolvedConfiguration>, ConfigError> {
		let config = source.resolve(&self.environment)?;

		Ok(self.install(config))
	}

	/// Returns the installed configuration, resolving it from the environment on first use.
	pub fn get_instance(&self) -> Arc<ResolvedConfiguration> {
		self.snapshot().config
	}

	/// Installs `config` verbatim, bypassing resolution.
	pub fn set_instance(&self, config: ResolvedConfiguration) -> Arc<ResolvedConfiguration> {
		self.install(config)
	}

	/// Returns `true` once a configuration has been installed.
	pub fn is_initialized(&self) -> bool {
		self.slot.read().is_some()
	}

	/// Generation of the installed configuration; `0` before the first install.
	pub fn generation(&self) -> u64 {
		self.slot.read().as_ref().map_or(0, |installed| installed.generation)
	}

	/// Credential store shared by every sub-client.
	pub fn credentials(&self) -> &Arc<CredentialStore> {
		&self.credentials
	}

	/// Environment consulted by [`ConfigContext::setup`] and lazy initialization.
	pub fn environment(&self) -> &EnvironmentProvider {
		&self.environment
	}

	/// Returns the `kind` client for the installed configuration.
	pub fn client(&self, kind: ClientKind) -> Result<SubClient, ConfigError> {
		self.cached(kind, |factory, config| factory.create(kind, config))
	}

	/// Files client for the installed configuration.
	pub fn files_client(&self) -> Result<FilesClient, ConfigError> {
		self.cached(ClientKind::Files, ClientFactory::files)
	}

	/// Control-plane client for the installed configuration.
	pub fn control_plane_client(&self) -> Result<ControlPlaneClient, ConfigError> {
		self.cached(ClientKind::ControlPlane, ClientFactory::control_plane)
	}

	/// Airflow native REST client for the installed configuration.
	pub fn airflow_native_client(&self) -> Result<NativeClient, ConfigError> {
		self.cached(ClientKind::AirflowNative, ClientFactory::airflow_native)
	}

	/// Job CRUD client for the installed configuration.
	pub fn crud_client(&self) -> Result<CrudClient, ConfigError> {
		self.cached(ClientKind::Crud, ClientFactory::crud)
	}

	fn cached<T, F>(&self, kind: ClientKind, build: F) -> Result<T, ConfigError>
	where
		T: CachedClient,
		F: FnOnce(&ClientFactory, &ResolvedConfiguration) -> Result<T, ConfigError>,
	{
		let Installed { generation, config } = self.snapshot();

		self.clients.get_or_create(generation, kind, || build(&self.factory, &config))
	}

	fn snapshot(&self) -> Installed {
		if let Some(installed) = self.slot.read().clone() {
			return installed;
		}

		let config = Resolver::new().with_environment(self.environment.clone()).resolve();
		let mut slot = self.slot.write();

		// A concurrent `setup` may have installed while the environment was being read.
		if let Some(installed) = slot.as_ref() {
			return installed.clone();
		}

		let installed = Installed::next(None, config);

		*slot = Some(installed.clone());

		installed
	}

	fn install(&self, config: ResolvedConfiguration) -> Arc<ResolvedConfiguration> {
		let mut slot = self.slot.write();
		let installed = Installed::next(slot.as_ref(), config);

		*slot = Some(installed.clone());
		self.clients.invalidate(installed.generation);

		obs::debug_configuration_installed(installed.generation);

		installed.config
	}
}
#[cfg(feature = "reqwest")]
impl ConfigContext {
	/// Creates an uninitialized context backed by the default reqwest transport.
	pub fn new() -> Self {
		Self::with_transport(Arc::new(ReqwestTransport::default()))
	}
}
#[cfg(feature = "reqwest")]
impl Default for ConfigContext {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for ConfigContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConfigContext")
			.field("generation", &self.generation())
			.field("cached_clients", &self.clients.len())
			.field("credentials", &self.credentials)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		config::ExplicitFields,
		error::TransportError,
		http::{HttpRequest, TransportFuture},
	};

	struct OfflineTransport;
	impl HttpTransport for OfflineTransport {
		fn send(&self, _request: HttpRequest) -> TransportFuture<'_> {
			Box::pin(async {
				Err(TransportError::Io(std::io::Error::new(
					std::io::ErrorKind::NotConnected,
					"offline",
				)))
			})
		}
	}

	fn fields(workspace: &str) -> ExplicitFields {
		ExplicitFields::default()
			.tenant_id("tenant")
			.client_id("client")
			.client_secret("secret")
			.workspace_id(workspace)
			.airflow_job_id("job")
			.airflow_webserver_url("https://airflow.example.test")
	}

	fn context(pairs: &[(&str, &str)]) -> ConfigContext {
		ConfigContext::with_transport(Arc::new(OfflineTransport))
			.with_environment(EnvironmentProvider::from_pairs(pairs.iter().copied()))
	}

	#[test]
	fn get_instance_resolves_environment_lazily() {
		let context = context(&[("FABRIC_TENANT_ID", "env-tenant")]);

		assert!(!context.is_initialized());
		assert_eq!(context.generation(), 0);

		let config = context.get_instance();

		assert_eq!(config.tenant_id().expect("Tenant should come from env."), "env-tenant");
		assert!(context.is_initialized());
		assert_eq!(context.generation(), 1);
		assert!(Arc::ptr_eq(&config, &context.get_instance()));
	}

	#[test]
	fn set_instance_replaces_configuration() {
		let context = context(&[]);
		let first = context.set_instance(ResolvedConfiguration::from_explicit(fields("ws-1")));
		let second = context.set_instance(ResolvedConfiguration::from_explicit(fields("ws-2")));

		assert_eq!(first.workspace_id().expect("Workspace should be set."), "ws-1");
		assert_eq!(second.workspace_id().expect("Workspace should be set."), "ws-2");
		assert!(Arc::ptr_eq(&second, &context.get_instance()));
		assert_eq!(context.generation(), 2);
	}

	#[test]
	fn setup_invalidates_cached_clients() {
		let context = context(&[]);

		context
			.setup(&ConfigurationSource::Explicit(fields("ws-1")))
			.expect("Explicit setup should succeed.");

		let before = context.files_client().expect("Files client should build.");
		let cached = context.files_client().expect("Files client should build.");

		assert!(before.api().ptr_eq(cached.api()));
		assert_eq!(before.workspace_id(), "ws-1");

		context
			.setup(&ConfigurationSource::Explicit(fields("ws-2")))
			.expect("Explicit setup should succeed.");

		let after = context.files_client().expect("Files client should build.");

		assert!(!before.api().ptr_eq(after.api()));
		assert_eq!(after.workspace_id(), "ws-2");
	}

	#[test]
	fn typed_and_untyped_accessors_share_the_cache() {
		let context = context(&[]);

		context.set_instance(ResolvedConfiguration::from_explicit(fields("ws")));

		let untyped = context.client(ClientKind::Crud).expect("CRUD client should build.");
		let typed = context.crud_client().expect("CRUD client should build.");

		assert!(untyped.api().ptr_eq(typed.api()));
		assert!(Arc::ptr_eq(typed.api().credentials(), context.credentials()));
	}

	#[test]
	fn missing_fields_surface_at_client_construction() {
		let context = context(&[]);

		context.set_instance(ResolvedConfiguration::from_explicit(Default::default()));

		assert!(matches!(
			context.crud_client(),
			Err(ConfigError::MissingField { field: "tenant_id", .. })
		));
	}

	#[test]
	fn failed_setup_keeps_previous_configuration() {
		let context = context(&[]);

		context.set_instance(ResolvedConfiguration::from_explicit(fields("ws")));

		let err = context
			.setup(&ConfigurationSource::file("settings.yaml", None))
			.expect_err("YAML files are rejected.");

		assert!(matches!(err, ConfigError::UnsupportedExtension { .. }));
		assert_eq!(context.generation(), 1);
		assert_eq!(context.get_instance().workspace_id().expect("Workspace should be set."), "ws");
	}
}
