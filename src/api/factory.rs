//! Sub-client construction and the per-generation client cache.

// self
use crate::{
	_prelude::*,
	api::{
		ApiClient, ControlPlaneClient, CrudClient, FilesClient, NativeClient, RequestIdLookup,
	},
	config::ResolvedConfiguration,
	credential::CredentialStore,
	error::ConfigError,
	http::HttpTransport,
};

/// Logical sub-client types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
	/// [`FilesClient`].
	Files,
	/// [`ControlPlaneClient`].
	ControlPlane,
	/// [`NativeClient`].
	AirflowNative,
	/// [`CrudClient`].
	Crud,
}
impl ClientKind {
	/// Every kind.
	pub const ALL: [ClientKind; 4] =
		[ClientKind::Files, ClientKind::ControlPlane, ClientKind::AirflowNative, ClientKind::Crud];

	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ClientKind::Files => "files",
			ClientKind::ControlPlane => "control_plane",
			ClientKind::AirflowNative => "airflow_native",
			ClientKind::Crud => "crud",
		}
	}
}
impl Display for ClientKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A constructed sub-client of any kind.
#[derive(Clone, Debug)]
pub enum SubClient {
	/// Files client.
	Files(FilesClient),
	/// Control-plane client.
	ControlPlane(ControlPlaneClient),
	/// Airflow native REST client.
	AirflowNative(NativeClient),
	/// Job CRUD client.
	Crud(CrudClient),
}
impl SubClient {
	/// Kind of this client.
	pub fn kind(&self) -> ClientKind {
		match self {
			SubClient::Files(_) => ClientKind::Files,
			SubClient::ControlPlane(_) => ClientKind::ControlPlane,
			SubClient::AirflowNative(_) => ClientKind::AirflowNative,
			SubClient::Crud(_) => ClientKind::Crud,
		}
	}

	/// Request client shared by every clone of this sub-client.
	pub fn api(&self) -> &ApiClient {
		match self {
			SubClient::Files(client) => client.api(),
			SubClient::ControlPlane(client) => client.api(),
			SubClient::AirflowNative(client) => client.api(),
			SubClient::Crud(client) => client.api(),
		}
	}

	/// Returns `true` when both handles are the same cached instance.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		self.api().ptr_eq(other.api())
	}

	/// Files client, if this is one.
	pub fn into_files(self) -> Option<FilesClient> {
		match self {
			SubClient::Files(client) => Some(client),
			_ => None,
		}
	}

	/// Control-plane client, if this is one.
	pub fn into_control_plane(self) -> Option<ControlPlaneClient> {
		match self {
			SubClient::ControlPlane(client) => Some(client),
			_ => None,
		}
	}

	/// Airflow native client, if this is one.
	pub fn into_airflow_native(self) -> Option<NativeClient> {
		match self {
			SubClient::AirflowNative(client) => Some(client),
			_ => None,
		}
	}

	/// CRUD client, if this is one.
	pub fn into_crud(self) -> Option<CrudClient> {
		match self {
			SubClient::Crud(client) => Some(client),
			_ => None,
		}
	}
}

/// Client types the cache can store and hand back.
pub trait CachedClient
where
	Self: Clone + Into<SubClient>,
{
	/// Extracts `Self` from a cached entry of the matching kind.
	fn from_cached(client: &SubClient) -> Option<Self>;
}
impl CachedClient for SubClient {
	fn from_cached(client: &SubClient) -> Option<Self> {
		Some(client.clone())
	}
}

macro_rules! impl_cached_client {
	($client:ty, $variant:ident) => {
		impl From<$client> for SubClient {
			fn from(client: $client) -> Self {
				SubClient::$variant(client)
			}
		}
		impl CachedClient for $client {
			fn from_cached(client: &SubClient) -> Option<Self> {
				match client {
					SubClient::$variant(client) => Some(client.clone()),
					_ => None,
				}
			}
		}
	};
}

impl_cached_client!(FilesClient, Files);
impl_cached_client!(ControlPlaneClient, ControlPlane);
impl_cached_client!(NativeClient, AirflowNative);
impl_cached_client!(CrudClient, Crud);

/// Builds sub-clients wired to one transport and one shared credential store.
#[derive(Clone)]
pub struct ClientFactory {
	transport: Arc<dyn HttpTransport>,
	credentials: Arc<CredentialStore>,
}
impl ClientFactory {
	/// Creates a factory sharing `credentials` across every client it builds.
	pub fn new(transport: Arc<dyn HttpTransport>, credentials: Arc<CredentialStore>) -> Self {
		Self { transport, credentials }
	}

	/// Replaces the credential store shared by built clients.
	pub fn with_credentials(mut self, credentials: Arc<CredentialStore>) -> Self {
		self.credentials = credentials;

		self
	}

	/// Builds a new `kind` client from `config`.
	///
	/// Fails with [`ConfigError::MissingField`] when a field the kind needs is unset: identity
	/// fields for every kind, workspace and job ids for files and control-plane, and the webserver
	/// URL for the native client.
	pub fn create(
		&self,
		kind: ClientKind,
		config: &ResolvedConfiguration,
	) -> Result<SubClient, ConfigError> {
		Ok(match kind {
			ClientKind::Files => self.files(config)?.into(),
			ClientKind::ControlPlane => self.control_plane(config)?.into(),
			ClientKind::AirflowNative => self.airflow_native(config)?.into(),
			ClientKind::Crud => self.crud(config)?.into(),
		})
	}

	/// Builds a files client bound to the configured workspace and job.
	pub fn files(&self, config: &ResolvedConfiguration) -> Result<FilesClient, ConfigError> {
		let api = self.fabric(config)?;

		Ok(FilesClient::new(api, config.workspace_id()?, config.airflow_job_id()?))
	}

	/// Builds a control-plane client bound to the configured workspace and job.
	pub fn control_plane(
		&self,
		config: &ResolvedConfiguration,
	) -> Result<ControlPlaneClient, ConfigError> {
		let api = self.fabric(config)?;

		Ok(ControlPlaneClient::new(api, config.workspace_id()?, config.airflow_job_id()?))
	}

	/// Builds a native client for the configured Airflow webserver.
	pub fn airflow_native(
		&self,
		config: &ResolvedConfiguration,
	) -> Result<NativeClient, ConfigError> {
		let api = ApiClient::builder(
			self.transport.clone(),
			self.credentials.clone(),
			config.identity()?,
			config.airflow_scope()?,
			config.airflow_webserver_url()?,
		)
		.debug(config.debug())
		.request_id_lookup(RequestIdLookup::HeadersFirst)
		.build()?;

		Ok(NativeClient::new(api))
	}

	/// Builds a CRUD client for the Fabric API.
	pub fn crud(&self, config: &ResolvedConfiguration) -> Result<CrudClient, ConfigError> {
		Ok(CrudClient::new(self.fabric(config)?))
	}

	fn fabric(&self, config: &ResolvedConfiguration) -> Result<ApiClient, ConfigError> {
		ApiClient::builder(
			self.transport.clone(),
			self.credentials.clone(),
			config.identity()?,
			config.fabric_scope()?,
			config.fabric_base_url(),
		)
		.preview(config.is_preview_enabled())
		.debug(config.debug())
		.request_id_lookup(RequestIdLookup::BodyFirst)
		.build()
	}
}
impl Debug for ClientFactory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientFactory")
			.field("credentials", &self.credentials)
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Default)]
struct CacheState {
	generation: u64,
	clients: HashMap<ClientKind, SubClient>,
}

/// One client per kind for the current configuration generation.
///
/// Entries built for an older generation are dropped the first time a newer generation is seen,
/// and a client built for an older generation is never inserted.
#[derive(Debug, Default)]
pub struct ClientCache(Mutex<CacheState>);
impl ClientCache {
	/// Returns the cached `kind` client for `generation`, building it with `create` if needed.
	pub fn get_or_create<T, F>(
		&self,
		generation: u64,
		kind: ClientKind,
		create: F,
	) -> Result<T, ConfigError>
	where
		T: CachedClient,
		F: FnOnce() -> Result<T, ConfigError>,
	{
		let mut state = self.0.lock();

		if generation > state.generation {
			state.generation = generation;
			state.clients.clear();
		}
		if generation < state.generation {
			return create();
		}
		if let Some(client) = state.clients.get(&kind).and_then(T::from_cached) {
			return Ok(client);
		}

		let client = create()?;

		state.clients.insert(kind, client.clone().into());

		Ok(client)
	}

	/// Drops every cached client and moves the cache to `generation`.
	pub fn invalidate(&self, generation: u64) {
		let mut state = self.0.lock();

		state.generation = state.generation.max(generation);
		state.clients.clear();
	}

	/// Number of cached clients.
	pub fn len(&self) -> usize {
		self.0.lock().clients.len()
	}

	/// Returns `true` when no client is cached.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{_preludet, config::ExplicitFields};

	fn factory() -> ClientFactory {
		let transport = _preludet::test_transport();
		let credentials = Arc::new(CredentialStore::new(transport.clone()));

		ClientFactory::new(transport, credentials)
	}

	#[test]
	fn kinds_require_their_fields() {
		let factory = factory();
		let identity_only = ResolvedConfiguration::from_explicit(
			ExplicitFields::default()
				.tenant_id("tenant")
				.client_id("client")
				.client_secret("secret"),
		);

		assert!(factory.create(ClientKind::Crud, &identity_only).is_ok());
		assert!(matches!(
			factory.create(ClientKind::Files, &identity_only),
			Err(ConfigError::MissingField { field: "workspace_id", .. })
		));
		assert!(matches!(
			factory.create(ClientKind::AirflowNative, &identity_only),
			Err(ConfigError::MissingField { field: "airflow_webserver_url", .. })
		));
		assert!(matches!(
			factory.create(
				ClientKind::Crud,
				&ResolvedConfiguration::from_explicit(Default::default())
			),
			Err(ConfigError::MissingField { field: "tenant_id", .. })
		));
	}

	#[test]
	fn native_client_skips_preview_and_uses_airflow_scope() {
		let config = _preludet::test_configuration("http://127.0.0.1:1");
		let factory = factory();
		let native = factory
			.create(ClientKind::AirflowNative, &config)
			.expect("Native client should build.");
		let files = factory.create(ClientKind::Files, &config).expect("Files client should build.");

		assert!(!native.api().is_preview_enabled());
		assert_eq!(native.api().scope().normalized(), config.airflow_api_scope());
		assert!(files.api().is_preview_enabled());
		assert_eq!(files.api().scope().normalized(), config.fabric_api_scope());
		assert!(Arc::ptr_eq(native.api().credentials(), files.api().credentials()));
	}

	#[test]
	fn cache_discards_older_generations() {
		let factory = factory();
		let config = _preludet::test_configuration("http://127.0.0.1:1");
		let cache = ClientCache::default();
		let build = || factory.create(ClientKind::Crud, &config);
		let first: SubClient =
			cache.get_or_create(1, ClientKind::Crud, build).expect("Client should build.");
		let again: SubClient =
			cache.get_or_create(1, ClientKind::Crud, build).expect("Client should build.");

		assert!(first.ptr_eq(&again));

		let next: SubClient =
			cache.get_or_create(2, ClientKind::Crud, build).expect("Client should build.");

		assert!(!first.ptr_eq(&next));

		let stale: SubClient =
			cache.get_or_create(1, ClientKind::Crud, build).expect("Client should build.");

		assert!(!stale.ptr_eq(&next));
		assert_eq!(cache.len(), 1);
	}
}
