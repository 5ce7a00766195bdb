//! Process-wide registry backed by one lazily-created [`ConfigContext`].
//!
//! The first call to any function here creates a reqwest-backed context reading the process
//! environment, unless [`init`] installed a custom context before that.

// std
use std::sync::OnceLock;
// self
use crate::{
	_prelude::*,
	api::{ClientKind, ControlPlaneClient, CrudClient, FilesClient, NativeClient, SubClient},
	config::{ConfigurationSource, ResolvedConfiguration},
	context::ConfigContext,
	error::ConfigError,
};

static CONTEXT: OnceLock<ConfigContext> = OnceLock::new();

/// Installs `context` as the process-wide registry.
///
/// Returns the rejected context when the registry was already created, either by an earlier
/// `init` or by first use of another function in this module.
pub fn init(context: ConfigContext) -> Result<(), ConfigContext> {
	CONTEXT.set(context)
}

/// Returns the process-wide context, creating the default one on first use.
pub fn context() -> &'static ConfigContext {
	CONTEXT.get_or_init(ConfigContext::new)
}

/// Resolves `source` (the environment when `None`) and installs it process-wide.
pub fn setup(
	source: Option<ConfigurationSource>,
) -> Result<Arc<ResolvedConfiguration>, ConfigError> {
	context().setup(&source.unwrap_or_default())
}

/// Returns the process-wide configuration, resolving it from the environment on first use.
pub fn get_instance() -> Arc<ResolvedConfiguration> {
	context().get_instance()
}

/// Installs `config` process-wide without resolution.
pub fn set_instance(config: ResolvedConfiguration) -> Arc<ResolvedConfiguration> {
	context().set_instance(config)
}

/// Returns the process-wide `kind` client.
pub fn client(kind: ClientKind) -> Result<SubClient, ConfigError> {
	context().client(kind)
}

/// Returns the process-wide files client.
pub fn files_client() -> Result<FilesClient, ConfigError> {
	context().files_client()
}

/// Returns the process-wide control-plane client.
pub fn control_plane_client() -> Result<ControlPlaneClient, ConfigError> {
	context().control_plane_client()
}

/// Returns the process-wide Airflow native REST client.
pub fn airflow_native_client() -> Result<NativeClient, ConfigError> {
	context().airflow_native_client()
}

/// Returns the process-wide job CRUD client.
pub fn crud_client() -> Result<CrudClient, ConfigError> {
	context().crud_client()
}
