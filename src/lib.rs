//! Credential-managing client runtime for Microsoft Fabric Apache Airflow jobs.
//!
//! Configuration is resolved from explicit values, INI files and the environment, tokens are
//! cached per principal and scope set with single-flight refresh, and every sub-client sends its
//! calls through one typed request envelope.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod credential;
pub mod error;
#[cfg(feature = "reqwest")] pub mod global;
pub mod http;
pub mod oauth;
pub mod obs;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ClientId, ClientSecret, TenantId},
		config::{EnvironmentProvider, ExplicitFields, ResolvedConfiguration},
		context::ConfigContext,
		credential::{Authority, ClientIdentity, CredentialStore},
		http::{HttpTransport, ReqwestTransport},
	};

	/// Tenant identifier used across integration fixtures.
	pub const TEST_TENANT: &str = "tenant-test";
	/// Client identifier used across integration fixtures.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Client secret used across integration fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-test";

	/// Builds the reqwest transport used across integration tests.
	pub fn test_transport() -> Arc<dyn HttpTransport> {
		Arc::new(ReqwestTransport::default())
	}

	/// Builds a client identity whose authority host points at `authority_host`.
	pub fn test_identity(authority_host: &str) -> ClientIdentity {
		let host = Url::parse(authority_host).expect("Test authority host should parse.");
		let tenant = TenantId::new(TEST_TENANT).expect("Test tenant should be valid.");
		let client_id = ClientId::new(TEST_CLIENT_ID).expect("Test client id should be valid.");

		ClientIdentity::new(
			Authority::new(host, tenant),
			client_id,
			ClientSecret::new(TEST_CLIENT_SECRET),
		)
	}

	/// Explicit configuration fields pointing every endpoint at `server_url`.
	pub fn test_fields(server_url: &str) -> ExplicitFields {
		ExplicitFields::default()
			.tenant_id(TEST_TENANT)
			.client_id(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
			.workspace_id("workspace-test")
			.airflow_job_id("job-test")
			.fabric_base_url(server_url)
			.airflow_webserver_url(server_url)
			.authority_host(server_url)
	}

	/// Resolves [`test_fields`] into a configuration.
	pub fn test_configuration(server_url: &str) -> ResolvedConfiguration {
		ResolvedConfiguration::from_explicit(test_fields(server_url))
	}

	/// Builds a [`ConfigContext`] backed by the reqwest transport and an empty environment.
	pub fn build_test_context() -> (ConfigContext, Arc<CredentialStore>) {
		let transport = test_transport();
		let credentials = Arc::new(CredentialStore::new(transport.clone()));
		let context = ConfigContext::with_transport(transport)
			.with_credentials(credentials.clone())
			.with_environment(EnvironmentProvider::empty());

		(context, credentials)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tempfile as _, tokio as _};
