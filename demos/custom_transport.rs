//! Plugs a hand-written [`HttpTransport`] into a context so every token exchange and API call
//! runs without a network, and shows how each failure surfaces.

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
// crates.io
use color_eyre::Result;
// self
use fabric_airflow_client::{
	config::{ExplicitFields, ResolvedConfiguration},
	context::ConfigContext,
	error::{Error, TransportError},
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	oauth2::http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = Arc::new(CannedTransport::default());
	let context = ConfigContext::with_transport(transport.clone());

	context.set_instance(ResolvedConfiguration::from_explicit(
		ExplicitFields::default()
			.tenant_id("tenant-acme")
			.client_id("svc-router")
			.client_secret("demo-secret")
			.workspace_id("ws-acme")
			.airflow_job_id("job-acme"),
	));

	let crud = context.crud_client()?;

	match crud.get_airflow_job("ws-acme", "missing-job").await {
		Ok(response) => println!("Unexpected success: {}.", response.text()),
		Err(e) => println!("Typed API error: {e}."),
	}

	transport.offline.store(true, Ordering::SeqCst);
	context.credentials().clear();

	match crud.get_workspace_info("ws-acme").await {
		Ok(_) => println!("Offline transport unexpectedly answered."),
		Err(Error::Authentication(e)) => println!("Identity provider unreachable: {e}."),
		Err(e) => println!("Other failure: {e}."),
	}

	Ok(())
}

/// Answers token requests with a fixed token and every API call with a 404.
#[derive(Default)]
struct CannedTransport {
	offline: AtomicBool,
}
impl HttpTransport for CannedTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let offline = self.offline.load(Ordering::SeqCst);
		let is_token = request.uri().path().ends_with("/oauth2/v2.0/token");

		Box::pin(async move {
			if offline {
				return Err(TransportError::Io(std::io::Error::new(
					std::io::ErrorKind::NotConnected,
					"demo transport is offline",
				)));
			}

			let (status, body) = if is_token {
				(
					StatusCode::OK,
					"{\"access_token\":\"canned\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
				)
			} else {
				(
					StatusCode::NOT_FOUND,
					"{\"errorCode\":\"ItemNotFound\",\"message\":\"The requested item was not found.\",\"requestId\":\"demo-request\"}",
				)
			};
			let mut response = HttpResponse::new(body.as_bytes().to_vec());

			*response.status_mut() = status;
			response
				.headers_mut()
				.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

			Ok(response)
		})
	}
}
