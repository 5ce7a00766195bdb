//! Uploads a DAG file and lists the job's `dags` folder through a context wired to a mock Fabric
//! endpoint, then triggers the DAG on the Airflow webserver.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use fabric_airflow_client::{
	api::native::TriggerDagRun,
	config::{ConfigurationSource, EnvironmentProvider, ExplicitFields},
	context::ConfigContext,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-demo/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let job_root = "/v1/workspaces/ws-demo/apacheAirflowJobs/job-demo";

	server
		.mock_async(|when, then| {
			when.method(PUT).path(format!("{job_root}/files/dags/hello.py"));
			then.status(200);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{job_root}/files")).query_param("rootPath", "dags");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"files\":[{\"filePath\":\"dags/hello.py\",\"sizeInBytes\":42}]}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/dags/hello/dagRuns");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"dag_run_id\":\"manual__demo\",\"state\":\"queued\"}");
		})
		.await;

	let context = ConfigContext::new().with_environment(EnvironmentProvider::empty());
	let fields = ExplicitFields::default()
		.tenant_id("tenant-demo")
		.client_id("client-demo")
		.client_secret("secret-demo")
		.workspace_id("ws-demo")
		.airflow_job_id("job-demo")
		.authority_host(server.base_url())
		.fabric_base_url(server.base_url())
		.airflow_webserver_url(server.base_url());

	context.setup(&ConfigurationSource::Explicit(fields))?;

	let files = context.files_client()?;

	files.create_or_update_file("dags/hello.py", "print('hello')").await?;

	let listing = files.list_files(Some("dags"), None).await?;

	println!("Files under dags: {}.", listing.text());

	let run = context
		.airflow_native_client()?
		.trigger_dag(
			"hello",
			&TriggerDagRun { dag_run_id: Some("manual__demo".into()), ..Default::default() },
		)
		.await?;

	println!("Triggered run: {}.", run.text());

	// Both APIs share one credential store; the Airflow scope needs its own token.
	token_mock.assert_calls_async(2).await;

	Ok(())
}
