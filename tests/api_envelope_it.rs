#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use fabric_airflow_client::{
	_preludet::*,
	api::{ResponseBody, control_plane::Requirements, native::ListDags},
	context::ConfigContext,
	error::ApiErrorKind,
};

const TOKEN_PATH: &str = "/tenant-test/oauth2/v2.0/token";
const JOB_ROOT: &str = "/v1/workspaces/workspace-test/apacheAirflowJobs/job-test";

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"api-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await
}

fn context_for(server: &MockServer) -> ConfigContext {
	let (context, _credentials) = build_test_context();

	context.set_instance(test_configuration(&server.base_url()));

	context
}

#[tokio::test]
async fn fabric_requests_carry_bearer_token_and_preview_flag() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let listing = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{JOB_ROOT}/files"))
				.query_param("rootPath", "dags")
				.query_param("preview", "true")
				.header("authorization", "Bearer api-token")
				.header("accept", "application/json");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"files\":[{\"path\":\"dags/hello.py\"}]}");
		})
		.await;
	let context = context_for(&server);
	let files = context.files_client().expect("Files client should build.");
	let first = files.list_files(Some("dags"), None).await.expect("Listing should succeed.");
	let second = files.list_files(Some("dags"), None).await.expect("Listing should succeed.");

	assert!(first.is_success());
	assert_eq!(
		first.json().and_then(|json| json["files"][0]["path"].as_str()),
		Some("dags/hello.py")
	);
	assert_eq!(second.status, 200);

	token.assert_calls_async(1).await;
	listing.assert_calls_async(2).await;
}

#[tokio::test]
async fn uploaded_text_uses_plain_content_type() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let upload = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(format!("{JOB_ROOT}/files/dags/hello.py"))
				.header("content-type", "text/plain")
				.body("print('hello')");
			then.status(200);
		})
		.await;
	let context = context_for(&server);
	let files = context.files_client().expect("Files client should build.");
	let response = files
		.create_or_update_file("dags/hello.py", "print('hello')")
		.await
		.expect("Upload should succeed.");

	assert!(matches!(response.body, ResponseBody::Empty));

	upload.assert_async().await;
}

#[tokio::test]
async fn downloaded_files_stay_raw() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _download = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{JOB_ROOT}/files/dags/data.json"));
			then.status(200).header("content-type", "application/json").body("{\"a\":1}");
		})
		.await;
	let context = context_for(&server);
	let files = context.files_client().expect("Files client should build.");
	let response = files.get_file("dags/data.json").await.expect("Download should succeed.");

	assert!(response.json().is_none());
	assert_eq!(response.bytes(), Some(&b"{\"a\":1}"[..]));
}

#[tokio::test]
async fn not_found_maps_to_typed_error_with_request_id() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/workspaces/ws-missing/apacheAirflowJobs/job-missing");
			then.status(404)
				.header("content-type", "application/json")
				.header("x-ms-request-id", "header-id")
				.body("{\"message\":\"Item not found\",\"requestId\":\"body-id\"}");
		})
		.await;
	let context = context_for(&server);
	let crud = context.crud_client().expect("CRUD client should build.");
	let err = crud
		.get_airflow_job("ws-missing", "job-missing")
		.await
		.expect_err("Missing job should fail.");

	assert!(err.is_not_found());

	match err {
		Error::Api(api) => {
			assert_eq!(api.kind, ApiErrorKind::NotFound);
			assert_eq!(api.status, Some(404));
			assert_eq!(api.message, "Item not found");
			assert_eq!(api.request_id.as_deref(), Some("body-id"));
			assert_eq!(
				api.json_body().and_then(|json| json["message"].as_str().map(str::to_owned)),
				Some("Item not found".to_owned())
			);
			assert_eq!(api.to_string(), "[404] Item not found (Request ID: body-id)");
		},
		other => panic!("Expected an API error, got {other:?}."),
	}
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;

	for (status, kind) in [
		(400, ApiErrorKind::Validation),
		(401, ApiErrorKind::Authentication),
		(403, ApiErrorKind::Forbidden),
		(409, ApiErrorKind::Client),
		(503, ApiErrorKind::Server),
	] {
		let workspace = format!("ws-{status}");
		let mut mock = server
			.mock_async(|when, then| {
				when.method(GET).path(format!("/v1/workspaces/{workspace}"));
				then.status(status).body("plain failure");
			})
			.await;
		let context = context_for(&server);
		let crud = context.crud_client().expect("CRUD client should build.");
		let err = crud.get_workspace_info(&workspace).await.expect_err("Status should fail.");

		assert_eq!(err.api_kind(), Some(kind));

		match err {
			Error::Api(api) => {
				assert_eq!(api.status, Some(status));
				assert_eq!(api.message, "plain failure");
				assert_eq!(api.text_body(), Some("plain failure"));
			},
			other => panic!("Expected an API error, got {other:?}."),
		}

		mock.delete_async().await;
	}
}

#[tokio::test]
async fn native_client_prefers_header_request_id_and_skips_preview() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _dags = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v1/dags")
				.query_param("limit", "5")
				.query_param("only_active", "true");
			then.status(500)
				.header("content-type", "application/json")
				.header("x-request-id", "header-id")
				.body("{\"detail\":\"boom\",\"request_id\":\"body-id\"}");
		})
		.await;
	let context = context_for(&server);
	let native = context.airflow_native_client().expect("Native client should build.");
	let url = native
		.api()
		.url_for(&fabric_airflow_client::api::ApiRequest::get("api/v1/dags"))
		.expect("URL should build.");

	assert_eq!(url.query(), None);

	let filter = ListDags { limit: Some(5), only_active: Some(true), ..Default::default() };
	let err = native.list_dags(&filter).await.expect_err("Server failure should surface.");

	assert!(err.is_server_error());

	match err {
		Error::Api(api) => assert_eq!(api.request_id.as_deref(), Some("header-id")),
		other => panic!("Expected an API error, got {other:?}."),
	}
}

#[tokio::test]
async fn pool_template_id_comes_from_location_header() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/workspaces/workspace-test/apacheAirflowJobs/settings/pools");
			then.status(201).header(
				"location",
				"https://api.fabric.microsoft.com/v1/workspaces/workspace-test/apacheAirflowJobs/settings/pools/pool-42",
			);
		})
		.await;
	let context = context_for(&server);
	let control = context.control_plane_client().expect("Control-plane client should build.");
	let pool_id = control
		.create_pool_template(&serde_json::json!({ "name": "small" }))
		.await
		.expect("Pool template creation should succeed.");

	assert_eq!(pool_id, "pool-42");
}

#[tokio::test]
async fn requirements_by_path_travel_as_query() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let deploy = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{JOB_ROOT}/environment/deployRequirements"))
				.query_param("filePath", "requirements.txt");
			then.status(202);
		})
		.await;
	let context = context_for(&server);
	let control = context.control_plane_client().expect("Control-plane client should build.");
	let response = control
		.update_environment_requirements(Requirements::FilePath("requirements.txt".into()))
		.await
		.expect("Deployment should be accepted.");

	assert_eq!(response.status, 202);

	deploy.assert_async().await;
}

#[tokio::test]
async fn unreachable_api_reports_transport_error() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let (context, _credentials) = build_test_context();
	let config = fabric_airflow_client::config::ResolvedConfiguration::from_explicit(
		test_fields(&server.base_url()).fabric_base_url("http://127.0.0.1:9"),
	);

	context.set_instance(config);

	let crud = context.crud_client().expect("CRUD client should build.");
	let err = crud.get_workspace_info("ws").await.expect_err("Closed port should fail.");

	match err {
		Error::Api(api) => {
			assert_eq!(api.kind, ApiErrorKind::Transport);
			assert_eq!(api.status, None);
		},
		other => panic!("Expected a transport error, got {other:?}."),
	}
}

#[tokio::test]
async fn abandoned_request_keeps_client_and_token_usable() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let _listing = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{JOB_ROOT}/files"));
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(800))
				.body("{\"files\":[]}");
		})
		.await;
	let context = context_for(&server);
	let files = context.files_client().expect("Files client should build.");
	let abandoned =
		tokio::time::timeout(std::time::Duration::from_millis(250), files.list_files(None, None))
			.await;

	assert!(abandoned.is_err());

	let again = context.files_client().expect("Files client should still be cached.");

	assert!(files.api().ptr_eq(again.api()));

	let response = again.list_files(None, None).await.expect("Follow-up listing should succeed.");

	assert_eq!(response.status, 200);

	token.assert_calls_async(1).await;
}
