//! Apache Airflow job items: create, read, update definition, delete, and workspace lookups.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest, ApiResponse, client::to_json, files},
};

/// Fabric items API client scoped to Apache Airflow jobs. Workspace ids are passed per call.
#[derive(Clone, Debug)]
pub struct CrudClient {
	api: ApiClient,
}
impl CrudClient {
	/// Wraps `api`, which must point at the Fabric API.
	pub fn new(api: ApiClient) -> Self {
		Self { api }
	}

	/// Underlying request client.
	pub fn api(&self) -> &ApiClient {
		&self.api
	}

	/// Creates an empty Airflow job.
	pub async fn create_airflow_job<T>(&self, workspace_id: &str, item: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.api.post_json(files::jobs_root(workspace_id), item).await
	}

	/// Creates an Airflow job together with its definition parts.
	pub async fn create_airflow_job_with_definition<T>(
		&self,
		workspace_id: &str,
		item: &T,
	) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.api.post_json(format!("v1/workspaces/{workspace_id}/items"), item).await
	}

	/// Reads job metadata.
	pub async fn get_airflow_job(
		&self,
		workspace_id: &str,
		airflow_job_id: &str,
	) -> Result<ApiResponse> {
		self.api.get(files::job_root(workspace_id, airflow_job_id)).await
	}

	/// Reads the job definition. `format` is only sent when it is not `json`.
	pub async fn get_airflow_job_definition(
		&self,
		workspace_id: &str,
		airflow_job_id: &str,
		format: Option<&str>,
	) -> Result<ApiResponse> {
		let path = format!("{}/getDefinition", files::job_root(workspace_id, airflow_job_id));
		let request =
			ApiRequest::post(path).query_opt("format", format.filter(|format| *format != "json"));

		self.api.execute(request).await
	}

	/// Lists Airflow jobs in the workspace.
	pub async fn list_airflow_jobs(
		&self,
		workspace_id: &str,
		continuation_token: Option<&str>,
	) -> Result<ApiResponse> {
		let request = ApiRequest::get(files::jobs_root(workspace_id))
			.query_opt("continuationToken", continuation_token);

		self.api.execute(request).await
	}

	/// Replaces the job definition.
	pub async fn update_airflow_job_definition<T>(
		&self,
		workspace_id: &str,
		airflow_job_id: &str,
		definition: &T,
		update_metadata: bool,
	) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		let path = format!("{}/updateDefinition", files::job_root(workspace_id, airflow_job_id));
		let request = ApiRequest::post(path)
			.query("updateMetadata", update_metadata.to_string())
			.json(to_json(definition)?);

		self.api.execute(request).await
	}

	/// Deletes the job.
	pub async fn delete_airflow_job(
		&self,
		workspace_id: &str,
		airflow_job_id: &str,
	) -> Result<ApiResponse> {
		self.api.delete(files::job_root(workspace_id, airflow_job_id)).await
	}

	/// Reads workspace details.
	pub async fn get_workspace_info(&self, workspace_id: &str) -> Result<ApiResponse> {
		self.api.get(format!("v1/workspaces/{workspace_id}")).await
	}

	/// Lists workspace items, optionally filtered by item type.
	pub async fn list_workspace_items(
		&self,
		workspace_id: &str,
		item_type: Option<&str>,
		continuation_token: Option<&str>,
	) -> Result<ApiResponse> {
		let request = ApiRequest::get(format!("v1/workspaces/{workspace_id}/items"))
			.query_opt("type", item_type)
			.query_opt("continuationToken", continuation_token);

		self.api.execute(request).await
	}
}
