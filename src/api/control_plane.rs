//! Workspace Airflow settings, pool templates and job environment management.

// self
use crate::{
	_prelude::*,
	api::{
		ApiClient, ApiRequest, ApiResponse,
		client::to_json,
		files::{self, FileContent},
	},
	error::{ApiError, ApiErrorKind},
};

/// Source of the requirements deployed to a job environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirements {
	/// Path of a requirements file already stored on the job, sent as the `filePath` query.
	FilePath(String),
	/// Requirements content sent as the request body.
	Content(FileContent),
}

/// Control-plane API of one Airflow job.
#[derive(Clone, Debug)]
pub struct ControlPlaneClient {
	api: ApiClient,
	workspace_id: String,
	airflow_job_id: String,
}
impl ControlPlaneClient {
	/// Binds `api` to one workspace and job.
	pub fn new(
		api: ApiClient,
		workspace_id: impl Into<String>,
		airflow_job_id: impl Into<String>,
	) -> Self {
		Self { api, workspace_id: workspace_id.into(), airflow_job_id: airflow_job_id.into() }
	}

	/// Underlying request client.
	pub fn api(&self) -> &ApiClient {
		&self.api
	}

	/// Reads workspace-level Airflow settings.
	pub async fn get_workspace_settings(&self) -> Result<ApiResponse> {
		self.api.get(self.settings_path("")).await
	}

	/// Patches workspace-level Airflow settings.
	pub async fn patch_workspace_settings<T>(&self, settings: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.api.patch_json(self.settings_path(""), settings).await
	}

	/// Creates a pool template and returns its id, taken from the `Location` header.
	pub async fn create_pool_template<T>(&self, template: &T) -> Result<String>
	where
		T: ?Sized + Serialize,
	{
		let response = self.api.post_json(self.settings_path("/pools"), template).await?;

		pool_id_from_location(&response).ok_or_else(|| {
			ApiError {
				kind: ApiErrorKind::Unexpected,
				status: Some(response.status),
				message: "Pool created but the Location header carries no pool id".into(),
				request_id: None,
				body: None,
				headers: response.headers.clone(),
				source: None,
			}
			.into()
		})
	}

	/// Lists pool templates.
	pub async fn list_pool_templates(&self) -> Result<ApiResponse> {
		self.api.get(self.settings_path("/pools")).await
	}

	/// Reads one pool template.
	pub async fn get_pool_template(&self, pool_template_id: &str) -> Result<ApiResponse> {
		self.api.get(self.settings_path(&format!("/pools/{pool_template_id}"))).await
	}

	/// Deletes one pool template.
	pub async fn delete_pool_template(&self, pool_template_id: &str) -> Result<ApiResponse> {
		self.api.delete(self.settings_path(&format!("/pools/{pool_template_id}"))).await
	}

	/// Starts the job environment.
	pub async fn start_environment(&self) -> Result<ApiResponse> {
		self.api.execute(ApiRequest::post(self.environment_path("/start"))).await
	}

	/// Stops the job environment.
	pub async fn stop_environment(&self) -> Result<ApiResponse> {
		self.api.execute(ApiRequest::post(self.environment_path("/stop"))).await
	}

	/// Reads the environment status.
	pub async fn get_environment_status(&self) -> Result<ApiResponse> {
		self.api.get(self.environment_path("")).await
	}

	/// Reads environment logs, optionally narrowed by an OData `$filter`.
	pub async fn get_environment_logs(&self, log_filter: Option<&str>) -> Result<ApiResponse> {
		let request =
			ApiRequest::get(self.environment_path("/logs")).query_opt("$filter", log_filter);

		self.api.execute(request).await
	}

	/// Lists installed libraries.
	pub async fn get_environment_libraries(&self) -> Result<ApiResponse> {
		self.api.get(self.environment_path("/libraries")).await
	}

	/// Deploys Python requirements to the environment.
	pub async fn update_environment_requirements(
		&self,
		requirements: Requirements,
	) -> Result<ApiResponse> {
		let request = ApiRequest::post(self.environment_path("/deployRequirements"));
		let request = match requirements {
			Requirements::FilePath(path) => request.query("filePath", path),
			Requirements::Content(content) => files::with_content(request, content),
		};

		self.api.execute(request).await
	}

	/// Reads environment settings.
	pub async fn get_environment_settings(&self) -> Result<ApiResponse> {
		self.api.get(self.environment_path("/settings")).await
	}

	/// Updates environment settings.
	pub async fn update_environment_settings<T>(&self, settings: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.post(self.environment_path("/updateSettings"), settings).await
	}

	/// Reads the environment compute configuration.
	pub async fn get_environment_compute(&self) -> Result<ApiResponse> {
		self.api.get(self.environment_path("/compute")).await
	}

	/// Updates the environment compute configuration.
	pub async fn update_environment_compute<T>(&self, compute: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.post(self.environment_path("/updateCompute"), compute).await
	}

	/// Changes the Airflow runtime version.
	pub async fn update_environment_version<T>(&self, version: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.post(self.environment_path("/updateVersion"), version).await
	}

	/// Reads the environment storage configuration.
	pub async fn get_environment_storage(&self) -> Result<ApiResponse> {
		self.api.get(self.environment_path("/storage")).await
	}

	/// Updates the environment storage configuration.
	pub async fn update_environment_storage<T>(&self, storage: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.post(self.environment_path("/updateStorage"), storage).await
	}

	async fn post<T>(&self, path: String, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.api.execute(ApiRequest::post(path).json(to_json(body)?)).await
	}

	fn settings_path(&self, suffix: &str) -> String {
		format!("{}/settings{suffix}", files::jobs_root(&self.workspace_id))
	}

	fn environment_path(&self, suffix: &str) -> String {
		format!(
			"{}/environment{suffix}",
			files::job_root(&self.workspace_id, &self.airflow_job_id)
		)
	}
}

fn pool_id_from_location(response: &ApiResponse) -> Option<String> {
	response
		.header("location")?
		.trim_end_matches('/')
		.rsplit('/')
		.next()
		.filter(|segment| !segment.is_empty())
		.map(str::to_owned)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::api::ResponseBody;

	fn created(location: Option<&str>) -> ApiResponse {
		let mut headers = BTreeMap::new();

		if let Some(location) = location {
			headers.insert("location".to_owned(), location.to_owned());
		}

		ApiResponse { status: 201, headers, body: ResponseBody::Empty }
	}

	#[test]
	fn pool_id_is_last_location_segment() {
		assert_eq!(
			pool_id_from_location(&created(Some(
				"https://api.fabric.microsoft.com/v1/workspaces/ws/apacheAirflowJobs/settings/pools/6f1c2a"
			))),
			Some("6f1c2a".into())
		);
		assert_eq!(pool_id_from_location(&created(Some("pools/abc/"))), Some("abc".into()));
		assert_eq!(pool_id_from_location(&created(None)), None);
	}
}
