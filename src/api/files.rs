//! DAG, plugin and requirement files stored on an Apache Airflow job.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest, ApiResponse},
};

/// File content uploaded to a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileContent {
	/// UTF-8 text, sent as `text/plain`.
	Text(String),
	/// Arbitrary bytes, sent as `application/octet-stream`.
	Bytes(Vec<u8>),
}
impl From<String> for FileContent {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<&str> for FileContent {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
impl From<Vec<u8>> for FileContent {
	fn from(value: Vec<u8>) -> Self {
		Self::Bytes(value)
	}
}
impl From<&[u8]> for FileContent {
	fn from(value: &[u8]) -> Self {
		Self::Bytes(value.to_vec())
	}
}

pub(crate) fn with_content(request: ApiRequest, content: FileContent) -> ApiRequest {
	match content {
		FileContent::Text(text) => request.text(text),
		FileContent::Bytes(data) => request.bytes(data),
	}
}

/// Files API of one Airflow job (`v1/workspaces/{workspace}/apacheAirflowJobs/{job}/files`).
#[derive(Clone, Debug)]
pub struct FilesClient {
	api: ApiClient,
	workspace_id: String,
	airflow_job_id: String,
}
impl FilesClient {
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

	/// Workspace the client is bound to.
	pub fn workspace_id(&self) -> &str {
		&self.workspace_id
	}

	/// Airflow job the client is bound to.
	pub fn airflow_job_id(&self) -> &str {
		&self.airflow_job_id
	}

	/// Creates or replaces `file_path` (for example `dags/my_dag.py`).
	pub async fn create_or_update_file(
		&self,
		file_path: &str,
		content: impl Into<FileContent>,
	) -> Result<ApiResponse> {
		let request = with_content(ApiRequest::put(self.file_path(file_path)), content.into());

		self.api.execute(request).await
	}

	/// Downloads `file_path`; the body is always raw bytes.
	pub async fn get_file(&self, file_path: &str) -> Result<ApiResponse> {
		self.api.execute(ApiRequest::get(self.file_path(file_path)).stream()).await
	}

	/// Lists files, optionally under `root_path` (`dags`, `plugins`) and from a continuation token.
	pub async fn list_files(
		&self,
		root_path: Option<&str>,
		continuation_token: Option<&str>,
	) -> Result<ApiResponse> {
		let request = ApiRequest::get(format!("{}/files", self.job_root()))
			.query_opt("rootPath", root_path)
			.query_opt("continuationToken", continuation_token);

		self.api.execute(request).await
	}

	/// Deletes `file_path`.
	pub async fn delete_file(&self, file_path: &str) -> Result<ApiResponse> {
		self.api.execute(ApiRequest::delete(self.file_path(file_path))).await
	}

	fn job_root(&self) -> String {
		job_root(&self.workspace_id, &self.airflow_job_id)
	}

	fn file_path(&self, file_path: &str) -> String {
		format!("{}/files/{}", self.job_root(), file_path.trim_start_matches('/'))
	}
}

pub(crate) fn jobs_root(workspace_id: &str) -> String {
	format!("v1/workspaces/{workspace_id}/apacheAirflowJobs")
}

pub(crate) fn job_root(workspace_id: &str, airflow_job_id: &str) -> String {
	format!("{}/{airflow_job_id}", jobs_root(workspace_id))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn content_conversions_pick_content_type() {
		let text = with_content(ApiRequest::put("f"), "print('hi')".into());
		let bytes = with_content(ApiRequest::put("f"), vec![0_u8, 1].into());

		assert!(matches!(
			text.body(),
			crate::api::RequestBody::Bytes { content_type, .. } if content_type == "text/plain"
		));
		assert!(matches!(
			bytes.body(),
			crate::api::RequestBody::Bytes { content_type, .. }
				if content_type == "application/octet-stream"
		));
	}

	#[test]
	fn job_paths() {
		assert_eq!(jobs_root("ws"), "v1/workspaces/ws/apacheAirflowJobs");
		assert_eq!(job_root("ws", "job"), "v1/workspaces/ws/apacheAirflowJobs/job");
	}
}
