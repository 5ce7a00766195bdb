//! Airflow's own REST API, reached directly on the job's webserver.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest, ApiResponse},
};

/// Filters for [`NativeClient::list_dags`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListDags {
	/// Page size.
	pub limit: Option<u32>,
	/// Items to skip.
	pub offset: Option<u32>,
	/// Sort field, `-` prefixed for descending.
	pub order_by: Option<String>,
	/// Only DAGs carrying all of these tags.
	pub tags: Vec<String>,
	/// Only active DAGs.
	pub only_active: Option<bool>,
	/// Only paused (`true`) or unpaused (`false`) DAGs.
	pub paused: Option<bool>,
}

/// New DAG run submitted by [`NativeClient::trigger_dag`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TriggerDagRun {
	/// Run id; generated by Airflow when absent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dag_run_id: Option<String>,
	/// Logical date of the run.
	#[serde(
		rename = "execution_date",
		skip_serializing_if = "Option::is_none",
		with = "time::serde::rfc3339::option"
	)]
	pub logical_date: Option<OffsetDateTime>,
	/// Run configuration passed to the DAG.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub conf: Option<serde_json::Value>,
	/// Free-text note.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
}

/// Airflow REST API client (`api/v1`).
#[derive(Clone, Debug)]
pub struct NativeClient {
	api: ApiClient,
}
impl NativeClient {
	/// Wraps `api`, which must point at the Airflow webserver.
	pub fn new(api: ApiClient) -> Self {
		Self { api }
	}

	/// Underlying request client.
	pub fn api(&self) -> &ApiClient {
		&self.api
	}

	/// Lists DAGs.
	pub async fn list_dags(&self, filter: &ListDags) -> Result<ApiResponse> {
		let mut request = ApiRequest::get("api/v1/dags")
			.query_opt("limit", filter.limit.map(|limit| limit.to_string()))
			.query_opt("offset", filter.offset.map(|offset| offset.to_string()))
			.query_opt("order_by", filter.order_by.clone());

		for tag in &filter.tags {
			request = request.query("tags", tag.clone());
		}

		let request = request
			.query_opt("only_active", filter.only_active.map(|flag| flag.to_string()))
			.query_opt("paused", filter.paused.map(|flag| flag.to_string()));

		self.api.execute(request).await
	}

	/// Triggers a new run of `dag_id`.
	pub async fn trigger_dag(&self, dag_id: &str, run: &TriggerDagRun) -> Result<ApiResponse> {
		self.api.post_json(format!("api/v1/dags/{dag_id}/dagRuns"), run).await
	}

	/// Reads one DAG run.
	pub async fn get_dag_run(&self, dag_id: &str, dag_run_id: &str) -> Result<ApiResponse> {
		self.api.get(format!("api/v1/dags/{dag_id}/dagRuns/{dag_run_id}")).await
	}

	/// Webserver health (`/health`).
	pub async fn health_check(&self) -> Result<ApiResponse> {
		self.api.get("health").await
	}

	/// Airflow version information.
	pub async fn get_version(&self) -> Result<ApiResponse> {
		self.api.get("api/v1/version").await
	}
}
