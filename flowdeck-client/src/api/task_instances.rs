//! Task Instance API

use crate::error::ClientResult;
use crate::http::ApiClient;
use serde::Serialize;
use shared::models::{TaskInstance, TaskInstanceCollection};

/// Filters for the task instance list
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskInstanceQuery {
    /// State filter, forwarded verbatim (comma-separated for multiple)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl ApiClient {
    // ========== Task Instance API ==========

    /// List task instances of a run
    pub async fn list_task_instances(
        &self,
        dag_id: &str,
        run_id: &str,
        query: &TaskInstanceQuery,
    ) -> ClientResult<TaskInstanceCollection> {
        self.get_with_query(
            &format!("dags/{}/dagRuns/{}/taskInstances", dag_id, run_id),
            query,
        )
        .await
    }

    /// Get a single task instance
    pub async fn get_task_instance(
        &self,
        dag_id: &str,
        run_id: &str,
        task_id: &str,
    ) -> ClientResult<TaskInstance> {
        self.get(&format!(
            "dags/{}/dagRuns/{}/taskInstances/{}",
            dag_id, run_id, task_id
        ))
        .await
    }
}
