//! DAG Run API

use crate::error::ClientResult;
use crate::http::ApiClient;
use serde::Serialize;
use shared::models::{
    DagRun, DagRunClearRequest, DagRunCollection, DagRunCreate, DagRunNoteUpdate, DagRunState,
    DagRunStateUpdate, DatasetEventCollection,
};

/// Filters for the run list
#[derive(Debug, Clone, Default, Serialize)]
pub struct DagRunQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<DagRunState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dag_run_id: Option<String>,
}

impl ApiClient {
    // ========== DAG Run API ==========

    /// List runs of a DAG
    pub async fn list_dag_runs(
        &self,
        dag_id: &str,
        query: &DagRunQuery,
    ) -> ClientResult<DagRunCollection> {
        self.get_with_query(&format!("dags/{}/dagRuns", dag_id), query)
            .await
    }

    /// Trigger a new run
    pub async fn trigger_dag_run(
        &self,
        dag_id: &str,
        create: &DagRunCreate,
    ) -> ClientResult<DagRun> {
        tracing::info!("Triggering run for DAG {}", dag_id);
        self.post(&format!("dags/{}/dagRuns", dag_id), create).await
    }

    /// Get a single run
    pub async fn get_dag_run(&self, dag_id: &str, run_id: &str) -> ClientResult<DagRun> {
        self.get(&format!("dags/{}/dagRuns/{}", dag_id, run_id))
            .await
    }

    /// Delete a run
    pub async fn delete_dag_run(&self, dag_id: &str, run_id: &str) -> ClientResult<()> {
        tracing::info!("Deleting run {} of DAG {}", run_id, dag_id);
        self.delete(&format!("dags/{}/dagRuns/{}", dag_id, run_id))
            .await
    }

    /// Move a run to a new state (queued, success or failed)
    pub async fn update_dag_run_state(
        &self,
        dag_id: &str,
        run_id: &str,
        state: DagRunState,
    ) -> ClientResult<DagRun> {
        tracing::info!("Marking run {} of DAG {} as {}", run_id, dag_id, state);
        self.patch(
            &format!("dags/{}/dagRuns/{}", dag_id, run_id),
            &DagRunStateUpdate { state },
        )
        .await
    }

    /// Clear a run so its tasks re-execute
    pub async fn clear_dag_run(
        &self,
        dag_id: &str,
        run_id: &str,
        request: &DagRunClearRequest,
    ) -> ClientResult<DagRun> {
        tracing::info!("Clearing run {} of DAG {}", run_id, dag_id);
        self.post(&format!("dags/{}/dagRuns/{}/clear", dag_id, run_id), request)
            .await
    }

    /// Attach or replace the run's note
    pub async fn set_dag_run_note(
        &self,
        dag_id: &str,
        run_id: &str,
        note: Option<String>,
    ) -> ClientResult<DagRun> {
        self.patch(
            &format!("dags/{}/dagRuns/{}/setNote", dag_id, run_id),
            &DagRunNoteUpdate { note },
        )
        .await
    }

    /// List dataset events that fed a run
    pub async fn get_upstream_dataset_events(
        &self,
        dag_id: &str,
        run_id: &str,
    ) -> ClientResult<DatasetEventCollection> {
        self.get(&format!(
            "dags/{}/dagRuns/{}/upstreamDatasetEvents",
            dag_id, run_id
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_query_wire_names() {
        let query = DagRunQuery {
            state: Some(DagRunState::Running),
            dag_run_id: Some("manual__1".to_string()),
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["state"], "running");
        assert_eq!(value["dag_run_id"], "manual__1");
    }

    #[test]
    fn test_empty_run_query_serializes_to_nothing() {
        let value = serde_json::to_value(&DagRunQuery::default()).unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }
}
