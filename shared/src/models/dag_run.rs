//! DAG Run Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run state reported by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DagRunState {
    Queued,
    Running,
    Success,
    Failed,
    /// Forward compatibility with states this client does not know
    #[serde(other)]
    Unknown,
}

impl DagRunState {
    pub fn as_str(self) -> &'static str {
        match self {
            DagRunState::Queued => "queued",
            DagRunState::Running => "running",
            DagRunState::Success => "success",
            DagRunState::Failed => "failed",
            DagRunState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DagRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of a DAG
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagRun {
    pub dag_run_id: String,
    pub dag_id: String,
    pub state: Option<DagRunState>,
    pub logical_date: Option<String>,
    pub execution_date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub run_type: Option<String>,
    #[serde(default)]
    pub external_trigger: bool,
    pub conf: Option<serde_json::Value>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagRunCollection {
    pub dag_runs: Vec<DagRun>,
    #[serde(default)]
    pub total_entries: i64,
}

/// Payload for triggering a run; everything is optional, the scheduler
/// fills in run id and logical date when absent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagRunCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dag_run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// State transition payload (queued, success or failed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagRunStateUpdate {
    pub state: DagRunState,
}

/// Clear payload; an empty task list clears the whole run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagRunClearRequest {
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_dag_runs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagRunNoteUpdate {
    pub note: Option<String>,
}

/// Dataset event that fed a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEvent {
    pub dataset_id: Option<i64>,
    pub dataset_uri: Option<String>,
    pub source_dag_id: Option<String>,
    pub source_run_id: Option<String>,
    pub source_task_id: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEventCollection {
    pub dataset_events: Vec<DatasetEvent>,
    #[serde(default)]
    pub total_entries: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unknown_state_does_not_fail_the_list() {
        let run: DagRun = serde_json::from_str(
            r#"{"dag_run_id": "manual__1", "dag_id": "etl_daily", "state": "deferred"}"#,
        )
        .unwrap();
        assert_eq!(run.state, Some(DagRunState::Unknown));
    }

    #[test]
    fn test_create_payload_omits_absent_fields() {
        let payload = DagRunCreate {
            dag_run_id: Some("manual__1".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"dag_run_id":"manual__1"}"#);
    }

    #[test]
    fn test_create_payload_serializes_logical_date_utc() {
        let payload = DagRunCreate {
            logical_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            ..Default::default()
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("2024-03-01T12:00:00Z"));
    }

    #[test]
    fn test_state_update_wire_name() {
        let json = serde_json::to_string(&DagRunStateUpdate {
            state: DagRunState::Failed,
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"failed"}"#);
    }
}
