//! DAG Model

use serde::{Deserialize, Serialize};

/// DAG as listed by the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dag {
    pub dag_id: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_paused: bool,
    pub description: Option<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    pub schedule_interval: Option<ScheduleInterval>,
    #[serde(default)]
    pub tags: Vec<DagTag>,
    pub fileloc: Option<String>,
    pub last_parsed_time: Option<String>,
    pub timetable_description: Option<String>,
}

/// Schedule interval union; the scheduler tags the concrete shape in `__type`
/// (e.g. CronExpression carries `value`, TimeDelta does not)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInterval {
    #[serde(rename = "__type")]
    pub interval_type: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagTag {
    pub name: String,
}

/// Pause-toggle payload (the only mutable DAG field)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagUpdate {
    pub is_paused: bool,
}

/// DAG list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagCollection {
    pub dags: Vec<Dag>,
    #[serde(default)]
    pub total_entries: i64,
}

/// Extended detail view of a single DAG
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagDetail {
    #[serde(flatten)]
    pub dag: Dag,
    pub catchup: Option<bool>,
    pub next_dagrun: Option<String>,
    pub max_active_runs: Option<i64>,
    pub has_import_errors: Option<bool>,
}

/// Task definition within a DAG (not an execution)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_id: String,
    pub owner: Option<String>,
    pub class_ref: Option<ClassRef>,
    pub trigger_rule: Option<String>,
    #[serde(default)]
    pub depends_on_past: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRef {
    pub module_path: Option<String>,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCollection {
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub total_entries: i64,
}

impl Dag {
    /// One-line schedule summary for list views
    pub fn schedule_summary(&self) -> String {
        match &self.schedule_interval {
            Some(interval) => match &interval.value {
                Some(value) => value.clone(),
                None => interval.interval_type.clone(),
            },
            None => "None".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dag_deserializes_sparse_payload() {
        // Scheduler payloads often omit everything but the id
        let dag: Dag = serde_json::from_str(r#"{"dag_id": "etl_daily"}"#).unwrap();
        assert_eq!(dag.dag_id, "etl_daily");
        assert!(!dag.is_paused);
        assert!(dag.owners.is_empty());
        assert_eq!(dag.schedule_summary(), "None");
    }

    #[test]
    fn test_schedule_interval_type_tag() {
        let dag: Dag = serde_json::from_str(
            r#"{
                "dag_id": "etl_daily",
                "schedule_interval": {"__type": "CronExpression", "value": "0 0 * * *"}
            }"#,
        )
        .unwrap();
        assert_eq!(dag.schedule_summary(), "0 0 * * *");

        let dag: Dag = serde_json::from_str(
            r#"{"dag_id": "etl_daily", "schedule_interval": {"__type": "TimeDelta"}}"#,
        )
        .unwrap();
        assert_eq!(dag.schedule_summary(), "TimeDelta");
    }

    #[test]
    fn test_dag_detail_flattens_base_fields() {
        let detail: DagDetail = serde_json::from_str(
            r#"{"dag_id": "etl_daily", "is_paused": true, "max_active_runs": 16}"#,
        )
        .unwrap();
        assert_eq!(detail.dag.dag_id, "etl_daily");
        assert!(detail.dag.is_paused);
        assert_eq!(detail.max_active_runs, Some(16));
    }
}
