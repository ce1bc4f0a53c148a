//! Task Instance Model

use serde::{Deserialize, Serialize};

/// One execution of a single task within a DAG run. Task states form a
/// wider, drifting set than run states, so they stay strings here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInstance {
    pub task_id: String,
    pub dag_id: String,
    #[serde(default)]
    pub dag_run_id: String,
    pub state: Option<String>,
    pub try_number: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub duration: Option<f64>,
    pub operator: Option<String>,
    pub hostname: Option<String>,
    pub map_index: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInstanceCollection {
    pub task_instances: Vec<TaskInstance>,
    #[serde(default)]
    pub total_entries: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_state_is_tolerated() {
        // The scheduler reports unscheduled instances with a null state
        let instance: TaskInstance = serde_json::from_str(
            r#"{"task_id": "extract", "dag_id": "etl_daily", "state": null, "duration": 1.5}"#,
        )
        .unwrap();
        assert_eq!(instance.state, None);
        assert_eq!(instance.duration, Some(1.5));
    }
}
