//! DAG Action Log Model
//!
//! Audit records of mutating DAG operations. The audit backend speaks
//! camelCase, unlike the scheduler's snake_case.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Triggered,
    Paused,
    Unpaused,
    Deleted,
    Cleared,
    TaskStateChanged,
    #[serde(other)]
    Other,
}

/// All concrete action types, in audit-filter display order
pub const ALL_ACTION_TYPES: [ActionType; 7] = [
    ActionType::Triggered,
    ActionType::Paused,
    ActionType::Unpaused,
    ActionType::Deleted,
    ActionType::Cleared,
    ActionType::TaskStateChanged,
    ActionType::Other,
];

impl ActionType {
    /// Wire name, also used in filter URLs
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Triggered => "TRIGGERED",
            ActionType::Paused => "PAUSED",
            ActionType::Unpaused => "UNPAUSED",
            ActionType::Deleted => "DELETED",
            ActionType::Cleared => "CLEARED",
            ActionType::TaskStateChanged => "TASK_STATE_CHANGED",
            ActionType::Other => "OTHER",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub id: i64,
    pub username: String,
    pub dag_id: String,
    pub action_type: ActionType,
    pub action_details: Option<String>,
    /// `yyyy-MM-ddTHH:mm:ss`, UTC, no zone suffix
    pub timestamp: String,
    #[serde(default)]
    pub success: bool,
    pub run_id: Option<String>,
}

/// One audit page: `{logs, totalCount, page, size}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogPage {
    #[serde(default)]
    pub logs: Vec<ActionLog>,
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
}

impl ActionLogPage {
    /// The normalization target for malformed audit payloads
    pub fn empty(page: u32, size: u32) -> Self {
        Self {
            logs: Vec::new(),
            total_count: 0,
            page,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_wire_names() {
        let log: ActionLog = serde_json::from_str(
            r#"{
                "id": 7,
                "username": "alice",
                "dagId": "etl_daily",
                "actionType": "TASK_STATE_CHANGED",
                "actionDetails": "extract -> failed",
                "timestamp": "2024-03-01T12:00:00",
                "success": true,
                "runId": "manual__1"
            }"#,
        )
        .unwrap();
        assert_eq!(log.dag_id, "etl_daily");
        assert_eq!(log.action_type, ActionType::TaskStateChanged);
        assert_eq!(log.run_id.as_deref(), Some("manual__1"));
    }

    #[test]
    fn test_unknown_action_type_maps_to_other() {
        let log: ActionLog = serde_json::from_str(
            r#"{"id": 1, "username": "alice", "dagId": "d", "actionType": "REPARSED",
                "timestamp": "2024-03-01T12:00:00", "success": false}"#,
        )
        .unwrap();
        assert_eq!(log.action_type, ActionType::Other);
    }

    #[test]
    fn test_empty_page_normalization_target() {
        let page = ActionLogPage::empty(3, 20);
        assert!(page.logs.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.page, 3);
        assert_eq!(page.size, 20);
    }
}
