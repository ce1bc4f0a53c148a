//! Audit and task log API
//!
//! Log endpoints are lenient by contract: the views must survive backend
//! shape drift, so malformed payloads normalize to empty defaults instead
//! of failing the whole screen.

use crate::error::ClientResult;
use crate::http::ApiClient;
use shared::models::{ActionLog, ActionLogPage, ActionType};

/// Placeholder when the task-log endpoint answers with JSON instead of text
pub const TASK_LOG_PLACEHOLDER: &str = "Log data is not available or in an unexpected format.";

impl ApiClient {
    // ========== Log API ==========

    /// One audit page; malformed payloads yield an empty page
    pub async fn get_action_logs(&self, page: u32, size: u32) -> ClientResult<ActionLogPage> {
        let body = self
            .get_text_with_query("logs/dag-actions", &[("page", page), ("size", size)])
            .await?;
        Ok(normalize_page(&body, page, size))
    }

    /// Audit records of one DAG; malformed payloads yield an empty list
    pub async fn get_action_logs_for_dag(&self, dag_id: &str) -> ClientResult<Vec<ActionLog>> {
        let body = self
            .get_text(&format!("logs/dag-actions/dag/{}", dag_id))
            .await?;
        Ok(normalize_list(&body))
    }

    /// Audit records of one action type; malformed payloads yield an empty list
    pub async fn get_action_logs_by_type(
        &self,
        action_type: ActionType,
    ) -> ClientResult<Vec<ActionLog>> {
        let body = self
            .get_text(&format!("logs/dag-actions/type/{}", action_type.as_str()))
            .await?;
        Ok(normalize_list(&body))
    }

    /// Task log text for one try of a task instance
    pub async fn get_task_log(
        &self,
        dag_id: &str,
        run_id: &str,
        task_id: &str,
        try_number: u32,
    ) -> ClientResult<String> {
        let body = self
            .get_text_with_query(
                &format!("logs/{}/dagRuns/{}/taskInstances/{}", dag_id, run_id, task_id),
                &[("tryNumber", try_number)],
            )
            .await?;
        Ok(normalize_task_log(body))
    }
}

fn normalize_page(body: &str, page: u32, size: u32) -> ActionLogPage {
    let value = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) if value.is_object() => value,
        _ => {
            tracing::warn!("Audit page payload is not an object, returning empty page");
            return ActionLogPage::empty(page, size);
        }
    };
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Malformed audit page payload: {}", e);
            ActionLogPage::empty(page, size)
        }
    }
}

fn normalize_list(body: &str) -> Vec<ActionLog> {
    let value = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) if value.is_array() => value,
        _ => {
            tracing::warn!("Audit list payload is not an array, returning no records");
            return Vec::new();
        }
    };
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Malformed audit list payload: {}", e);
            Vec::new()
        }
    }
}

/// The backend serves log text either raw or as a JSON string; any other
/// JSON shape means there is no usable log
fn normalize_task_log(body: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(serde_json::Value::String(text)) => text,
        Ok(_) => TASK_LOG_PLACEHOLDER.to_string(),
        Err(_) => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_normalizes_non_object_payloads() {
        for body in ["[1, 2, 3]", "null", "\"oops\"", "42", "not json at all", ""] {
            let page = normalize_page(body, 2, 20);
            assert!(page.logs.is_empty(), "body {:?} should normalize", body);
            assert_eq!(page.total_count, 0);
            assert_eq!(page.page, 2);
            assert_eq!(page.size, 20);
        }
    }

    #[test]
    fn test_page_parses_valid_payload() {
        let body = r#"{
            "logs": [{
                "id": 1,
                "username": "alice",
                "dagId": "etl_daily",
                "actionType": "PAUSED",
                "timestamp": "2024-03-01T12:00:00",
                "success": true
            }],
            "totalCount": 41,
            "page": 0,
            "size": 20
        }"#;
        let page = normalize_page(body, 0, 20);
        assert_eq!(page.logs.len(), 1);
        assert_eq!(page.total_count, 41);
        assert_eq!(page.logs[0].action_type, ActionType::Paused);
    }

    #[test]
    fn test_page_tolerates_missing_fields() {
        let page = normalize_page("{}", 1, 20);
        assert!(page.logs.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_list_normalizes_non_array_payloads() {
        assert!(normalize_list("{}").is_empty());
        assert!(normalize_list("\"oops\"").is_empty());
        assert!(normalize_list("garbage").is_empty());
        assert!(normalize_list("").is_empty());
    }

    #[test]
    fn test_list_parses_valid_payload() {
        let body = r#"[{
            "id": 1,
            "username": "alice",
            "dagId": "etl_daily",
            "actionType": "DELETED",
            "timestamp": "2024-03-01T12:00:00",
            "success": true
        }]"#;
        let logs = normalize_list(body);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action_type, ActionType::Deleted);
    }

    #[test]
    fn test_task_log_passthrough_and_placeholder() {
        // Raw text passes through untouched
        assert_eq!(
            normalize_task_log("[2024-03-01] task started".to_string()),
            "[2024-03-01] task started"
        );
        // A JSON string unwraps
        assert_eq!(
            normalize_task_log("\"line one\\nline two\"".to_string()),
            "line one\nline two"
        );
        // Structured JSON means no usable log text
        assert_eq!(
            normalize_task_log(r#"{"content": "..."}"#.to_string()),
            TASK_LOG_PLACEHOLDER
        );
        // An empty body stays empty
        assert_eq!(normalize_task_log(String::new()), "");
    }
}
