//! DAG API

use crate::error::ClientResult;
use crate::http::ApiClient;
use serde::Serialize;
use shared::models::{Dag, DagCollection, DagDetail, DagUpdate, TaskCollection};

/// Filters for the DAG list; absent fields fall back to server defaults
/// (page 0, size 10, no filtering)
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DagQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

impl DagQuery {
    /// Query for one page
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            ..Default::default()
        }
    }

    /// Set the search needle
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Filter by active flag
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Filter by paused flag
    pub fn with_paused(mut self, is_paused: bool) -> Self {
        self.is_paused = Some(is_paused);
        self
    }

    /// Set the sort key, forwarded verbatim (e.g. "dag_id", "-last_parsed_time")
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }
}

impl ApiClient {
    // ========== DAG API ==========

    /// List DAGs with paging and filters
    pub async fn list_dags(&self, query: &DagQuery) -> ClientResult<DagCollection> {
        self.get_with_query("dags", query).await
    }

    /// Get a single DAG
    pub async fn get_dag(&self, dag_id: &str) -> ClientResult<Dag> {
        self.get(&format!("dags/{}", dag_id)).await
    }

    /// Pause or unpause a DAG; returns the updated DAG
    pub async fn set_dag_paused(&self, dag_id: &str, is_paused: bool) -> ClientResult<Dag> {
        tracing::info!("Setting DAG {} paused={}", dag_id, is_paused);
        self.patch(&format!("dags/{}", dag_id), &DagUpdate { is_paused })
            .await
    }

    /// Delete a DAG and its metadata
    pub async fn delete_dag(&self, dag_id: &str) -> ClientResult<()> {
        tracing::info!("Deleting DAG {}", dag_id);
        self.delete(&format!("dags/{}", dag_id)).await
    }

    /// List the DAG's task definitions
    pub async fn get_dag_tasks(&self, dag_id: &str) -> ClientResult<TaskCollection> {
        self.get(&format!("dags/{}/tasks", dag_id)).await
    }

    /// Get the extended detail view of a DAG
    pub async fn get_dag_details(&self, dag_id: &str) -> ClientResult<DagDetail> {
        self.get(&format!("dags/{}/details", dag_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_uses_camel_case_wire_names() {
        let query = DagQuery::page(0, 10)
            .with_search("etl")
            .with_active(true)
            .with_paused(false);
        let value = serde_json::to_value(&query).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object["page"], 0);
        assert_eq!(object["size"], 10);
        assert_eq!(object["search"], "etl");
        assert_eq!(object["isActive"], true);
        assert_eq!(object["isPaused"], false);
        assert!(!object.contains_key("orderBy"));

        let sorted = DagQuery::default().with_order_by("-last_parsed_time");
        let value = serde_json::to_value(&sorted).unwrap();
        assert_eq!(value.as_object().unwrap()["orderBy"], "-last_parsed_time");
    }

    #[test]
    fn test_empty_query_serializes_to_nothing() {
        let value = serde_json::to_value(&DagQuery::default()).unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }
}
