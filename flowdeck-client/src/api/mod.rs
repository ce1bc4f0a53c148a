//! REST operations grouped by resource
//!
//! Each module extends [`crate::ApiClient`] with one method per endpoint.
//! Servers keep all ordering and consistency guarantees; these wrappers
//! add no retries and no caching.

pub mod auth;
pub mod dag_runs;
pub mod dags;
pub mod logs;
pub mod task_instances;

pub use dag_runs::DagRunQuery;
pub use dags::DagQuery;
pub use task_instances::TaskInstanceQuery;
