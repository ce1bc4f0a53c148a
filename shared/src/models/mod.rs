//! Data models
//!
//! Wire shapes consumed from and sent to the Airflow REST backend.
//! Inbound timestamps stay `String` (display-only, tolerant of backend
//! format drift); outbound timestamps are `chrono::DateTime<Utc>`.

pub mod action_log;
pub mod dag;
pub mod dag_run;
pub mod role;
pub mod task_instance;

// Re-exports
pub use action_log::*;
pub use dag::*;
pub use dag_run::*;
pub use role::*;
pub use task_instance::*;
