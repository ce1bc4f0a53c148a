//! Flowdeck Client - HTTP client for Airflow-compatible backends
//!
//! Provides credential storage, the session lifecycle and the REST
//! operations used by the Flowdeck console.

pub mod api;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod session;

pub use api::{DagQuery, DagRunQuery, TaskInstanceQuery};
pub use config::ClientConfig;
pub use credential::{CREDENTIAL_FILE, CredentialStorage, Credentials};
pub use error::{ClientError, ClientResult};
pub use http::ApiClient;
pub use session::Session;

// Re-export shared types for convenience
pub use shared::models::{
    ActionLog, ActionLogPage, ActionType, Dag, DagCollection, DagRun, DagRunCollection,
    DagRunState, Role, TaskInstance, TaskInstanceCollection,
};
