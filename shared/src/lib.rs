//! Shared types for Flowdeck
//!
//! Wire DTOs for the Airflow admin domain and the RBAC role model,
//! used by both flowdeck-client and flowdeck-console.

pub mod client;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Role re-exports (for convenient permission checks)
pub use models::role::{Role, has_permission};
