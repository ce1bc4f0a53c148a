//! Credential record and file-backed storage

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use shared::models::Role;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the persisted record file
pub const CREDENTIAL_FILE: &str = "airflow_auth.json";

/// Credential record, persisted as one JSON file between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub server_url: String,
    pub token: Option<String>,
    pub role: Option<Role>,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        server_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            server_url: server_url.into(),
            token: None,
            role: None,
        }
    }

    /// Set the API token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Authorization header value. A token wins over Basic credentials.
    pub fn authorization_value(&self) -> String {
        match &self.token {
            Some(token) => format!("Bearer {}", token),
            None => {
                let pair = format!("{}:{}", self.username, self.password);
                format!("Basic {}", BASE64.encode(pair))
            }
        }
    }

    /// API base URL for this record's server
    pub fn api_base(&self) -> String {
        format!("{}/api", self.server_url.trim_end_matches('/'))
    }
}

/// File-backed credential storage
#[derive(Debug, Clone)]
pub struct CredentialStorage {
    path: PathBuf,
}

impl CredentialStorage {
    /// Create a storage rooted at `base_path`
    pub fn new(base_path: impl Into<PathBuf>, filename: &str) -> Self {
        let path = base_path.into().join(filename);
        Self { path }
    }

    /// Ensure the parent directory exists
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Save the record, overwriting any prior one
    pub fn save(&self, credentials: &Credentials) -> std::io::Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, json)
    }

    /// Load the record. Missing or unreadable files are `None`.
    pub fn load(&self) -> Option<Credentials> {
        if !self.path.exists() {
            return None;
        }
        let json = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&json).ok()
    }

    /// Check whether a record file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// True iff a readable record is present
    pub fn is_authenticated(&self) -> bool {
        self.load().is_some()
    }

    /// Delete the record. Succeeds when the file is already absent.
    pub fn delete(&self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Storage path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header_without_token() {
        let credentials = Credentials::new("alice", "pw", "http://host:8008");
        // base64("alice:pw")
        assert_eq!(credentials.authorization_value(), "Basic YWxpY2U6cHc=");
    }

    #[test]
    fn test_bearer_header_wins_over_basic() {
        let credentials =
            Credentials::new("alice", "pw", "http://host:8008").with_token("jwt-token");
        assert_eq!(credentials.authorization_value(), "Bearer jwt-token");
    }

    #[test]
    fn test_api_base_strips_trailing_slash() {
        let credentials = Credentials::new("alice", "pw", "http://host:8008/");
        assert_eq!(credentials.api_base(), "http://host:8008/api");
    }

    #[test]
    fn test_role_round_trips_through_json() {
        let credentials =
            Credentials::new("alice", "pw", "http://host:8008").with_role(Role::Viewer);
        let json = serde_json::to_string(&credentials).unwrap();
        let loaded: Credentials = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.role, Some(Role::Viewer));
        assert_eq!(loaded, credentials);
    }
}
