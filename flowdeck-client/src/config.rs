//! Client configuration

use std::path::PathBuf;

/// Server URL assumed when neither the environment nor the stored record
/// names one
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8008";

/// Default directory for the persisted credential record
pub const DEFAULT_AUTH_DIR: &str = "./auth";

/// Client configuration for talking to an Airflow-compatible backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g. "http://localhost:8008"); used as the login
    /// prefill, each credential record carries its own server URL
    pub server_url: String,

    /// Directory holding the persisted credential record
    pub auth_dir: PathBuf,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    /// Create a new configuration with defaults
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            auth_dir: PathBuf::from(DEFAULT_AUTH_DIR),
            timeout: 30,
        }
    }

    /// Read overrides from the environment:
    /// `FLOWDECK_SERVER_URL` and `FLOWDECK_AUTH_DIR`
    pub fn from_env() -> Self {
        let server_url = std::env::var("FLOWDECK_SERVER_URL")
            .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        let auth_dir =
            std::env::var("FLOWDECK_AUTH_DIR").unwrap_or_else(|_| DEFAULT_AUTH_DIR.to_string());
        Self::new(server_url).with_auth_dir(auth_dir)
    }

    /// Set the credential directory
    pub fn with_auth_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.auth_dir = dir.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}
