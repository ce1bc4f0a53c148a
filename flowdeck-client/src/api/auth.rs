//! Auth API

use crate::error::ClientResult;
use crate::http::ApiClient;
use shared::client::{LoginRequest, LoginResponse};

impl ApiClient {
    // ========== Auth API ==========

    /// Login with username and password against a token-issuing backend
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post("auth/login", &request).await
    }

    /// Check the attached Basic credentials. Only the status matters; the
    /// body is ignored.
    pub async fn verify(&self) -> ClientResult<()> {
        self.post_unit("v1/auth/verify", &serde_json::json!({})).await
    }
}
