//! Auth types shared between the client library and the console
//!
//! Request/response shapes for the two backend login flavors.

use serde::{Deserialize, Serialize};

/// Login request (token flavor)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response (token flavor). The role arrives as a raw string and is
/// parsed into `models::Role` at the session boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl LoginResponse {
    /// Display name for logs and the status line
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_camel_case() {
        let response: LoginResponse = serde_json::from_str(
            r#"{
                "token": "jwt",
                "username": "alice",
                "firstName": "Alice",
                "lastName": "Ops",
                "email": "alice@example.com",
                "role": "OP"
            }"#,
        )
        .unwrap();
        assert_eq!(response.display_name(), "Alice Ops");
        assert_eq!(response.role.as_deref(), Some("OP"));
    }

    #[test]
    fn test_login_response_without_profile() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"token": "jwt", "username": "alice"}"#).unwrap();
        assert_eq!(response.display_name(), "alice");
        assert_eq!(response.role, None);
    }
}
