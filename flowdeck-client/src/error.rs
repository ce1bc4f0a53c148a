//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport failed (no usable response)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Any other non-success status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Credential storage error
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Fixed user-facing message for view-level display. Statuses the
    /// views recognize get a stable wording regardless of what the
    /// backend put in the body.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized => "Authentication failed. Please log in again.".to_string(),
            ClientError::Forbidden(_) => {
                "You do not have permission to perform this action.".to_string()
            }
            ClientError::NotFound(_) => "The requested resource was not found.".to_string(),
            ClientError::Internal(_) => "Server error occurred. Please try again later.".to_string(),
            ClientError::Http(_) => "Network error. Please check your connection.".to_string(),
            ClientError::Validation(message) => message.clone(),
            ClientError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for 403 responses, which views surface as a permission notice
    /// instead of a failure
    pub fn is_permission_error(&self) -> bool {
        matches!(self, ClientError::Forbidden(_))
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_user_messages() {
        assert_eq!(
            ClientError::Unauthorized.user_message(),
            "Authentication failed. Please log in again."
        );
        assert_eq!(
            ClientError::Forbidden("raw body".to_string()).user_message(),
            "You do not have permission to perform this action."
        );
        assert_eq!(
            ClientError::NotFound("gone".to_string()).user_message(),
            "The requested resource was not found."
        );
        assert_eq!(
            ClientError::Internal("boom".to_string()).user_message(),
            "Server error occurred. Please try again later."
        );
    }

    #[test]
    fn test_other_statuses_carry_their_message() {
        let err = ClientError::Status {
            status: 409,
            message: "Cannot delete a running DAG run".to_string(),
        };
        assert_eq!(err.user_message(), "Cannot delete a running DAG run");
    }

    #[test]
    fn test_permission_error_flag() {
        assert!(ClientError::Forbidden(String::new()).is_permission_error());
        assert!(!ClientError::Unauthorized.is_permission_error());
    }
}
