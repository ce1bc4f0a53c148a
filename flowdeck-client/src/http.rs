//! HTTP client for network calls against the Airflow REST backend

use crate::credential::Credentials;
use crate::error::{ClientError, ClientResult};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// HTTP client bound to one credential record. The authorization header is
/// computed once at construction; rebinding on credential change is the
/// session's job. Clones share the revocation flag, so a 401 seen by a
/// clone is visible to the owning session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    authorization: Option<String>,
    revoked: Arc<AtomicBool>,
}

impl ApiClient {
    /// Create a client carrying the record's auth header
    pub fn new(credentials: &Credentials, timeout: u64) -> Self {
        Self::build(
            credentials.api_base(),
            Some(credentials.authorization_value()),
            timeout,
        )
    }

    /// Create a client without credentials (login preflight)
    pub fn anonymous(server_url: &str, timeout: u64) -> Self {
        let base_url = format!("{}/api", server_url.trim_end_matches('/'));
        Self::build(base_url, None, timeout)
    }

    fn build(base_url: String, authorization: Option<String>, timeout: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            authorization,
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current authorization header value, if any
    pub fn auth_header(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// True once any request through this client saw a 401
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Relaxed)
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.authorization {
            Some(auth) => request.header(reqwest::header::AUTHORIZATION, auth),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.with_auth(self.client.get(self.url(path)));
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.with_auth(self.client.get(self.url(path)).query(query));
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Make a GET request returning the raw body text
    pub async fn get_text(&self, path: &str) -> ClientResult<String> {
        let request = self.with_auth(self.client.get(self.url(path)));
        let response = request.send().await?;
        self.handle_text_response(response).await
    }

    /// Make a GET request with query parameters, returning the raw body text
    pub async fn get_text_with_query<Q>(&self, path: &str, query: &Q) -> ClientResult<String>
    where
        Q: Serialize + ?Sized,
    {
        let request = self.with_auth(self.client.get(self.url(path)).query(query));
        let response = request.send().await?;
        self.handle_text_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let request = self.with_auth(self.client.post(self.url(path)).json(body));
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Make a POST request with JSON body, ignoring the response body
    pub async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<()> {
        let request = self.with_auth(self.client.post(self.url(path)).json(body));
        let response = request.send().await?;
        self.handle_empty_response(response).await
    }

    /// Make a PATCH request with JSON body
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let request = self.with_auth(self.client.patch(self.url(path)).json(body));
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Make a DELETE request, ignoring the response body
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let request = self.with_auth(self.client.delete(self.url(path)));
        let response = request.send().await?;
        self.handle_empty_response(response).await
    }

    /// Handle the HTTP response, decoding a JSON body
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let text = self.handle_text_response(response).await?;
        serde_json::from_str(&text).map_err(Into::into)
    }

    /// Handle the HTTP response, keeping the body as text
    async fn handle_text_response(&self, response: reqwest::Response) -> ClientResult<String> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(self.status_error(status, text));
        }
        Ok(text)
    }

    /// Handle the HTTP response, discarding any body
    async fn handle_empty_response(&self, response: reqwest::Response) -> ClientResult<()> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return Err(self.status_error(status, text));
        }
        Ok(())
    }

    pub(crate) fn status_error(&self, status: StatusCode, body: String) -> ClientError {
        if status == StatusCode::UNAUTHORIZED {
            self.revoked.store(true, Ordering::Relaxed);
        }

        let message = extract_error_message(&body).unwrap_or_else(|| {
            format!(
                "Error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        });

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            s if s.is_server_error() => ClientError::Internal(message),
            s => ClientError::Status {
                status: s.as_u16(),
                message,
            },
        }
    }
}

/// Best-effort extraction of a human-readable message from an error body:
/// a bare string body wins, then the `message`, `error` and `detail`
/// fields of a JSON object, then the raw body itself.
fn extract_error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(s)) => Some(s),
        Ok(value) => ["message", "error", "detail"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string)),
        Err(_) => Some(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_carries_bearer_header() {
        let credentials = Credentials::new("alice", "pw", "http://host:8008").with_token("jwt");
        let client = ApiClient::new(&credentials, 30);
        assert_eq!(client.auth_header(), Some("Bearer jwt"));
        assert!(!client.is_revoked());
    }

    #[test]
    fn test_client_carries_basic_header() {
        let credentials = Credentials::new("alice", "pw", "http://host:8008");
        let client = ApiClient::new(&credentials, 30);
        assert_eq!(client.auth_header(), Some("Basic YWxpY2U6cHc="));
    }

    #[test]
    fn test_anonymous_client_has_no_header() {
        let client = ApiClient::anonymous("http://host:8008", 30);
        assert_eq!(client.auth_header(), None);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::anonymous("http://host:8008/", 30);
        assert_eq!(client.url("/dags"), "http://host:8008/api/dags");
        assert_eq!(client.url("dags/etl"), "http://host:8008/api/dags/etl");
    }

    #[test]
    fn test_extract_message_prefers_string_body() {
        assert_eq!(
            extract_error_message("\"DAG not found\"").as_deref(),
            Some("DAG not found")
        );
        assert_eq!(
            extract_error_message(r#"{"message": "nope", "error": "other"}"#).as_deref(),
            Some("nope")
        );
        assert_eq!(
            extract_error_message(r#"{"error": "broken"}"#).as_deref(),
            Some("broken")
        );
        assert_eq!(
            extract_error_message(r#"{"detail": "state transition not allowed"}"#).as_deref(),
            Some("state transition not allowed")
        );
        assert_eq!(
            extract_error_message("plain text failure").as_deref(),
            Some("plain text failure")
        );
        assert_eq!(extract_error_message("  "), None);
        assert_eq!(extract_error_message(r#"{"code": 1}"#), None);
    }

    #[test]
    fn test_401_revokes_and_maps_to_unauthorized() {
        let client = ApiClient::anonymous("http://host:8008", 30);
        let err = client.status_error(StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, ClientError::Unauthorized));
        assert!(client.is_revoked());
    }

    #[test]
    fn test_status_mapping() {
        let client = ApiClient::anonymous("http://host:8008", 30);
        assert!(matches!(
            client.status_error(StatusCode::FORBIDDEN, String::new()),
            ClientError::Forbidden(_)
        ));
        assert!(matches!(
            client.status_error(StatusCode::NOT_FOUND, String::new()),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            client.status_error(StatusCode::BAD_REQUEST, String::new()),
            ClientError::Validation(_)
        ));
        assert!(matches!(
            client.status_error(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            ClientError::Internal(_)
        ));
        assert!(matches!(
            client.status_error(StatusCode::CONFLICT, String::new()),
            ClientError::Status { status: 409, .. }
        ));
        assert!(!client.is_revoked()); // Only 401 revokes
    }

    #[test]
    fn test_fallback_message_carries_status() {
        let client = ApiClient::anonymous("http://host:8008", 30);
        let err = client.status_error(StatusCode::CONFLICT, String::new());
        assert_eq!(err.user_message(), "Error 409: Conflict");
    }
}
