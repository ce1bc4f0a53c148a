//! Session lifecycle
//!
//! An explicit session object owns the credential store and the client
//! binding; callers pass it down instead of reaching for globals. The
//! binding has two states, absent and bound, and any change to the stored
//! record discards it.

use crate::config::ClientConfig;
use crate::credential::{CREDENTIAL_FILE, CredentialStorage, Credentials};
use crate::error::{ClientError, ClientResult};
use crate::http::ApiClient;
use shared::models::Role;

#[derive(Debug)]
struct BoundClient {
    credentials: Credentials,
    api: ApiClient,
}

/// Session bound to at most one signed-in user
#[derive(Debug)]
pub struct Session {
    config: ClientConfig,
    storage: CredentialStorage,
    bound: Option<BoundClient>,
}

impl Session {
    /// Create a session storing credentials under the configured auth dir
    pub fn new(config: ClientConfig) -> Self {
        let storage = CredentialStorage::new(&config.auth_dir, CREDENTIAL_FILE);
        Self::with_storage(config, storage)
    }

    /// Create a session with an explicit storage location
    pub fn with_storage(config: ClientConfig, storage: CredentialStorage) -> Self {
        Self {
            config,
            storage,
            bound: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn storage(&self) -> &CredentialStorage {
        &self.storage
    }

    /// True iff a credential record is stored
    pub fn is_authenticated(&self) -> bool {
        self.storage.is_authenticated()
    }

    /// Current credential record, if any
    pub fn credentials(&self) -> Option<Credentials> {
        self.storage.load()
    }

    /// Role of the signed-in user, for permission gating
    pub fn role(&self) -> Option<Role> {
        self.storage.load().and_then(|c| c.role)
    }

    /// Username of the signed-in user
    pub fn username(&self) -> Option<String> {
        self.storage.load().map(|c| c.username)
    }

    /// Client bound to the current credentials.
    ///
    /// Rebinds whenever the stored record differs from the bound snapshot,
    /// so a changed user, token or server URL never rides on a stale
    /// header. Fails with `Unauthorized` when no record is stored, or when
    /// the binding was revoked by a 401, in which case the stale record is
    /// cleared first.
    pub fn client(&mut self) -> ClientResult<&ApiClient> {
        if self.bound.as_ref().is_some_and(|b| b.api.is_revoked()) {
            tracing::warn!("Session revoked by server, clearing credentials");
            self.teardown();
            return Err(ClientError::Unauthorized);
        }

        let credentials = self.storage.load().ok_or(ClientError::Unauthorized)?;

        let needs_bind = match &self.bound {
            Some(bound) => bound.credentials != credentials,
            None => true,
        };
        if needs_bind {
            tracing::debug!("Binding API client for {}", credentials.username);
            let api = ApiClient::new(&credentials, self.config.timeout);
            self.bound = Some(BoundClient { credentials, api });
        }

        match &self.bound {
            Some(bound) => Ok(&bound.api),
            None => Err(ClientError::Unauthorized),
        }
    }

    /// Check credentials against the backend without touching session
    /// state.
    ///
    /// Tries the token-issuing login route first; backends that only speak
    /// Basic auth answer 404 there, in which case the credentials are
    /// checked with a Basic preflight instead and the record carries no
    /// token. Free of `self` so callers can run it on a background task
    /// and adopt the record afterwards.
    pub async fn authenticate(
        username: &str,
        password: &str,
        server_url: &str,
        timeout: u64,
    ) -> ClientResult<Credentials> {
        let probe = ApiClient::anonymous(server_url, timeout);

        match probe.login(username, password).await {
            Ok(response) => {
                tracing::info!("Signed in as {} (API token)", response.display_name());
                let role = response.role.as_deref().and_then(Role::parse);
                Ok(Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                    server_url: server_url.to_string(),
                    token: Some(response.token),
                    role,
                })
            }
            Err(ClientError::NotFound(_)) => {
                tracing::debug!("Login route absent, verifying Basic credentials");
                let candidate = Credentials::new(username, password, server_url);
                let verifier = ApiClient::new(&candidate, timeout);
                verifier.verify().await?;
                tracing::info!("Signed in as {} (Basic)", username);
                Ok(candidate)
            }
            Err(e) => Err(e),
        }
    }

    /// Authenticate against the backend and persist the record
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        server_url: &str,
    ) -> ClientResult<Credentials> {
        let credentials =
            Self::authenticate(username, password, server_url, self.config.timeout).await?;
        self.adopt(&credentials)?;
        Ok(credentials)
    }

    /// Persist an already-verified record and drop any stale binding
    pub fn adopt(&mut self, credentials: &Credentials) -> ClientResult<()> {
        self.storage.save(credentials)?;
        self.reset();
        Ok(())
    }

    /// Drop the client binding. Safe to call repeatedly; the next
    /// `client()` call rebinds from the stored record.
    pub fn reset(&mut self) {
        self.bound = None;
    }

    /// Clear the stored record and drop the binding
    pub fn logout(&mut self) {
        tracing::info!("Logging out");
        self.teardown();
    }

    fn teardown(&mut self) {
        self.bound = None;
        if let Err(e) = self.storage.delete() {
            tracing::warn!("Failed to clear stored credentials: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session_in(dir: &TempDir) -> Session {
        let config = ClientConfig::new("http://localhost:8008").with_auth_dir(dir.path());
        Session::new(config)
    }

    #[tokio::test]
    async fn test_revoked_binding_tears_down_the_session() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_in(&temp_dir);
        session
            .storage()
            .save(&Credentials::new("alice", "pw", "http://host:8008"))
            .unwrap();

        let api = session.client().unwrap().clone();
        // A 401 seen by any clone marks the shared revocation flag
        let _ = api.status_error(reqwest::StatusCode::UNAUTHORIZED, String::new());
        assert!(api.is_revoked());

        let err = session.client().unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));
        // The stale record is cleared, the caller lands back on login
        assert!(!session.is_authenticated());
    }
}
