//! Authenticated session.
//!
//! The session owns the client id and the token pair. Every request goes
//! through [`Session::authenticated_request`], which attaches credentials and
//! recovers from an expired access token by refreshing once and reissuing
//! the request.
//!
//! ## Single-flight refresh
//!
//! Each token install bumps a generation counter. A caller captures the
//! generation together with the token it sent; after a 401 it takes the
//! refresh gate and only talks to the server if the generation is still the
//! one it observed. Concurrent callers that hit the same expired token
//! therefore share one refresh.

use crate::channel::ChannelCredentials;
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ClientError, ClientResult};
use crate::transport::{FormField, HttpRequest, HttpResponse, HttpTransport, RequestBody};
use async_trait::async_trait;
use larder_core::crypto::CredentialRecord;
use larder_protocol::ProtocolError;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Path of the credential fetch.
pub const AUTH_TOKEN_PATH: &str = "auth/token";
/// Path of the token refresh.
pub const AUTH_REFRESH_PATH: &str = "auth/token/refresh";

/// Header carrying the client id.
pub const CLIENT_ID_HEADER: &str = "X-AnyLeaf-Client-Identifier";
/// Header carrying the API version.
pub const API_VERSION_HEADER: &str = "X-AnyLeaf-API-Version";

#[derive(Debug, Default)]
struct TokenState {
    client_id: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    user_id: Option<String>,
    generation: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    user_id: Option<String>,
}

/// One authenticated connection to an account.
pub struct Session {
    config: Arc<ClientConfig>,
    http: Arc<dyn HttpTransport>,
    store: CredentialStore,
    state: RwLock<TokenState>,
    refresh_gate: Mutex<()>,
}

impl Session {
    /// Creates a session. Nothing is loaded or fetched until [`establish`].
    ///
    /// [`establish`]: Session::establish
    pub fn new(config: Arc<ClientConfig>, http: Arc<dyn HttpTransport>) -> Self {
        let store = CredentialStore::new(config.credentials_file.clone(), config.password.clone());
        Self {
            config,
            http,
            store,
            state: RwLock::new(TokenState::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Loads persisted credentials, then makes sure a client id and a token
    /// pair exist.
    pub async fn establish(&self) -> ClientResult<()> {
        let record = match self.store.load().await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable credentials");
                CredentialRecord::default()
            }
        };

        let missing_client_id = {
            let mut state = self.state.write();
            if state.client_id.is_none() {
                state.client_id = record.client_id;
            }
            if state.access_token.is_none() || state.refresh_token.is_none() {
                state.access_token = record.access_token;
                state.refresh_token = record.refresh_token;
            }
            state.client_id.is_none()
        };

        if missing_client_id {
            info!("no saved client id, generating a new one");
            self.state.write().client_id = Some(Uuid::new_v4().simple().to_string());
            self.persist().await;
        }

        let _gate = self.refresh_gate.lock().await;
        let has_tokens = {
            let state = self.state.read();
            state.access_token.is_some() && state.refresh_token.is_some()
        };
        if has_tokens {
            debug!("using saved tokens");
            Ok(())
        } else {
            self.fetch_tokens_locked().await
        }
    }

    /// Sends a POST with credentials, refreshing once on a 401.
    ///
    /// Any non-2xx status left after recovery is `UnexpectedStatus`.
    pub async fn authenticated_request(
        &self,
        path: &str,
        body: RequestBody,
    ) -> ClientResult<HttpResponse> {
        let (mut token, mut generation) = self.current_access();
        if token.is_none() {
            self.refresh_if_stale(generation).await?;
            (token, generation) = self.current_access();
        }

        let response = self.send(path, token.as_deref(), body.clone()).await?;
        if response.status != 401 {
            return check_status(path, response);
        }

        info!(path, "access token rejected, refreshing before retrying");
        self.refresh_if_stale(generation).await?;
        let (token, _) = self.current_access();
        let response = self.send(path, token.as_deref(), body).await?;
        check_status(path, response)
    }

    /// Refreshes the access token, sharing the round trip with any refresh
    /// already in flight.
    pub async fn refresh_access_token(&self) -> ClientResult<()> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_tokens_locked().await
    }

    /// Returns the headers the live channel handshake needs.
    pub fn handshake_headers(&self) -> Vec<(String, String)> {
        let state = self.state.read();
        let mut headers = Vec::with_capacity(3);
        if let Some(token) = &state.access_token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        if let Some(client_id) = &state.client_id {
            headers.push((CLIENT_ID_HEADER.to_lowercase(), client_id.clone()));
        }
        headers.push((API_VERSION_HEADER.to_string(), self.config.api_version.clone()));
        headers
    }

    /// Returns the client id.
    pub fn client_id(&self) -> Option<String> {
        self.state.read().client_id.clone()
    }

    /// Returns the user id, once known.
    pub fn user_id(&self) -> Option<String> {
        self.state.read().user_id.clone()
    }

    /// Records the user id if none is known yet.
    pub fn learn_user_id(&self, user_id: &str) {
        let mut state = self.state.write();
        if state.user_id.is_none() {
            debug!(user_id, "learned user id");
            state.user_id = Some(user_id.to_string());
        }
    }

    /// Returns the token generation. It changes on every fetch or refresh.
    pub fn token_generation(&self) -> u64 {
        self.state.read().generation
    }

    fn current_access(&self) -> (Option<String>, u64) {
        let state = self.state.read();
        (state.access_token.clone(), state.generation)
    }

    async fn refresh_if_stale(&self, observed_generation: u64) -> ClientResult<()> {
        let _gate = self.refresh_gate.lock().await;
        if self.state.read().generation != observed_generation {
            debug!("token already refreshed by a concurrent request");
            return Ok(());
        }
        self.refresh_tokens_locked().await
    }

    async fn refresh_tokens_locked(&self) -> ClientResult<()> {
        let refresh_token = self.state.read().refresh_token.clone();
        let Some(refresh_token) = refresh_token else {
            debug!("no refresh token, fetching with credentials");
            return self.fetch_tokens_locked().await;
        };

        let body = RequestBody::Form(vec![FormField::text("refresh_token", refresh_token)]);
        let response = self.send_unauthenticated(AUTH_REFRESH_PATH, body).await?;

        match response.status {
            200..=299 => {
                let tokens = parse_tokens(&response)?;
                self.install_tokens(tokens).await;
                info!("access token refreshed");
                Ok(())
            }
            401 => {
                info!("refresh token rejected, fetching new tokens with credentials");
                self.fetch_tokens_locked().await
            }
            status => {
                warn!(status, "token refresh failed");
                Err(ClientError::TokenRefresh { status })
            }
        }
    }

    async fn fetch_tokens_locked(&self) -> ClientResult<()> {
        let body = RequestBody::Form(vec![
            FormField::text("email", self.config.email.clone()),
            FormField::text("password", self.config.password.clone()),
        ]);
        let response = self.send_unauthenticated(AUTH_TOKEN_PATH, body).await?;
        if !response.is_success() {
            warn!(status = response.status, "credential fetch rejected");
            return Err(ClientError::Authentication(format!(
                "{AUTH_TOKEN_PATH} returned status {}",
                response.status
            )));
        }

        let tokens = parse_tokens(&response)?;
        self.install_tokens(tokens).await;
        info!("fetched new tokens");
        Ok(())
    }

    async fn install_tokens(&self, tokens: TokenResponse) {
        {
            let mut state = self.state.write();
            state.access_token = Some(tokens.access_token);
            state.refresh_token = Some(tokens.refresh_token);
            if let Some(user_id) = tokens.user_id {
                state.user_id = Some(user_id);
            }
            state.generation += 1;
        }
        self.persist().await;
    }

    async fn persist(&self) {
        let record = {
            let state = self.state.read();
            CredentialRecord {
                client_id: state.client_id.clone(),
                access_token: state.access_token.clone(),
                refresh_token: state.refresh_token.clone(),
            }
        };
        if let Err(e) = self.store.store(&record).await {
            warn!(error = %e, "failed to persist credentials");
        }
    }

    async fn send(
        &self,
        path: &str,
        access_token: Option<&str>,
        body: RequestBody,
    ) -> ClientResult<HttpResponse> {
        let mut headers = Vec::with_capacity(3);
        if let Some(token) = access_token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        if let Some(client_id) = self.client_id() {
            headers.push((CLIENT_ID_HEADER.to_string(), client_id));
        }
        headers.push((API_VERSION_HEADER.to_string(), self.config.api_version.clone()));

        let request = HttpRequest {
            url: self.config.url_for(path),
            headers,
            body,
        };
        Ok(self.http.post(request).await?)
    }

    async fn send_unauthenticated(&self, path: &str, body: RequestBody) -> ClientResult<HttpResponse> {
        let request = HttpRequest {
            url: self.config.url_for(path),
            headers: vec![(API_VERSION_HEADER.to_string(), self.config.api_version.clone())],
            body,
        };
        Ok(self.http.post(request).await?)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Session")
            .field("client_id", &state.client_id)
            .field("user_id", &state.user_id)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChannelCredentials for Session {
    fn handshake_headers(&self) -> Vec<(String, String)> {
        Session::handshake_headers(self)
    }

    async fn refresh_credentials(&self) -> ClientResult<()> {
        self.refresh_access_token().await
    }
}

fn parse_tokens(response: &HttpResponse) -> ClientResult<TokenResponse> {
    serde_json::from_slice(&response.body)
        .map_err(|e| ProtocolError::decode(format!("token response: {e}")).into())
}

fn check_status(path: &str, response: HttpResponse) -> ClientResult<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        warn!(path, status = response.status, "request failed");
        Err(ClientError::UnexpectedStatus {
            path: path.to_string(),
            status: response.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportResult;
    use parking_lot::Mutex as SyncMutex;

    /// Issues numbered tokens and accepts only the latest access token.
    struct StubAuth {
        issued: SyncMutex<u32>,
        refresh_status: u16,
        fetch_status: u16,
        log: SyncMutex<Vec<String>>,
    }

    impl StubAuth {
        fn new() -> Self {
            Self {
                issued: SyncMutex::new(0),
                refresh_status: 200,
                fetch_status: 200,
                log: SyncMutex::new(Vec::new()),
            }
        }

        fn issue(&self) -> HttpResponse {
            let mut issued = self.issued.lock();
            *issued += 1;
            let body = serde_json::json!({
                "access_token": format!("access-{issued}"),
                "refresh_token": format!("refresh-{issued}"),
                "user_id": "user-1",
            });
            HttpResponse::new(200, body.to_string())
        }

        fn calls(&self, path: &str) -> usize {
            self.log.lock().iter().filter(|p| *p == path).count()
        }
    }

    #[async_trait]
    impl HttpTransport for StubAuth {
        async fn post(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
            let path = request.url.trim_start_matches("http://stub/").to_string();
            self.log.lock().push(path.clone());
            match path.as_str() {
                AUTH_TOKEN_PATH if self.fetch_status != 200 => {
                    Ok(HttpResponse::new(self.fetch_status, Vec::new()))
                }
                AUTH_TOKEN_PATH => Ok(self.issue()),
                AUTH_REFRESH_PATH if self.refresh_status != 200 => {
                    Ok(HttpResponse::new(self.refresh_status, Vec::new()))
                }
                AUTH_REFRESH_PATH => Ok(self.issue()),
                _ => {
                    let current = format!("Bearer access-{}", self.issued.lock());
                    if request.header("authorization") == Some(current.as_str()) {
                        Ok(HttpResponse::new(200, "ok"))
                    } else {
                        Ok(HttpResponse::new(401, Vec::new()))
                    }
                }
            }
        }
    }

    fn session(http: Arc<StubAuth>) -> Session {
        let config = ClientConfig::new("cook@example.com", "pw").with_base_url("http://stub");
        Session::new(Arc::new(config), http)
    }

    #[tokio::test]
    async fn establish_fetches_tokens_and_client_id() {
        let http = Arc::new(StubAuth::new());
        let session = session(http.clone());

        session.establish().await.unwrap();

        assert_eq!(http.calls(AUTH_TOKEN_PATH), 1);
        assert_eq!(session.client_id().unwrap().len(), 32);
        assert_eq!(session.user_id().as_deref(), Some("user-1"));
        assert_eq!(session.token_generation(), 1);

        let headers = session.handshake_headers();
        assert!(headers.contains(&("authorization".into(), "Bearer access-1".into())));
        assert!(headers.iter().any(|(k, v)| k == API_VERSION_HEADER && v == "3"));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once() {
        let http = Arc::new(StubAuth::new());
        let session = session(http.clone());
        session.establish().await.unwrap();

        // Another device rotated the tokens.
        *http.issued.lock() += 1;

        let response = session
            .authenticated_request("data/echo", RequestBody::Empty)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(http.calls(AUTH_REFRESH_PATH), 1);
        assert_eq!(http.calls("data/echo"), 2);
        assert_eq!(session.token_generation(), 2);
    }

    #[tokio::test]
    async fn refresh_rejection_falls_back_to_credentials() {
        let http = Arc::new(StubAuth {
            refresh_status: 401,
            ..StubAuth::new()
        });
        let session = session(http.clone());
        session.establish().await.unwrap();

        session.refresh_access_token().await.unwrap();
        assert_eq!(http.calls(AUTH_REFRESH_PATH), 1);
        assert_eq!(http.calls(AUTH_TOKEN_PATH), 2);
    }

    #[tokio::test]
    async fn refresh_server_error_propagates() {
        let http = Arc::new(StubAuth {
            refresh_status: 503,
            ..StubAuth::new()
        });
        let session = session(http.clone());
        session.establish().await.unwrap();

        let err = session.refresh_access_token().await.unwrap_err();
        assert!(matches!(err, ClientError::TokenRefresh { status: 503 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn rejected_credentials_fail_login() {
        let http = Arc::new(StubAuth {
            fetch_status: 401,
            ..StubAuth::new()
        });
        let session = session(http);

        let err = session.establish().await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));
    }

    #[tokio::test]
    async fn learned_user_id_is_kept() {
        let session = session(Arc::new(StubAuth::new()));
        session.learn_user_id("first");
        session.learn_user_id("second");
        assert_eq!(session.user_id().as_deref(), Some("first"));
    }
}
