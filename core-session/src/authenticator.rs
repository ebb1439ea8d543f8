//! # Request Authenticator
//!
//! An [`HttpClient`] decorator that makes authentication invisible to the
//! rest of the stack: it attaches the bearer token, and when a request comes
//! back 401 it runs one refresh cycle and retries the request once with the
//! new token.
//!
//! ## Exempt endpoints
//!
//! Login, token refresh, and registration are the endpoints that *establish*
//! credentials; decorating them would recurse, so they pass through
//! untouched.
//!
//! ## Retry policy
//!
//! Exactly one retry per request, and only after a successful refresh. If
//! the refresh fails the original 401 response is returned as-is; the
//! session manager has already torn the session down and emitted the events
//! by then, so callers see the same response they would have without the
//! decorator.

use crate::manager::SessionManager;
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_runtime::config::CoreConfig;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RequestAuthenticator {
    inner: Arc<dyn HttpClient>,
    session: Arc<SessionManager>,
    /// Path fragments whose 401s are logged at debug instead of warn
    quiet_paths: Vec<String>,
}

impl RequestAuthenticator {
    pub fn new(inner: Arc<dyn HttpClient>, session: Arc<SessionManager>) -> Self {
        Self {
            inner,
            session,
            quiet_paths: Vec::new(),
        }
    }

    /// Wraps the configured HTTP client, taking the quiet paths from the
    /// configuration.
    pub fn from_config(config: &CoreConfig, session: Arc<SessionManager>) -> Self {
        Self {
            inner: Arc::clone(&config.http_client),
            session,
            quiet_paths: config.quiet_paths.clone(),
        }
    }

    pub fn with_quiet_paths(mut self, paths: Vec<String>) -> Self {
        self.quiet_paths = paths;
        self
    }

    /// Endpoints that establish credentials are never decorated.
    fn is_exempt(request: &HttpRequest) -> bool {
        let path = request.url.split('?').next().unwrap_or(&request.url);
        path.ends_with("/auth/login")
            || path.ends_with("/auth/refresh-token")
            || (matches!(request.method, HttpMethod::Post) && path.ends_with("/users"))
    }

    fn is_quiet(&self, url: &str) -> bool {
        self.quiet_paths.iter().any(|p| url.contains(p.as_str()))
    }
}

#[async_trait]
impl HttpClient for RequestAuthenticator {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if Self::is_exempt(&request) {
            return self.inner.execute(request).await;
        }

        let mut request = request;
        let mut session_token = None;
        // A caller-supplied Authorization header wins over the session token
        if !request.has_header("Authorization") {
            if let Some(token) = self.session.access_token().await {
                request = request.bearer_token(token.clone());
                session_token = Some(token);
            }
        }

        let retry_template = request.clone();
        let response = self.inner.execute(request).await?;

        if response.status != 401 {
            return Ok(response);
        }

        if self.is_quiet(&retry_template.url) {
            debug!(url = %retry_template.url, "Received 401, attempting refresh");
        } else {
            warn!(url = %retry_template.url, "Received 401, attempting refresh");
        }

        // Reporting which token was rejected lets a refresh cycle that
        // already replaced it answer without a second exchange.
        let refresh_result = match &session_token {
            Some(rejected) => self.session.refresh_token_after(rejected).await,
            None => self.session.refresh_token().await,
        };

        match refresh_result {
            Ok(new_token) => {
                let mut retry = retry_template;
                retry.headers.remove("Authorization");
                let retry = retry.bearer_token(new_token);
                self.inner.execute(retry).await
            }
            Err(e) => {
                // Session is already torn down; surface the original 401
                debug!(error = %e, "Refresh failed, returning original response");
                Ok(response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Credentials;
    use bridge_traits::KeyValueStore;
    use bytes::Bytes;
    use core_runtime::config::CoreConfig;
    use core_runtime::events::EventBus;
    use std::collections::HashMap;
    use tokio::sync::Mutex as TokioMutex;

    struct MockHttpClient {
        responses: TokioMutex<Vec<HttpResponse>>,
        requests: TokioMutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: TokioMutex::new(responses),
                requests: TokioMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().await.push(request);
            let mut responses = self.responses.lock().await;
            if responses.is_empty() {
                panic!("MockHttpClient ran out of scripted responses");
            }
            Ok(responses.remove(0))
        }
    }

    struct MockKeyValueStore {
        entries: TokioMutex<HashMap<String, String>>,
    }

    impl MockKeyValueStore {
        fn new() -> Self {
            Self {
                entries: TokioMutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for MockKeyValueStore {
        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn remove(&self, key: &str) -> BridgeResult<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.entries.lock().await.keys().cloned().collect())
        }

        async fn clear(&self) -> BridgeResult<()> {
            self.entries.lock().await.clear();
            Ok(())
        }
    }

    fn ok_response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn status_response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(b"{}"),
        }
    }

    const BASE: &str = "https://api.example.com/api/v1";
    const LOGIN_BODY: &str = r#"{"access_token": "a1", "refresh_token": "r1"}"#;
    const PROFILE_BODY: &str = r#"{"id": 1, "email": "maria@mail.com", "name": "Maria", "role": "customer", "avatar": null}"#;

    /// Builds a signed-in session manager and an authenticator sharing the
    /// same scripted client.
    async fn signed_in(
        extra_responses: Vec<HttpResponse>,
    ) -> (RequestAuthenticator, Arc<MockHttpClient>) {
        let mut responses = vec![ok_response(LOGIN_BODY), ok_response(PROFILE_BODY)];
        responses.extend(extra_responses);
        let http = Arc::new(MockHttpClient::new(responses));
        let config = CoreConfig::builder()
            .api_base_url(BASE)
            .http_client(http.clone())
            .key_value_store(Arc::new(MockKeyValueStore::new()))
            .build()
            .unwrap();
        let manager = Arc::new(SessionManager::new(&config, EventBus::new(100)));
        manager
            .login(&Credentials {
                email: "maria@mail.com".to_string(),
                password: "12345".to_string(),
            })
            .await
            .unwrap();
        let authenticator =
            RequestAuthenticator::new(http.clone() as Arc<dyn HttpClient>, manager);
        (authenticator, http)
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let (authenticator, http) = signed_in(vec![ok_response("[]")]).await;

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/products", BASE));
        let response = authenticator.execute(request).await.unwrap();
        assert_eq!(response.status, 200);

        let requests = http.requests.lock().await;
        let last = requests.last().unwrap();
        assert_eq!(
            last.headers.get("Authorization").map(String::as_str),
            Some("Bearer a1")
        );
    }

    #[tokio::test]
    async fn test_preserves_caller_authorization_header() {
        let (authenticator, http) = signed_in(vec![ok_response("[]")]).await;

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/products", BASE))
            .header("Authorization", "Bearer caller-supplied");
        authenticator.execute(request).await.unwrap();

        let requests = http.requests.lock().await;
        assert_eq!(
            requests.last().unwrap().headers.get("Authorization").map(String::as_str),
            Some("Bearer caller-supplied")
        );
    }

    #[tokio::test]
    async fn test_exempt_endpoints_pass_through() {
        let (authenticator, http) = signed_in(vec![
            ok_response("{}"),
            ok_response("{}"),
            ok_response("{}"),
        ])
        .await;

        for request in [
            HttpRequest::new(HttpMethod::Post, format!("{}/auth/login", BASE)),
            HttpRequest::new(HttpMethod::Post, format!("{}/auth/refresh-token", BASE)),
            HttpRequest::new(HttpMethod::Post, format!("{}/users", BASE)),
        ] {
            authenticator.execute(request).await.unwrap();
        }

        let requests = http.requests.lock().await;
        for request in requests.iter().skip(2) {
            assert!(!request.has_header("Authorization"));
        }
    }

    #[tokio::test]
    async fn test_get_users_is_not_exempt() {
        let (authenticator, http) = signed_in(vec![ok_response("[]")]).await;

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/users", BASE));
        authenticator.execute(request).await.unwrap();

        let requests = http.requests.lock().await;
        assert!(requests.last().unwrap().has_header("Authorization"));
    }

    #[tokio::test]
    async fn test_401_triggers_refresh_and_retry() {
        let (authenticator, http) = signed_in(vec![
            status_response(401),
            ok_response(r#"{"access_token": "a2", "refresh_token": "r2"}"#),
            ok_response("[]"),
        ])
        .await;

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/products", BASE));
        let response = authenticator.execute(request).await.unwrap();
        assert_eq!(response.status, 200);

        let requests = http.requests.lock().await;
        // login, profile, original, refresh exchange, retry
        assert_eq!(requests.len(), 5);
        assert_eq!(
            requests.last().unwrap().headers.get("Authorization").map(String::as_str),
            Some("Bearer a2")
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_returns_original_401() {
        let (authenticator, http) = signed_in(vec![
            status_response(401),
            status_response(401), // refresh exchange rejected
        ])
        .await;

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/products", BASE));
        let response = authenticator.execute(request).await.unwrap();
        assert_eq!(response.status, 401);

        // No retry after a failed refresh
        let requests = http.requests.lock().await;
        assert_eq!(requests.len(), 4);
    }

    #[tokio::test]
    async fn test_quiet_path_still_refreshes_and_retries() {
        let (authenticator, http) = signed_in(vec![
            status_response(401),
            ok_response(r#"{"access_token": "a2"}"#),
            ok_response("{}"),
        ])
        .await;
        let authenticator =
            authenticator.with_quiet_paths(vec!["/auth/profile".to_string()]);

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/auth/profile", BASE));
        let response = authenticator.execute(request).await.unwrap();
        assert_eq!(response.status, 200);

        // Quiet paths only change log verbosity, never the retry behavior
        let requests = http.requests.lock().await;
        assert_eq!(requests.len(), 5);
    }

    #[tokio::test]
    async fn test_from_config_takes_client_and_quiet_paths() {
        let http = Arc::new(MockHttpClient::new(vec![
            ok_response(LOGIN_BODY),
            ok_response(PROFILE_BODY),
            ok_response("[]"),
        ]));
        let config = CoreConfig::builder()
            .api_base_url(BASE)
            .http_client(http.clone())
            .key_value_store(Arc::new(MockKeyValueStore::new()))
            .quiet_path("/auth/profile")
            .build()
            .unwrap();
        let manager = Arc::new(SessionManager::new(&config, EventBus::new(100)));
        manager
            .login(&Credentials {
                email: "maria@mail.com".to_string(),
                password: "12345".to_string(),
            })
            .await
            .unwrap();

        let authenticator = RequestAuthenticator::from_config(&config, manager);
        assert_eq!(
            authenticator.quiet_paths,
            vec!["/auth/profile".to_string()]
        );

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/products", BASE));
        authenticator.execute(request).await.unwrap();

        let requests = http.requests.lock().await;
        assert_eq!(
            requests.last().unwrap().headers.get("Authorization").map(String::as_str),
            Some("Bearer a1")
        );
    }

    #[tokio::test]
    async fn test_non_401_errors_pass_through() {
        let (authenticator, _http) = signed_in(vec![status_response(503)]).await;

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/products", BASE));
        let response = authenticator.execute(request).await.unwrap();
        assert_eq!(response.status, 503);
    }
}
