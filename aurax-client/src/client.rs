use auraxsync_core::{CoreError, RemoteError};
use local_store::{DiagnosticLog, LocalStore, Session};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const ENVIRONMENT_HEADER: &str = "x-environment";
const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the backend is mounted at, including the `/api` prefix.
    pub base_url: String,
    /// Environment marker attached to every request.
    pub environment: String,
    /// Per-request deadline; a hung call fails with `RemoteError::Timeout`
    /// instead of blocking the sync indefinitely.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5003/api".to_string(),
            environment: "copy".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    #[serde(rename = "emailOrPhone")]
    pub email_or_phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub otp: Option<String>,
}

/// Authenticated JSON client for the Aurax backend. Normalizes every
/// failure into a `RemoteError` and journals every call. Performs no
/// retries; retry policy, if any, belongs to the caller.
#[derive(Debug)]
pub struct RemoteClient {
    http_client: reqwest::Client,
    config: ClientConfig,
    store: Arc<LocalStore>,
    diagnostics: Arc<DiagnosticLog>,
}

impl RemoteClient {
    pub fn new(
        config: ClientConfig,
        store: Arc<LocalStore>,
        diagnostics: Arc<DiagnosticLog>,
    ) -> Result<Self, CoreError> {
        Url::parse(&config.base_url).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid base URL '{}': {e}", config.base_url),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            http_client,
            config,
            store,
            diagnostics,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&B>,
        headers: Option<HeaderMap>,
    ) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        let request_id = uuid::Uuid::new_v4().to_string();
        let token = self.store.token();
        let authenticated = token.is_some();

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(ENVIRONMENT_HEADER, &self.config.environment);

        if let Some(token) = &token {
            request_builder = request_builder.bearer_auth(token);
        }
        if let Some(params) = query {
            request_builder = request_builder.query(params);
        }
        if let Some(body) = body {
            request_builder = request_builder.json(body);
        }
        // Caller-supplied headers win on conflict.
        if let Some(headers) = headers {
            request_builder = request_builder.headers(headers);
        }

        debug!("Making API request: {} {} ({})", method, path, request_id);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Request failed before a response: {} {}: {}", method, path, e);
                self.diagnostics.record_api_call(
                    method.as_str(),
                    path,
                    None,
                    false,
                    &request_id,
                    authenticated,
                );
                return Err(RemoteError::from(e));
            }
        };

        let status = response.status().as_u16();
        let success = (200..300).contains(&status);
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.diagnostics.record_api_call(
                    method.as_str(),
                    path,
                    Some(status),
                    false,
                    &request_id,
                    authenticated,
                );
                return Err(RemoteError::from(e));
            }
        };

        self.diagnostics.record_api_call(
            method.as_str(),
            path,
            Some(status),
            success,
            &request_id,
            authenticated,
        );

        if !success {
            let message = extract_error_message(&bytes);
            warn!("Request failed: {} {} -> {} ({})", method, path, status, message);
            return Err(RemoteError::Http { status, message });
        }

        debug!("Request successful: {} {} -> {}", method, path, status);
        parse_success_body(&bytes)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&[(&str, &str)]>,
    ) -> Result<T, RemoteError> {
        self.request(Method::GET, path, query, None::<&()>, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, None, Some(body), None).await
    }

    /// Authenticates against the backend and persists the session so
    /// subsequent requests carry the bearer token.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, CoreError> {
        let response: LoginResponse = self.post("/login", credentials).await?;

        self.store.save_session(&Session {
            token: response.token.clone(),
            user: response.user.clone(),
        })?;
        info!("Login successful, session persisted");

        Ok(response)
    }

    /// Registers a new account. When the backend returns a token the
    /// session is persisted immediately (auto-login); OTP-gated flows
    /// return without one and the caller completes verification first.
    pub async fn register(&self, payload: &RegisterRequest) -> Result<RegisterResponse, CoreError> {
        let response: RegisterResponse = self.post("/register", payload).await?;

        if let Some(token) = &response.token {
            self.store.save_session(&Session {
                token: token.clone(),
                user: response.user.clone().unwrap_or(serde_json::Value::Null),
            })?;
            info!("Registration successful, session persisted");
        }

        Ok(response)
    }

    /// Drops the persisted session. Purely local, no network call.
    pub fn logout(&self) -> Result<(), CoreError> {
        self.store.clear_session()?;
        self.diagnostics.record("LOGOUT", serde_json::json!({}));
        Ok(())
    }
}

/// Error message from a non-2xx body: the body's `message` field when it
/// parses as JSON and carries one, otherwise a generic fallback. Empty and
/// malformed bodies are tolerated.
fn extract_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

/// Successful bodies deserialize as JSON; an empty body is treated as `{}`.
fn parse_success_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RemoteError> {
    let effective: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };

    serde_json::from_slice(effective).map_err(|e| RemoteError::InvalidResponse {
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn client_against(base_url: &str) -> (TempDir, RemoteClient) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).unwrap());
        let diagnostics = Arc::new(DiagnosticLog::new(store.clone(), "copy"));
        let config = ClientConfig {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        };
        let client = RemoteClient::new(config, store, diagnostics).unwrap();
        (dir, client)
    }

    /// Serves exactly one canned HTTP response and hands back the raw
    /// request head it received.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text
                        .lines()
                        .find_map(|line| {
                            line.to_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&raw).to_string());

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        (format!("http://{addr}"), rx)
    }

    #[test]
    fn error_message_comes_from_body_when_present() {
        assert_eq!(
            extract_error_message(br#"{"message":"not found"}"#),
            "not found"
        );
        assert_eq!(extract_error_message(b""), FALLBACK_ERROR_MESSAGE);
        assert_eq!(extract_error_message(b"<html>oops</html>"), FALLBACK_ERROR_MESSAGE);
        assert_eq!(
            extract_error_message(br#"{"error":"no message field"}"#),
            FALLBACK_ERROR_MESSAGE
        );
    }

    #[test]
    fn empty_success_body_parses_as_empty_object() {
        let value: serde_json::Value = parse_success_body(b"").unwrap();
        assert_eq!(value, serde_json::json!({}));

        let value: serde_json::Value = parse_success_body(b"  \n").unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn not_found_maps_to_http_error_with_body_message() {
        let (base, _rx) = one_shot_server("404 Not Found", r#"{"message":"not found"}"#).await;
        let (_dir, client) = client_against(&base);

        let err = client
            .get::<serde_json::Value>("/missing", None)
            .await
            .unwrap_err();
        match err {
            RemoteError::Http { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "not found");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparsable_error_body_falls_back_to_generic_message() {
        let (base, _rx) = one_shot_server("500 Internal Server Error", "not json at all").await;
        let (_dir, client) = client_against(&base);

        let err = client
            .get::<serde_json::Value>("/boom", None)
            .await
            .unwrap_err();
        match err {
            RemoteError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, FALLBACK_ERROR_MESSAGE);
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_response_deserializes_body() {
        let (base, _rx) = one_shot_server("200 OK", r#"{"success":true,"value":7}"#).await;
        let (_dir, client) = client_against(&base);

        let value: serde_json::Value = client.get("/ok", None).await.unwrap();
        assert_eq!(value["value"], serde_json::json!(7));
    }

    #[tokio::test]
    async fn default_headers_are_attached_and_token_included_when_present() {
        let (base, rx) = one_shot_server("200 OK", "{}").await;
        let (_dir, client) = client_against(&base);

        client
            .store
            .save_session(&Session {
                token: "tok-abc".to_string(),
                user: serde_json::Value::Null,
            })
            .unwrap();

        let _: serde_json::Value = client.get("/whoami", None).await.unwrap();
        let request_head = rx.await.unwrap().to_lowercase();

        assert!(request_head.contains("content-type: application/json"));
        assert!(request_head.contains("x-environment: copy"));
        assert!(request_head.contains("authorization: bearer tok-abc"));
    }

    #[tokio::test]
    async fn unreachable_server_maps_to_network_error() {
        // Bind then drop to get a port with nothing listening on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (_dir, client) = client_against(&format!("http://{addr}"));
        let err = client
            .get::<serde_json::Value>("/anything", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Network { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn login_persists_session_and_logout_clears_it() {
        let (base, _rx) = one_shot_server(
            "200 OK",
            r#"{"token":"tok-login","user":{"username":"creator"}}"#,
        )
        .await;
        let (_dir, client) = client_against(&base);

        let response = client
            .login(&LoginRequest {
                email_or_phone: "creator@example.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.token, "tok-login");
        assert_eq!(client.store.token().as_deref(), Some("tok-login"));

        client.logout().unwrap();
        assert!(client.store.token().is_none());
    }

    #[tokio::test]
    async fn register_without_token_does_not_persist_a_session() {
        let (base, _rx) = one_shot_server("200 OK", r#"{"success":true,"otp":"123456"}"#).await;
        let (_dir, client) = client_against(&base);

        let response = client
            .register(&RegisterRequest {
                username: "creator".to_string(),
                email: "creator@example.com".to_string(),
                phone: "5551234".to_string(),
                password: "hunter2".to_string(),
                role: "creator".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.otp.as_deref(), Some("123456"));
        assert!(client.store.token().is_none());
    }
}
