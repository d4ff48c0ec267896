//! HTTP transport implementation.
//!
//! HTTP server with JSON-RPC over POST requests, plus a login endpoint.
//! When `AUTH_LOGIN` is configured every JSON-RPC request must carry
//! `Authorization: Bearer <session token>`, where the token is the hex
//! session hash returned by a successful login.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument, warn};

use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;
use crate::core::security::SessionHash;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error code returned when the session token is missing or wrong.
const UNAUTHORIZED_CODE: i32 = -32001;

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32601, "Method not found")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }

    /// Missing or invalid session token.
    pub fn unauthorized(id: Option<serde_json::Value>) -> Self {
        Self::error(id, UNAUTHORIZED_CODE, "Unauthorized")
    }
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The MCP server instance.
    server: McpServer,
    /// Session token expected on JSON-RPC requests, derived once at startup.
    /// `None` when login is not required.
    session_token: Option<Arc<SessionHash>>,
    /// Session state for maintaining conversation context.
    session: Arc<RwLock<Option<SessionState>>>,
}

/// Session state for a client.
#[derive(Debug, Clone)]
struct SessionState {
    initialized: bool,
    protocol_version: String,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum router for `server`.
    pub fn router(&self, server: McpServer) -> Router {
        let session_token = server.credentials().session_hash().map(Arc::new);

        let state = AppState {
            server,
            session_token,
            session: Arc::new(RwLock::new(None)),
        };

        let mut app = Router::new()
            .route(&self.config.rpc_path, post(handle_rpc))
            .route(&self.config.login_path, post(handle_login))
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .with_state(state);

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        app
    }

    /// Run the HTTP transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let login_required = server.credentials().is_login_required();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, CORS {}, login {})",
            addr,
            cors_status,
            if login_required { "required" } else { "not required" }
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → Login:    POST {}", self.config.login_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "loginRequired": state.session_token.is_some(),
        "protocol": "JSON-RPC 2.0"
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Exchange the reference credentials for the session token.
async fn handle_login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Response {
    let credentials = state.server.credentials();

    if !credentials.is_login_required() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Login is not configured" })),
        )
            .into_response();
    }

    if !credentials.verify(&request.username, &request.password) {
        warn!("Login failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Invalid credentials" })),
        )
            .into_response();
    }

    match state.session_token {
        Some(token) => {
            info!("Login succeeded");
            (
                StatusCode::OK,
                Json(serde_json::json!({ "token": token.to_hex() })),
            )
                .into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Session token unavailable" })),
        )
            .into_response(),
    }
}

/// Accept the request if no login is configured or the bearer token matches.
fn is_authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.session_token.as_ref() else {
        return true;
    };

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| expected.matches(token))
}

/// Handle JSON-RPC requests.
#[instrument(skip_all, fields(method))]
async fn handle_rpc(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    tracing::Span::current().record("method", &request.method);

    if !is_authorized(&state, &headers) {
        warn!("Rejected unauthenticated JSON-RPC request: {}", request.method);
        return (
            StatusCode::UNAUTHORIZED,
            Json(JsonRpcResponse::unauthorized(request.id)),
        )
            .into_response();
    }

    info!("Received JSON-RPC request: {}", request.method);
    let response = process_request(&state, request).await;

    (StatusCode::OK, Json(response)).into_response()
}

/// Process a JSON-RPC request and return the response.
async fn process_request(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::invalid_request(request.id);
    }

    match request.method.as_str() {
        "initialize" => handle_initialize(state, request).await,
        "tools/list" => handle_tools_list(state, request),
        "tools/call" => handle_tools_call(state, request).await,
        // Notifications (no response needed for stateless HTTP)
        method if method.starts_with("notifications/") => {
            handle_notification(state, &request).await;
            JsonRpcResponse::success(request.id, serde_json::json!(null))
        }
        _ => {
            warn!("Unknown method: {}", request.method);
            JsonRpcResponse::method_not_found(request.id)
        }
    }
}

/// Handle initialize request.
async fn handle_initialize(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing initialize request");

    let mut session = state.session.write().await;
    *session = Some(SessionState {
        initialized: false,
        protocol_version: PROTOCOL_VERSION.to_string(),
    });

    let result = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": state.server.name(),
            "version": state.server.version()
        },
        "instructions": McpServer::instructions()
    });

    JsonRpcResponse::success(request.id, result)
}

/// Handle tools/list request.
fn handle_tools_list(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing tools/list request");

    let tools = state.server.list_tools();
    JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools }))
}

/// Handle tools/call request.
async fn handle_tools_call(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing tools/call request");

    let params = match request.params {
        Some(p) => p,
        None => return JsonRpcResponse::invalid_params(request.id.clone(), "Missing params"),
    };

    let name = match params.get("name").and_then(|v| v.as_str()) {
        Some(n) => n.to_string(),
        None => return JsonRpcResponse::invalid_params(request.id.clone(), "Missing tool name"),
    };

    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or(serde_json::json!({}));

    match state.server.call_tool(&name, arguments).await {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(e) => JsonRpcResponse::invalid_params(request.id, e),
    }
}

/// Handle notifications (no response needed).
async fn handle_notification(state: &AppState, request: &JsonRpcRequest) {
    match request.method.as_str() {
        "notifications/initialized" => {
            let mut session = state.session.write().await;
            if let Some(ref mut s) = *session
                && !s.initialized
            {
                s.initialized = true;
                info!("Client initialized (protocol {})", s.protocol_version);
            }
        }
        _ => {
            info!("Received notification: {}", request.method);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use axum::body::Body;
    use base64::Engine;
    use http::Request;
    use http_body_util::BodyExt;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(config: Config) -> Router {
        HttpTransport::new(HttpConfig::default()).router(McpServer::new(config))
    }

    fn config_with_base(base: &TempDir, login: Option<(&str, &str)>) -> Config {
        let mut config = Config::default();
        config.security.base_dir = base.path().to_path_buf();
        if let Some((user, password)) = login {
            config.auth.login = Some(user.to_string());
            config.auth.password = Some(password.to_string());
        }
        config
    }

    fn rpc(method: &str, params: serde_json::Value, token: Option<&str>) -> Request<Body> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn login(username: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "username": username, "password": password }).to_string(),
            ))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_health_check() {
        tokio_test::block_on(async {
            let request = Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(app(Config::default()), request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "healthy");
        });
    }

    #[test]
    fn test_tools_list_without_login() {
        tokio_test::block_on(async {
            let (status, body) =
                send(app(Config::default()), rpc("tools/list", serde_json::json!({}), None)).await;
            assert_eq!(status, StatusCode::OK);
            let tools = body["result"]["tools"].as_array().unwrap();
            assert_eq!(tools.len(), 3);
        });
    }

    #[test]
    fn test_unknown_method() {
        tokio_test::block_on(async {
            let (_, body) =
                send(app(Config::default()), rpc("resources/list", serde_json::json!({}), None))
                    .await;
            assert_eq!(body["error"]["code"], -32601);
        });
    }

    #[test]
    fn test_login_not_configured() {
        tokio_test::block_on(async {
            let (status, _) = send(app(Config::default()), login("admin", "secret")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        });
    }

    #[test]
    fn test_rpc_requires_token_when_login_configured() {
        tokio_test::block_on(async {
            let base = TempDir::new().unwrap();
            let app = app(config_with_base(&base, Some(("admin", "secret"))));

            let (status, body) = send(
                app.clone(),
                rpc("tools/list", serde_json::json!({}), None),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"]["code"], UNAUTHORIZED_CODE);

            let (status, _) = send(
                app.clone(),
                rpc("tools/list", serde_json::json!({}), Some("deadbeef")),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        });
    }

    #[test]
    fn test_login_rejects_wrong_password() {
        tokio_test::block_on(async {
            let base = TempDir::new().unwrap();
            let app = app(config_with_base(&base, Some(("admin", "secret"))));

            let (status, body) = send(app, login("admin", "wrong")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(body.get("token").is_none());
        });
    }

    #[test]
    fn test_login_then_fetch_files() {
        tokio_test::block_on(async {
            let base = TempDir::new().unwrap();
            fs::write(base.path().join("report.txt"), "quarterly numbers").unwrap();
            let app = app(config_with_base(&base, Some(("admin", "secret"))));

            let (status, body) = send(app.clone(), login("admin", "secret")).await;
            assert_eq!(status, StatusCode::OK);
            let token = body["token"].as_str().unwrap().to_string();
            assert_eq!(
                token,
                "f251dcb2c8ddb02c69495873045917adba160037c0f5817a90663bde19cbd675"
            );

            let params = serde_json::json!({
                "name": "files_get",
                "arguments": { "paths": ["report.txt", "missing.txt"] }
            });
            let (status, body) = send(app, rpc("tools/call", params, Some(&token))).await;
            assert_eq!(status, StatusCode::OK);

            let files = &body["result"]["structuredContent"]["files"];
            let expected =
                base64::engine::general_purpose::STANDARD.encode("quarterly numbers");
            assert_eq!(files["report.txt"], expected);
            assert!(files.get("missing.txt").is_none());
        });
    }
}
