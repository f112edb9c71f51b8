//! HTTP server for chat sessions

pub mod routes;
pub mod state;

use axum::{response::Html, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{ChatPdfConfig, ServerConfig};
use crate::error::{Error, Result};
use state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Chat HTTP server
pub struct ChatServer {
    config: ChatPdfConfig,
    state: AppState,
}

impl ChatServer {
    /// Create a server with OpenAI-backed sessions
    pub fn new(config: ChatPdfConfig, api_key: Option<String>) -> Self {
        let state = AppState::new(config.clone(), api_key);
        Self { config, state }
    }

    /// Create a server around existing state
    pub fn with_state(config: ChatPdfConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config.server)
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting chat server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Router over the given state
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .nest("/api", routes::api_routes(config.max_upload_size))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::NO_DOCUMENT_MESSAGE;
    use crate::testing::{test_agent, ScriptedLlm};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(api_key: Option<&str>) -> (AppState, Router) {
        let config = ChatPdfConfig::default();
        let state = AppState::with_agent_factory(
            config.clone(),
            api_key.map(str::to_string),
            Arc::new(|_: &str| Ok(test_agent().0)),
        );
        let router = build_router(state.clone(), &config.server);
        (state, router)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn upload_request(session: &str, files: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, content) in files {
            body.push_str(&format!(
                "--BOUNDARY\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n{}\r\n",
                name, content
            ));
        }
        body.push_str("--BOUNDARY--\r\n");

        Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{}/files", session))
            .header("content-type", "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_session(router: &Router) -> (String, Value) {
        let (status, body) = send(router, empty_request("POST", "/api/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        (body["session_id"].as_str().unwrap().to_string(), body)
    }

    #[tokio::test]
    async fn test_health_and_index() {
        let (_, router) = app(Some("sk-test"));

        let response = router.clone().oneshot(empty_request("GET", "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.clone().oneshot(empty_request("GET", "/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&page).contains("ChatPDF"));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (state, router) = app(Some("sk-test"));
        let (id, created) = create_session(&router).await;

        assert_eq!(created["controls_enabled"], json!(true));
        assert_eq!(created["agent_state"], json!("empty"));
        assert_eq!(created["messages"], json!([]));
        assert_eq!(state.session_count(), 1);

        let (status, _) = send(&router, empty_request("DELETE", &format!("/api/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.session_count(), 0);

        let (status, body) = send(&router, empty_request("GET", &format!("/api/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], json!("not_found"));
    }

    #[tokio::test]
    async fn test_question_before_upload_gets_prompt_to_add_document() {
        let (_, router) = app(Some("sk-test"));
        let (id, _) = create_session(&router).await;

        let (status, body) = send(
            &router,
            json_request("POST", &format!("/api/sessions/{}/questions", id), json!({"question": "Hi?"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"][0]["text"], json!("Hi?"));
        assert_eq!(body["messages"][0]["is_user"], json!(true));
        assert_eq!(body["messages"][1]["text"], json!(NO_DOCUMENT_MESSAGE));
        assert_eq!(body["messages"][1]["is_user"], json!(false));
    }

    #[tokio::test]
    async fn test_upload_then_ask() {
        let (_, router) = app(Some("sk-test"));
        let (id, _) = create_session(&router).await;

        let (status, body) = send(
            &router,
            upload_request(&id, &[("report.pdf", "The total is 42."), ("notes.txt", "skip me")]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agent_state"], json!("loaded"));
        assert_eq!(body["ingest_report"]["loaded"], json!(["report.pdf"]));
        assert_eq!(body["ingest_report"]["failed"][0]["filename"], json!("notes.txt"));

        let (_, body) = send(
            &router,
            json_request("PUT", &format!("/api/sessions/{}/input", id), json!({"text": "What is the total?"})),
        )
        .await;
        assert_eq!(body["user_input"], json!("What is the total?"));

        let (status, body) = send(
            &router,
            json_request(
                "POST",
                &format!("/api/sessions/{}/questions", id),
                json!({"question": "What is the total?"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"][1]["text"], json!(ScriptedLlm::ANSWER.trim()));
        assert_eq!(body["user_input"], json!(""));

        let (_, busy) = send(&router, empty_request("GET", &format!("/api/sessions/{}/status", id))).await;
        assert_eq!(busy, json!({"ingesting": null, "answering": false}));
    }

    #[tokio::test]
    async fn test_controls_disabled_without_key() {
        let (state, router) = app(None);
        assert!(!state.is_key_set());

        let (id, created) = create_session(&router).await;
        assert_eq!(created["controls_enabled"], json!(false));
        assert_eq!(created["agent_state"], Value::Null);

        let (status, body) = send(
            &router,
            json_request("POST", &format!("/api/sessions/{}/questions", id), json!({"question": "Hi?"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["type"], json!("controls_disabled"));

        let (status, _) = send(&router, upload_request(&id, &[("report.pdf", "text")])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
