//! API routes for the chat server

pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/:id/status", get(sessions::session_status))
        // Uploads need a larger body limit
        .route(
            "/sessions/:id/files",
            post(sessions::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/sessions/:id/questions", post(sessions::ask_question))
        .route("/sessions/:id/input", axum::routing::put(sessions::update_input))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "chatpdf",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chat with your PDF documents",
        "api_key_set": state.is_key_set(),
        "sessions": state.session_count(),
        "endpoints": {
            "POST /api/sessions": "Start a chat session",
            "GET /api/sessions/:id": "Current messages and controls",
            "GET /api/sessions/:id/status": "Busy flags for spinners",
            "POST /api/sessions/:id/files": "Upload PDFs, replacing the session's documents",
            "POST /api/sessions/:id/questions": "Ask a question about the documents",
            "PUT /api/sessions/:id/input": "Update the pending question text",
            "DELETE /api/sessions/:id": "End a session"
        }
    }))
}
