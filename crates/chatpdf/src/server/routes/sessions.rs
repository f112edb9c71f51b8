//! Session endpoints; each request becomes one controller event

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::session::{dispatch, BusyFlags, Event, Render, UploadedFile};

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub text: String,
}

/// Run one event against a session
async fn run_event(state: &AppState, id: Uuid, event: Event) -> Result<Render> {
    let handle = state.session(&id)?;
    let mut context = handle.context().lock().await;
    dispatch(&mut context, event).await
}

/// POST /api/sessions - Start a session
pub async fn create_session(State(state): State<AppState>) -> Result<(StatusCode, Json<Render>)> {
    let (_, handle) = state.create_session()?;
    let render = handle.context().lock().await.render();
    Ok((StatusCode::CREATED, Json(render)))
}

/// GET /api/sessions/:id - Current render
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Render>> {
    Ok(Json(run_event(&state, id, Event::Refresh).await?))
}

/// GET /api/sessions/:id/status - Busy flags, answered while an event runs
pub async fn session_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BusyFlags>> {
    Ok(Json(state.session(&id)?.busy()))
}

/// DELETE /api/sessions/:id - End a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.remove_session(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/files - Upload a batch of PDFs
pub async fn upload_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Render>> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        Error::internal(format!("Failed to read multipart field: {}", e))
    })? {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::internal(format!("Failed to read {}: {}", filename, e)))?;

        files.push(UploadedFile::new(filename, data));
    }

    tracing::info!("Session {} uploaded {} files", id, files.len());
    Ok(Json(run_event(&state, id, Event::FilesUploaded(files)).await?))
}

/// POST /api/sessions/:id/questions - Ask a question
pub async fn ask_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<Render>> {
    Ok(Json(
        run_event(&state, id, Event::QuestionSubmitted(request.question)).await?,
    ))
}

/// PUT /api/sessions/:id/input - Update the pending question text
pub async fn update_input(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<InputRequest>,
) -> Result<Json<Render>> {
    Ok(Json(run_event(&state, id, Event::InputChanged(request.text)).await?))
}
