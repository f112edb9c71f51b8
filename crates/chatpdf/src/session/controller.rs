//! Event dispatch for chat sessions
//!
//! Each UI interaction becomes an [`Event`]. [`dispatch`] applies it to the
//! session context, calling the agent as needed, and returns what to render.

use bytes::Bytes;
use parking_lot::RwLock;
use std::io::Write;
use std::sync::Arc;

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::ingestion::is_pdf;
use crate::types::DisplayMessage;

use super::context::{BusyFlags, IngestFailure, IngestReport, Render, SessionContext};

/// A file received from the upload control
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename, used for progress display
    pub name: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// UI events
#[derive(Debug, Clone)]
pub enum Event {
    /// A batch of files was uploaded; replaces all prior documents and messages
    FilesUploaded(Vec<UploadedFile>),
    /// The user submitted a question
    QuestionSubmitted(String),
    /// The question box text changed
    InputChanged(String),
    /// Re-render without changes
    Refresh,
}

/// Apply one event to a session
pub async fn dispatch(ctx: &mut SessionContext, event: Event) -> Result<Render> {
    match event {
        Event::FilesUploaded(files) => files_uploaded(ctx, files).await,
        Event::QuestionSubmitted(text) => question_submitted(ctx, &text).await,
        Event::InputChanged(text) => {
            ctx.user_input = text;
            Ok(ctx.render())
        }
        Event::Refresh => Ok(ctx.render()),
    }
}

/// Sets a busy flag and clears it on drop, including when the event is cancelled
struct BusyGuard {
    flags: Arc<RwLock<BusyFlags>>,
    clear: fn(&mut BusyFlags),
}

impl BusyGuard {
    fn ingesting(flags: Arc<RwLock<BusyFlags>>, filename: &str) -> Self {
        flags.write().ingesting = Some(filename.to_string());
        Self {
            flags,
            clear: |busy| busy.ingesting = None,
        }
    }

    fn answering(flags: Arc<RwLock<BusyFlags>>) -> Self {
        flags.write().answering = true;
        Self {
            flags,
            clear: |busy| busy.answering = false,
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut flags = self.flags.write();
        (self.clear)(&mut *flags);
    }
}

fn enabled_agent(ctx: &mut SessionContext) -> Result<&mut Agent> {
    if !ctx.is_key_set() {
        return Err(Error::ControlsDisabled);
    }
    ctx.agent.as_mut().ok_or(Error::ControlsDisabled)
}

async fn files_uploaded(ctx: &mut SessionContext, files: Vec<UploadedFile>) -> Result<Render> {
    enabled_agent(ctx)?.forget();
    ctx.messages.clear();
    ctx.user_input.clear();

    let busy = ctx.busy_handle();
    let agent = enabled_agent(ctx)?;
    let mut report = IngestReport::default();

    // One bad file does not stop the rest of the batch
    for file in files {
        tracing::info!("Ingesting {} ({} bytes)", file.name, file.data.len());

        let result = {
            let _ingesting = BusyGuard::ingesting(Arc::clone(&busy), &file.name);
            ingest_file(agent, &file).await
        };

        match result {
            Ok(()) => report.loaded.push(file.name),
            Err(e) => {
                tracing::warn!("Failed to ingest {}: {}", file.name, e);
                report.failed.push(IngestFailure {
                    filename: file.name,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Upload finished: {} loaded, {} failed",
        report.loaded.len(),
        report.failed.len()
    );

    let mut render = ctx.render();
    render.ingest_report = Some(report);
    Ok(render)
}

/// Stage the upload in a temporary file for the loader; the file is removed on drop
async fn ingest_file(agent: &mut Agent, file: &UploadedFile) -> Result<()> {
    if !is_pdf(&file.name) {
        return Err(Error::UnsupportedFileType(file.name.clone()));
    }

    let mut staged = tempfile::Builder::new()
        .prefix("chatpdf-")
        .suffix(".pdf")
        .tempfile()?;
    staged.write_all(&file.data)?;
    staged.flush()?;

    agent.doc_load_named(staged.path(), &file.name).await
}

async fn question_submitted(ctx: &mut SessionContext, text: &str) -> Result<Render> {
    if !ctx.is_key_set() {
        return Err(Error::ControlsDisabled);
    }

    let question = text.trim();
    if question.is_empty() {
        return Ok(ctx.render());
    }

    let busy = ctx.busy_handle();
    let agent = enabled_agent(ctx)?;

    let answer = {
        let _answering = BusyGuard::answering(busy);
        agent.ask(question).await?
    };

    ctx.messages.push(DisplayMessage::user(question));
    ctx.messages.push(DisplayMessage::agent(answer));
    ctx.user_input.clear();

    Ok(ctx.render())
}
