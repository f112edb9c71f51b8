//! chatpdf: conversational question answering over uploaded PDF documents
//!
//! A user uploads PDF files, the [`Agent`] indexes their pages, and questions are
//! answered by a conversational retrieval chain backed by a hosted LLM. The
//! [`session`] module sequences UI events against the agent, and [`server`]
//! exposes sessions over HTTP.

pub mod agent;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{Agent, AgentState, NO_DOCUMENT_MESSAGE};
pub use config::ChatPdfConfig;
pub use error::{Error, Result};
pub use session::{dispatch, Event, Render, SessionContext, UploadedFile};
pub use types::{
    chat::{ChatTurn, DisplayMessage},
    document::{Chunk, ChunkSource, LoadedDocument, Page},
};
