//! Core types for documents, chunks and chat turns

pub mod chat;
pub mod document;

pub use chat::{ChatTurn, DisplayMessage};
pub use document::{Chunk, ChunkSource, LoadedDocument, Page};
