//! Chat sessions: explicit per-session state and event dispatch

mod context;
mod controller;

pub use context::{BusyFlags, IngestFailure, IngestReport, Render, RenderedMessage, SessionContext};
pub use controller::{dispatch, Event, UploadedFile};
