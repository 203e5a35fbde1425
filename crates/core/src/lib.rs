//! Konspekt Core Library
//!
//! Client-side state machine for a video/audio summarization service:
//! submission dispatch, independent per-task status polling, the shared
//! task registry, per-task Q&A chat, mind-map outlines, and summary export.
//! The backend does all the heavy lifting; this crate only drives the HTTP
//! contract and keeps the session's view of it consistent.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod export;
pub mod mindmap;
pub mod poller;
pub mod registry;
pub mod submit;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used items at crate root
pub use api::{HttpApi, SummarizerApi};
pub use chat::{ChatEntry, ChatEntryKind, ChatSession};
pub use config::{ClientConfig, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT};
pub use error::{KonspektError, Result};
pub use export::{default_export_dir, export_summary, summary_file_name};
pub use mindmap::{
    MAX_SCALE, MIN_SCALE, MindmapHandle, MindmapRenderer, OutlineMap, OutlineNode, parse_outline,
};
pub use poller::{PollHandle, Poller};
pub use registry::{RegistryEvent, TaskEntry, TaskHealth, TaskRegistry};
pub use submit::{SubmissionController, SubmissionOutcome};
pub use types::{STATUS_DONE, STATUS_FAILED, TaskPhase, TaskSnapshot};
