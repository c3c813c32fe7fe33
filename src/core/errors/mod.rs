//! Error handling for the notes pipeline.

mod types;

pub use types::{NotesError, ProcessingStage};

/// Result alias used across the crate.
pub type NotesResult<T> = Result<T, NotesError>;
