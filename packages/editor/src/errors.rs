//! Error types for the editor core

use crate::tree::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No node at path {0:?}")]
    PathNotFound(Path),

    #[error("Unknown node kind: {0}")]
    UnknownKind(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("History replay failed: {0}")]
    Replay(String),
}

pub type EditorResult<T> = Result<T, EditorError>;
