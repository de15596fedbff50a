use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the collaborators the pipeline calls into
/// (fetching, selecting, parsing).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// HTTP request failed (non-success status, unreadable body, bad URL).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The page was fetched but the expected structure could not be selected.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A CSS selector failed to compile.
    #[error("Invalid selector '{selector}': {message}")]
    SelectorError { selector: String, message: String },

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

/// Fatal pipeline errors. These are the only errors allowed to
/// short-circuit a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The seed listing could not be fetched or parsed. No extraction
    /// work is started.
    #[error("Seed fetch failed for {url}: {source}")]
    SeedFetch {
        url: String,
        #[source]
        source: AppError,
    },

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The result set could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The serialized result set could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Internal coordination failure (closed permit pool, lost task).
    #[error("Internal pipeline error: {0}")]
    Internal(String),
}

/// Why a single work item failed. Carried as data inside a failed
/// `ExtractionResult`; never propagated as control flow.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ItemError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("extraction task panicked: {0}")]
    Panicked(String),

    #[error("cancelled before extraction started")]
    Cancelled,

    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

impl AppError {
    /// Returns true if this error is transient (worth retrying on a later run).
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}

impl ItemError {
    /// Short machine-friendly label, used in logs and per-kind failure counts.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Fetch(_) => "fetch",
            ItemError::Parse(_) => "parse",
            ItemError::Timeout(_) => "timeout",
            ItemError::Panicked(_) => "panicked",
            ItemError::Cancelled => "cancelled",
            ItemError::Dispatch(_) => "dispatch",
        }
    }
}
