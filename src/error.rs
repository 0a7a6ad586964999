//! Error types.
//!
//! The runtime never lets these escape a page-level operation: the mount
//! pipeline, persistence and directive wiring log them and fall back to
//! defaults. They are public so hosts can call the fallible pieces directly.

use thiserror::Error;

/// Failure to load or parse markup.
#[derive(Debug, Error)]
pub enum DomError {
    #[error("html parse error: {0}")]
    Parse(String),
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
}

/// Failure to read a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no element with id `{0}` holds a manifest")]
    Missing(String),
}

/// Durable storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Network failure surfaced by the retrying fetch helper.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}
