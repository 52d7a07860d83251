use std::path::PathBuf;

use regen_ocr_core::CutoffError;
use thiserror::Error;

/// Errors that stop a run or reject an engine operation.
///
/// Per-identifier problems never show up here; they become a
/// [`RegenerationOutcome`](regen_ocr_core::RegenerationOutcome).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested cutoff is unusable.
    #[error("invalid cutoff: {0}")]
    InvalidCutoff(#[from] CutoffError),

    /// The identifier file could not be opened or read.
    #[error("cannot read identifiers from {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the OCR generation client.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The OCR service URL is not an absolute http(s) URL.
    #[error("invalid OCR service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The underlying HTTP client could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be sent.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
