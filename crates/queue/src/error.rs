use thiserror::Error;

/// Errors from querying the message broker.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker URL is not an absolute http(s) URL.
    #[error("invalid broker URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The underlying HTTP client could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be sent or the reply could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The broker answered but reported a failure.
    #[error("broker returned status {status} for queue '{queue}': {message}")]
    Remote {
        queue: String,
        status: u16,
        message: String,
    },

    /// The reply did not contain a usable queue size.
    #[error("unexpected reply for queue '{queue}': {reason}")]
    InvalidReply { queue: String, reason: String },
}
