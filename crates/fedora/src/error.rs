use regen_ocr_core::ProfileError;
use thiserror::Error;

/// Errors from the repository client.
///
/// An HTTP answer other than 200 is not an error: the listing is reported as
/// empty. These variants cover configuration mistakes, transport failures and
/// responses that cannot be interpreted.
#[derive(Debug, Error)]
pub enum FedoraError {
    /// The base URL is not an absolute http(s) URL.
    #[error("invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The underlying HTTP client could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The listing body is not well-formed or lacks required attributes.
    #[error("malformed datastream listing: {0}")]
    Xml(String),

    /// A datastream profile carried values that do not parse.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl FedoraError {
    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        Self::Xml(err.to_string())
    }
}
