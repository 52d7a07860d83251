use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Reasons an identifier is rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PidError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier '{0}' is not of the form namespace:local-id")]
    Malformed(String),
}

/// A datastream profile whose fields could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// A profile element was present but did not parse.
    #[error("datastream '{dsid}' has invalid {field}: '{value}'")]
    InvalidField {
        dsid: String,
        field: &'static str,
        value: String,
    },
}

/// Errors raised while establishing the staleness cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CutoffError {
    /// The cutoff must lie strictly in the past.
    #[error("cutoff {cutoff} is not in the past (now is {now})")]
    NotInPast {
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// A calendar date could not be parsed.
    #[error("invalid cutoff date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Local midnight does not exist on this date (DST gap).
    #[error("local midnight does not exist on {0}")]
    NonexistentLocalTime(NaiveDate),
}
