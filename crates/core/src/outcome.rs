use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of checking one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegenerationOutcome {
    /// The OCR service accepted the regeneration request.
    Regenerated {
        status: u16,
        /// Creation time of the replaced datastream, if it was known.
        previous: Option<DateTime<Utc>>,
    },
    /// The OCR datastream was created at or after the cutoff.
    UpToDate { created: DateTime<Utc> },
    /// The object has no `OCR` datastream (or the listing came back empty).
    NoOcrDatastream,
    /// The identifier is not of the form `namespace:local-id`.
    InvalidIdentifier { reason: String },
    /// The OCR service refused the request or could not be reached.
    RegenerationFailed {
        status: Option<u16>,
        reason: String,
    },
    /// The repository could not be reached or returned an unreadable
    /// listing.
    MetadataUnavailable { reason: String },
}

impl RegenerationOutcome {
    /// Short machine-friendly name of the outcome kind.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Regenerated { .. } => OutcomeKind::Regenerated,
            Self::UpToDate { .. } => OutcomeKind::UpToDate,
            Self::NoOcrDatastream => OutcomeKind::NoOcrDatastream,
            Self::InvalidIdentifier { .. } => OutcomeKind::InvalidIdentifier,
            Self::RegenerationFailed { .. } => OutcomeKind::RegenerationFailed,
            Self::MetadataUnavailable { .. } => OutcomeKind::MetadataUnavailable,
        }
    }

    /// Whether this outcome should make the run report failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::RegenerationFailed { .. } | Self::MetadataUnavailable { .. }
        )
    }
}

/// Discriminant of [`RegenerationOutcome`], used for tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Regenerated,
    UpToDate,
    NoOcrDatastream,
    InvalidIdentifier,
    RegenerationFailed,
    MetadataUnavailable,
}

impl OutcomeKind {
    pub const ALL: [Self; 6] = [
        Self::Regenerated,
        Self::UpToDate,
        Self::NoOcrDatastream,
        Self::InvalidIdentifier,
        Self::RegenerationFailed,
        Self::MetadataUnavailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regenerated => "regenerated",
            Self::UpToDate => "up_to_date",
            Self::NoOcrDatastream => "no_ocr_datastream",
            Self::InvalidIdentifier => "invalid_identifier",
            Self::RegenerationFailed => "regeneration_failed",
            Self::MetadataUnavailable => "metadata_unavailable",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an HTTP status from the OCR service counts as success.
///
/// Anything in `[200, 400)` is accepted, including redirects and
/// accepted-for-processing responses.
pub fn is_regeneration_success(status: u16) -> bool {
    (200..400).contains(&status)
}
