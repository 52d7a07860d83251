//! Core types for the OCR regeneration tool.
//!
//! Identifiers, datastream metadata, the staleness cutoff and the per-object
//! outcome. Nothing here performs I/O.

pub mod cutoff;
pub mod datastream;
pub mod error;
pub mod outcome;
pub mod pid;

pub use cutoff::{CUTOFF_DATE_FORMAT, Cutoff, Staleness};
pub use datastream::{
    CREATED_DATE_FORMAT, DatastreamDescriptor, DatastreamProfile, DatastreamState,
    DatastreamSummary, OCR_DSID, ObjectDatastreamSet, RawProfile, parse_created_date,
};
pub use error::{CutoffError, PidError, ProfileError};
pub use outcome::{OutcomeKind, RegenerationOutcome, is_regeneration_success};
pub use pid::Pid;
