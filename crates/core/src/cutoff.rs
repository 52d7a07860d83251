//! The staleness cutoff and the decision it drives.

use std::fmt;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::datastream::DatastreamDescriptor;
use crate::error::CutoffError;

/// Calendar date layout accepted on the command line.
pub const CUTOFF_DATE_FORMAT: &str = "%Y-%m-%d";

/// Point in time before which OCR text is considered outdated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cutoff(DateTime<Utc>);

impl Cutoff {
    /// Wrap a timestamp without checking it against the clock.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Wrap a timestamp that must lie strictly before `now`.
    pub fn in_past(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<Self, CutoffError> {
        if at < now {
            Ok(Self(at))
        } else {
            Err(CutoffError::NotInPast { cutoff: at, now })
        }
    }

    /// Midnight of `date` in the local timezone, expressed in UTC.
    pub fn local_midnight(date: NaiveDate) -> Result<Self, CutoffError> {
        Self::midnight_in(&Local, date)
    }

    /// Midnight of `date` in `tz`. When a DST gap swallows midnight, the
    /// first minute after the gap is used.
    fn midnight_in<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<Self, CutoffError> {
        let midnight = date.and_time(NaiveTime::MIN);
        (0..24 * 60)
            .map(|minute| midnight + Duration::minutes(minute))
            .find_map(|local| tz.from_local_datetime(&local).earliest())
            .map(|at| Self(at.with_timezone(&Utc)))
            .ok_or(CutoffError::NonexistentLocalTime(date))
    }

    /// Parse a `YYYY-MM-DD` date and take local midnight of that day.
    pub fn parse_local_date(text: &str) -> Result<Self, CutoffError> {
        let date = NaiveDate::parse_from_str(text.trim(), CUTOFF_DATE_FORMAT)
            .map_err(|_| CutoffError::InvalidDate(text.to_owned()))?;
        Self::local_midnight(date)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Decide whether a datastream needs regenerating.
    ///
    /// Comparison is strict and at full precision: a datastream created
    /// exactly at the cutoff is current. A descriptor without a creation
    /// time (lightweight listing) cannot be compared and is treated as
    /// infinitely old.
    pub fn assess(&self, datastream: &DatastreamDescriptor) -> Staleness {
        match datastream.created() {
            Some(created) if created < self.0 => Staleness::Stale {
                created: Some(created),
            },
            Some(created) => Staleness::Current { created },
            None => Staleness::Stale { created: None },
        }
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<DateTime<Utc>> for Cutoff {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

/// Result of comparing a datastream against the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Older than the cutoff, or of unknown age.
    Stale { created: Option<DateTime<Utc>> },
    /// Created at or after the cutoff.
    Current { created: DateTime<Utc> },
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}
