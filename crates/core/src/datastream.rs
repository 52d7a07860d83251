//! Datastream metadata as reported by the repository.
//!
//! A listing fetched without profiles only carries the identifier, label and
//! media type of each datastream. A profile listing carries everything. The
//! two shapes are kept apart as variants of [`DatastreamDescriptor`] so that
//! callers cannot mistake a missing value for a real one.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Reserved identifier of the OCR text datastream.
pub const OCR_DSID: &str = "OCR";

/// Timestamp layout used by the repository for `dsCreateDate`.
///
/// `%.f` accepts any number of fractional digits (or none), so both
/// `2023-05-01T12:00:00.000Z` and `2023-05-01T12:00:00.000000Z` parse.
pub const CREATED_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Parse a repository creation timestamp as UTC.
pub fn parse_created_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), CREATED_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Lifecycle state of a datastream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatastreamState {
    Active,
    Inactive,
    Deleted,
    /// A state code this tool does not know about, kept verbatim.
    Other(String),
}

impl DatastreamState {
    /// Interpret a repository state code (`A`, `I`, `D`).
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "A" => Self::Active,
            "I" => Self::Inactive,
            "D" => Self::Deleted,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The repository state code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "A",
            Self::Inactive => "I",
            Self::Deleted => "D",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for DatastreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of a lightweight listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamSummary {
    pub id: String,
    pub label: String,
    pub mime_type: String,
}

/// Full datastream profile.
///
/// Only the id is guaranteed. The repository leaves elements empty often
/// enough that every other field may be unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamProfile {
    pub id: String,
    pub label: String,
    pub version: Option<u32>,
    pub state: Option<DatastreamState>,
    pub mime_type: String,
    pub size: Option<u64>,
    pub control_group: String,
    pub location: String,
    pub created: Option<DateTime<Utc>>,
}

/// Unparsed profile fields as they appear in the repository response.
///
/// Parsers fill this in element by element and then convert it with
/// [`DatastreamProfile::try_from`], which is where numeric and date fields
/// are interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProfile {
    pub id: String,
    pub label: Option<String>,
    pub version_id: Option<String>,
    pub state: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<String>,
    pub control_group: Option<String>,
    pub location: Option<String>,
    pub created: Option<String>,
}

impl RawProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    fn invalid(&self, field: &'static str, value: &str) -> ProfileError {
        ProfileError::InvalidField {
            dsid: self.id.clone(),
            field,
            value: value.to_owned(),
        }
    }

    /// The version number encoded in `dsVersionID` (`"<dsid>.<n>"`).
    fn parse_version(&self, version_id: &str) -> Result<u32, ProfileError> {
        let number = version_id
            .strip_prefix(&self.id)
            .and_then(|rest| rest.strip_prefix('.'))
            .or_else(|| version_id.rsplit_once('.').map(|(_, n)| n))
            .unwrap_or(version_id);
        number
            .parse()
            .map_err(|_| self.invalid("version", version_id))
    }
}

/// Trimmed text of an element, `None` when absent or blank.
fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl TryFrom<RawProfile> for DatastreamProfile {
    type Error = ProfileError;

    /// Absent or blank elements become unknown fields. Only text that is
    /// present but unreadable is an error.
    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        let version = present(raw.version_id.as_ref())
            .map(|v| raw.parse_version(v))
            .transpose()?;

        let size = present(raw.size.as_ref())
            .map(|v| v.parse().map_err(|_| raw.invalid("size", v)))
            .transpose()?;

        let created = present(raw.created.as_ref())
            .map(|v| parse_created_date(v).ok_or_else(|| raw.invalid("creation date", v)))
            .transpose()?;

        let state = present(raw.state.as_ref()).map(DatastreamState::from_code);

        Ok(Self {
            label: raw.label.unwrap_or_default(),
            mime_type: raw.mime_type.unwrap_or_default(),
            control_group: raw.control_group.unwrap_or_default(),
            location: raw.location.unwrap_or_default(),
            id: raw.id,
            version,
            state,
            size,
            created,
        })
    }
}

/// Metadata for one datastream of a repository object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatastreamDescriptor {
    /// From a lightweight listing: version, size, state, location and
    /// creation time are unknown.
    Listed(DatastreamSummary),
    /// From a profile listing.
    Profiled(DatastreamProfile),
}

impl DatastreamDescriptor {
    pub fn listed(
        id: impl Into<String>,
        label: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self::Listed(DatastreamSummary {
            id: id.into(),
            label: label.into(),
            mime_type: mime_type.into(),
        })
    }

    /// Build a profiled descriptor from raw response fields.
    pub fn from_profile(raw: RawProfile) -> Result<Self, ProfileError> {
        DatastreamProfile::try_from(raw).map(Self::Profiled)
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Listed(s) => &s.id,
            Self::Profiled(p) => &p.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Listed(s) => &s.label,
            Self::Profiled(p) => &p.label,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::Listed(s) => &s.mime_type,
            Self::Profiled(p) => &p.mime_type,
        }
    }

    pub fn profile(&self) -> Option<&DatastreamProfile> {
        match self {
            Self::Listed(_) => None,
            Self::Profiled(p) => Some(p),
        }
    }

    pub fn version(&self) -> Option<u32> {
        self.profile().and_then(|p| p.version)
    }

    pub fn size(&self) -> Option<u64> {
        self.profile().and_then(|p| p.size)
    }

    pub fn state(&self) -> Option<&DatastreamState> {
        self.profile().and_then(|p| p.state.as_ref())
    }

    /// Creation time, when the listing reported one.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.profile().and_then(|p| p.created)
    }
}

impl fmt::Display for DatastreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size() {
            Some(size) => write!(
                f,
                "Datastream: {} - {} - {size} bytes",
                self.id(),
                self.mime_type()
            ),
            None => write!(
                f,
                "Datastream: {} - {} - unknown bytes",
                self.id(),
                self.mime_type()
            ),
        }
    }
}

/// The datastreams of one object, keyed by datastream id.
///
/// Iteration follows the order the repository returned them in. A second
/// entry with an id already present is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDatastreamSet {
    entries: Vec<DatastreamDescriptor>,
    index: HashMap<String, usize>,
}

impl ObjectDatastreamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor. Returns `false` if the id was already present.
    pub fn insert(&mut self, descriptor: DatastreamDescriptor) -> bool {
        if self.index.contains_key(descriptor.id()) {
            return false;
        }
        self.index
            .insert(descriptor.id().to_owned(), self.entries.len());
        self.entries.push(descriptor);
        true
    }

    pub fn get(&self, dsid: &str) -> Option<&DatastreamDescriptor> {
        self.index.get(dsid).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, dsid: &str) -> bool {
        self.index.contains_key(dsid)
    }

    /// The `OCR` datastream, if the object has one.
    pub fn ocr(&self) -> Option<&DatastreamDescriptor> {
        self.get(OCR_DSID)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DatastreamDescriptor> {
        self.entries.iter()
    }
}

impl FromIterator<DatastreamDescriptor> for ObjectDatastreamSet {
    fn from_iter<I: IntoIterator<Item = DatastreamDescriptor>>(iter: I) -> Self {
        let mut set = Self::new();
        for descriptor in iter {
            set.insert(descriptor);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ObjectDatastreamSet {
    type Item = &'a DatastreamDescriptor;
    type IntoIter = std::slice::Iter<'a, DatastreamDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
