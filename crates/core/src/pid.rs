use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PidError;

/// A validated repository object identifier of the form `namespace:local-id`.
///
/// Exactly one `:` separates two non-empty segments. Surrounding whitespace
/// is trimmed before validation, so identifiers read from files compare
/// equal to the same identifier typed on the command line.
///
/// # Examples
///
/// ```
/// use regen_ocr_core::Pid;
///
/// let pid = Pid::parse("  demo:42\n").unwrap();
/// assert_eq!(pid.namespace(), "demo");
/// assert_eq!(pid.local_id(), "42");
/// assert!(Pid::parse("demo").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pid(String);

impl Pid {
    /// Validate and wrap a raw identifier.
    pub fn parse(raw: &str) -> Result<Self, PidError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PidError::Empty);
        }

        let mut parts = trimmed.split(':');
        let (Some(namespace), Some(local), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(PidError::Malformed(trimmed.to_owned()));
        };

        if namespace.is_empty() || local.is_empty() {
            return Err(PidError::Malformed(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// The part before the separator.
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map_or("", |(ns, _)| ns)
    }

    /// The part after the separator.
    pub fn local_id(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, id)| id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Pid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Pid {
    type Err = PidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pid {
    type Error = PidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pid> for String {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}
