use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// RFC 3339 (ISO-8601) timestamp kept as the exact string that was hashed.
///
/// The string form is the source of truth: re-rendering a parsed
/// `DateTime` could change precision or offset notation and would break
/// every hash computed over it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Current UTC time with microsecond precision, e.g.
    /// `2024-05-01T12:00:00.123456Z`.
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Wrap an existing RFC 3339 string after checking that it parses.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(s)
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))?;
        Ok(Self(s.to_string()))
    }

    /// The stored string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a UTC `DateTime`.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, TypeError> {
        DateTime::parse_from_rfc3339(&self.0)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| TypeError::InvalidTimestamp(format!("{}: {e}", self.0)))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
