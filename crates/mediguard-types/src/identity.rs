use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Globally unique passport identifier (128-bit random, UUID v4).
///
/// Generated after the passport payload has been hashed, so it is never part
/// of the hashed or HMAC-protected content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassportId(uuid::Uuid);

impl PassportId {
    /// Generate a fresh random passport ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for PassportId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for PassportId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidPassportId(format!("{s}: {e}")))
    }
}

impl fmt::Debug for PassportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PassportId({})", self.short_id())
    }
}

impl fmt::Display for PassportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(PassportId::new(), PassportId::new());
    }

    #[test]
    fn ids_are_version_4() {
        let id = PassportId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn parse_roundtrip() {
        let id = PassportId::new();
        let parsed: PassportId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<PassportId>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidPassportId(_)));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = PassportId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn short_id_is_8_chars() {
        assert_eq!(PassportId::new().short_id().len(), 8);
    }
}
