use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Opaque application payload carried by a ledger block.
///
/// The ledger never looks inside a payload; it only canonicalizes and hashes
/// it. The concrete schema belongs to the caller, which moves typed values in
/// and out with [`Payload::encode`] and [`Payload::decode`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    /// Encode any serializable value as a payload.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, TypeError> {
        serde_json::to_value(value)
            .map(Self)
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode the payload into a caller-defined type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TypeError> {
        T::deserialize(&self.0).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Wrap an already-built JSON value.
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Empty payload.
    pub fn null() -> Self {
        Self(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
