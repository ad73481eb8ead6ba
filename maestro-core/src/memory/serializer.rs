//! Serialization of checkpoint channel values to bytes.
//!
//! `SqliteSaver` needs state serialized to a `BLOB` column; `MemorySaver` does not
//! (it keeps `S` directly), but shares the same `Serializer` contract so callers can
//! swap checkpointers without caring which one actually serializes.

use serde::{de::DeserializeOwned, Serialize};

use crate::memory::checkpointer::CheckpointError;

/// Type tag for a JSON-encoded payload.
pub const TYPE_JSON: &str = "json";
/// Type tag for an opaque byte payload (no further decoding).
pub const TYPE_BYTES: &str = "bytes";
/// Type tag for an explicit null / absent value.
pub const TYPE_NULL: &str = "null";

/// Converts a state snapshot to and from bytes for storage.
pub trait Serializer<S>: Send + Sync {
    /// Encodes `value` to bytes.
    fn serialize(&self, value: &S) -> Result<Vec<u8>, CheckpointError>;

    /// Decodes bytes back into a state snapshot.
    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError>;
}

/// A decoded payload tagged with the encoding used, for inspection/debugging tools.
#[derive(Debug, Clone)]
pub struct TypedData {
    /// One of `TYPE_JSON`, `TYPE_BYTES`, `TYPE_NULL`.
    pub type_tag: &'static str,
    /// The raw bytes.
    pub bytes: Vec<u8>,
}

/// `serde_json`-backed serializer. The default and only implementation shipped here.
pub struct JsonSerializer;

impl<S> Serializer<S> for JsonSerializer
where
    S: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &S) -> Result<Vec<u8>, CheckpointError> {
        serde_json::to_vec(value).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError> {
        serde_json::from_slice(bytes).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }
}

/// Serializer that also exposes the type tag of what it encoded, for tooling that
/// needs to distinguish JSON payloads from raw bytes without decoding them.
pub trait TypedSerializer<S>: Serializer<S> {
    /// Encodes `value`, returning the bytes alongside the type tag used.
    fn serialize_typed(&self, value: &S) -> Result<TypedData, CheckpointError>;
}

impl<S> TypedSerializer<S> for JsonSerializer
where
    S: Serialize + DeserializeOwned,
{
    fn serialize_typed(&self, value: &S) -> Result<TypedData, CheckpointError> {
        Ok(TypedData {
            type_tag: TYPE_JSON,
            bytes: Serializer::serialize(self, value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Demo {
        n: i32,
    }

    /// **Scenario**: round-tripping a value through `JsonSerializer` preserves it.
    #[test]
    fn json_round_trip() {
        let ser = JsonSerializer;
        let value = Demo { n: 7 };
        let bytes = ser.serialize(&value).unwrap();
        let back: Demo = ser.deserialize(&bytes).unwrap();
        assert_eq!(value, back);
    }

    /// **Scenario**: `serialize_typed` tags the payload as JSON.
    #[test]
    fn serialize_typed_tags_json() {
        let ser = JsonSerializer;
        let typed = ser.serialize_typed(&Demo { n: 1 }).unwrap();
        assert_eq!(typed.type_tag, TYPE_JSON);
    }

    /// **Scenario**: malformed bytes produce a `Serialization` error, not a panic.
    #[test]
    fn deserialize_invalid_bytes_errors() {
        let ser = JsonSerializer;
        let result: Result<Demo, _> = ser.deserialize(b"not json");
        assert!(matches!(result, Err(CheckpointError::Serialization(_))));
    }
}
