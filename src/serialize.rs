//! Result blob serialization.
//!
//! The cache stores opaque byte blobs; this is the encoder/decoder pair
//! that produces and reads them. JSON keeps the blob readable by the
//! status and download surfaces without a schema registry.

use serde::Serialize;
use serde_json::Value;

/// Encoder/decoder for cached result blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serializer;

impl Serializer {
    /// Encodes a value into the cached blob format.
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(value)
    }

    /// Decodes a cached blob back into a JSON value.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
