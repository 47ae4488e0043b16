//! JSON text format, used as the fallback

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Format;
use crate::error::CodecError;

/// UTF-8 JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Format for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(format!("json: {}", e)))
    }

    /// Bytes must be valid UTF-8 before they are parsed.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CodecError::Decode(format!("json: payload is not UTF-8: {}", e)))?;
        serde_json::from_str(text).map_err(|e| CodecError::Decode(format!("json: {}", e)))
    }
}
