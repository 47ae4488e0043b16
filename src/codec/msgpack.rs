//! MessagePack format
//!
//! Non-native types reach the encoder through their own `Serialize` impl,
//! which either lowers them to a MessagePack primitive or fails. Such a
//! failure is what sends a value down the JSON fallback path.

use std::io::Cursor;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Format;
use crate::error::CodecError;

/// MessagePack via `rmp-serde`
#[derive(Debug, Clone, Copy)]
pub struct MessagePack {
    /// Write structs as field-name keyed maps instead of positional arrays
    struct_map: bool,
}

impl MessagePack {
    /// Structs as maps keyed by field name (the default)
    ///
    /// Keeps the payload shape identical to the JSON fallback.
    pub fn named() -> Self {
        Self { struct_map: true }
    }

    /// Structs as positional arrays
    pub fn compact() -> Self {
        Self { struct_map: false }
    }
}

impl Default for MessagePack {
    fn default() -> Self {
        Self::named()
    }
}

impl Format for MessagePack {
    fn name(&self) -> &'static str {
        "messagepack"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let result = if self.struct_map {
            rmp_serde::to_vec_named(value)
        } else {
            rmp_serde::to_vec(value)
        };
        result.map_err(|e| CodecError::Encode(format!("messagepack: {}", e)))
    }

    /// Binary strings are accepted where text is expected, provided they are
    /// valid UTF-8. The payload must hold exactly one value.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let mut de = rmp_serde::Deserializer::new(Cursor::new(bytes));
        let value = T::deserialize(&mut de).map_err(|e| CodecError::Decode(format!("messagepack: {}", e)))?;

        let consumed = de.get_ref().position() as usize;
        if consumed < bytes.len() {
            return Err(CodecError::Decode(format!(
                "messagepack: {} trailing bytes after value",
                bytes.len() - consumed
            )));
        }
        Ok(value)
    }
}
