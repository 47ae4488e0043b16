//! Format definitions
//!
//! The serialization capability injected into a `Codec`, and the enumeration
//! of primary formats a `CodecConfig` can select.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BinKvError, CodecError};

/// A serialization format
///
/// Implementations turn any serde value into bytes and back. Errors are
/// reported as `CodecError::Encode` / `CodecError::Decode`.
pub trait Format: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Serialize a value
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserialize a value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Primary binary format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatType {
    MessagePack,
    Protobuf,
}

impl FormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatType::MessagePack => "messagepack",
            FormatType::Protobuf => "protobuf",
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatType {
    type Err = BinKvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "messagepack" | "msgpack" => Ok(FormatType::MessagePack),
            "protobuf" | "proto" => Ok(FormatType::Protobuf),
            other => Err(BinKvError::Config(format!(
                "Unknown serialization format: {:?} (expected messagepack or protobuf)",
                other
            ))),
        }
    }
}
