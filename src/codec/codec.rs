//! Value codec
//!
//! Primary format selected by `CodecConfig`, JSON fallback on failure.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Format, FormatType, Json, MessagePack, Protobuf, Schema};
use crate::config::CodecConfig;
use crate::error::CodecError;

/// Bytes produced by `Codec::encode_tagged`, labelled with the format that
/// produced them
///
/// The label is never written into the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Primary(Vec<u8>),
    Fallback(Vec<u8>),
}

impl Encoded {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Encoded::Fallback(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Encoded::Primary(bytes) | Encoded::Fallback(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Encoded::Primary(bytes) | Encoded::Fallback(bytes) => bytes,
        }
    }
}

/// Encodes values with the configured primary format, falling back to JSON
#[derive(Debug, Clone)]
pub struct Codec {
    config: CodecConfig,
    msgpack: MessagePack,
    protobuf: Protobuf,
    fallback: Json,
}

impl Codec {
    /// Create a codec with default formats and no protobuf schema
    pub fn new(config: CodecConfig) -> Self {
        Self::with_formats(config, MessagePack::default(), Protobuf::new(), Json)
    }

    /// Create a codec from explicit format instances
    pub fn with_formats(
        config: CodecConfig,
        msgpack: MessagePack,
        protobuf: Protobuf,
        fallback: Json,
    ) -> Self {
        Self {
            config,
            msgpack,
            protobuf,
            fallback,
        }
    }

    /// Attach the default protobuf schema
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.protobuf = Protobuf::with_schema(schema);
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn format_type(&self) -> FormatType {
        self.config.format_type
    }

    pub fn fallback_enabled(&self) -> bool {
        self.config.fallback_enabled
    }

    /// Encode a value
    ///
    /// Fallback bytes are returned exactly like primary bytes.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        self.encode_tagged(value).map(Encoded::into_bytes)
    }

    /// Encode a value, reporting which format produced the bytes
    pub fn encode_tagged<T: Serialize + ?Sized>(&self, value: &T) -> Result<Encoded, CodecError> {
        let primary_err = match self.encode_primary(value) {
            Ok(bytes) => return Ok(Encoded::Primary(bytes)),
            Err(e) => e,
        };

        if !self.config.fallback_enabled {
            return Err(primary_err);
        }

        tracing::debug!(
            format = %self.config.format_type,
            error = %primary_err,
            "primary encode failed, falling back to {}",
            self.fallback.name()
        );

        self.fallback.encode(value).map(Encoded::Fallback).map_err(|fallback_err| {
            CodecError::Encode(format!("{}; fallback: {}", primary_err, fallback_err))
        })
    }

    /// Decode bytes with the default protobuf schema (if any)
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        self.decode_with_schema(bytes, None)
    }

    /// Decode bytes
    ///
    /// `schema` only matters for the protobuf format and overrides the codec's
    /// default schema.
    pub fn decode_with_schema<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
        schema: Option<&Schema>,
    ) -> Result<T, CodecError> {
        let primary_err = match self.decode_primary(bytes, schema) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !self.config.fallback_enabled {
            return Err(primary_err);
        }

        tracing::debug!(
            format = %self.config.format_type,
            error = %primary_err,
            len = bytes.len(),
            "primary decode failed, trying {}",
            self.fallback.name()
        );

        self.fallback.decode(bytes).map_err(|fallback_err| {
            CodecError::Decode(format!("{}; fallback: {}", primary_err, fallback_err))
        })
    }

    fn encode_primary<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self.config.format_type {
            FormatType::MessagePack => self.msgpack.encode(value),
            FormatType::Protobuf => self.protobuf.encode(value),
        }
    }

    fn decode_primary<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
        schema: Option<&Schema>,
    ) -> Result<T, CodecError> {
        match self.config.format_type {
            FormatType::MessagePack => self.msgpack.decode(bytes),
            FormatType::Protobuf => self.protobuf.decode_with(bytes, schema),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}
