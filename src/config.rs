//! Configuration for binkv
//!
//! Centralized configuration with sensible defaults.

use std::collections::HashMap;

use crate::codec::FormatType;
use crate::error::{BinKvError, Result};

/// Property key selecting the primary format
pub const FORMAT_PROPERTY: &str = "serialization.format";

/// Property key toggling the JSON fallback
pub const FALLBACK_PROPERTY: &str = "fallback.json.enabled";

/// Codec configuration
///
/// Immutable once handed to a `Codec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Primary binary format
    pub format_type: FormatType,

    /// Re-encode / re-parse as JSON when the primary format fails
    pub fallback_enabled: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            format_type: FormatType::MessagePack,
            fallback_enabled: true,
        }
    }
}

impl CodecConfig {
    /// Create a new config builder
    pub fn builder() -> CodecConfigBuilder {
        CodecConfigBuilder::default()
    }

    /// Build a config from producer-style properties
    ///
    /// Recognized keys are [`FORMAT_PROPERTY`] and [`FALLBACK_PROPERTY`];
    /// anything else is ignored and missing keys keep their defaults.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(format) = props.get(FORMAT_PROPERTY) {
            config.format_type = format.parse()?;
        }

        if let Some(flag) = props.get(FALLBACK_PROPERTY) {
            config.fallback_enabled = match flag.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(BinKvError::Config(format!(
                        "{} must be true or false, got {:?}",
                        FALLBACK_PROPERTY, other
                    )))
                }
            };
        }

        Ok(config)
    }
}

/// Builder for CodecConfig
#[derive(Default)]
pub struct CodecConfigBuilder {
    config: CodecConfig,
}

impl CodecConfigBuilder {
    /// Set the primary format
    pub fn format_type(mut self, format_type: FormatType) -> Self {
        self.config.format_type = format_type;
        self
    }

    /// Enable or disable the JSON fallback
    pub fn fallback_enabled(mut self, enabled: bool) -> Self {
        self.config.fallback_enabled = enabled;
        self
    }

    pub fn build(self) -> CodecConfig {
        self.config
    }
}

/// Configuration for a client talking to a remote store
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Store address: `host:port` or a full `redis://` / `rediss://` URL
    pub server_addr: String,

    /// Connect timeout (milliseconds, 0 = none)
    pub connect_timeout_ms: u64,

    /// Socket read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    pub codec: CodecConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:6379".to_string(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            codec: CodecConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Connection URL for the store
    pub fn connection_url(&self) -> String {
        if self.server_addr.contains("://") {
            self.server_addr.clone()
        } else {
            format!("redis://{}/", self.server_addr)
        }
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the store address
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the codec configuration
    pub fn codec(mut self, codec: CodecConfig) -> Self {
        self.config.codec = codec;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
