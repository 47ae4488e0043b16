//! # binkv
//!
//! A key-value client that stores values in a binary encoding:
//! - MessagePack or Protobuf as the primary format
//! - Silent JSON fallback when the primary format fails
//! - Single-key set/get and pipelined batches
//! - Any store behind the `KvStore` trait (in-memory or a Redis server)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BinaryClient                            │
//! │            set / get / pipeline_binary_ops                   │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!                ▼                              ▼
//!        ┌───────────────┐              ┌───────────────┐
//!        │     Codec     │              │    KvStore    │
//!        │ msgpack|proto │              │ write / read  │
//!        │  + JSON       │              │ execute(batch)│
//!        └───────────────┘              └───────┬───────┘
//!                                               │
//!                                  ┌────────────┴────────────┐
//!                                  ▼                         ▼
//!                          ┌─────────────┐           ┌─────────────┐
//!                          │ MemoryStore │           │ Connection  │
//!                          │ (in-proc)   │           │ (redis)     │
//!                          └─────────────┘           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod store;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BinKvError, CodecError, Result};
pub use config::{ClientConfig, CodecConfig};
pub use codec::{Codec, Encoded, FormatType};
pub use store::{Ack, Batch, KvStore, MemoryStore, RawReply, SetOptions};
pub use client::{BatchReply, BinaryClient, Operation};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of binkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
