//! Codec Module
//!
//! Turns values into bytes before they reach the store and back again after
//! they are read.
//!
//! ## Format Selection
//! ```text
//!              encode(value)
//!                    │
//!        ┌───────────▼───────────┐
//!        │ primary (format_type) │── ok ──▶ Primary(bytes)
//!        │ messagepack|protobuf  │
//!        └───────────┬───────────┘
//!                    │ err
//!          fallback_enabled?
//!            │ yes        │ no
//!   ┌────────▼────────┐   └──▶ EncodeError
//!   │  JSON (UTF-8)   │── ok ──▶ Fallback(bytes)
//!   └────────┬────────┘
//!            │ err
//!            └──▶ EncodeError
//! ```
//!
//! Decode mirrors this: the primary decoder runs first and JSON is only tried
//! when it fails. Nothing in the stored bytes records which format produced
//! them, so a fallback payload that also parses as the primary format decodes
//! as the primary format.

mod codec;
mod format;
mod json;
mod msgpack;
mod protobuf;

pub use codec::{Codec, Encoded};
pub use format::{Format, FormatType};
pub use json::Json;
pub use msgpack::MessagePack;
pub use protobuf::{Field, FieldKind, Protobuf, Schema, MAX_FIELD_NUMBER};
