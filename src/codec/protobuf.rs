//! Protobuf format
//!
//! Values are encoded against a [`Schema`]: a message name plus numbered,
//! typed fields. The value is first lowered to a JSON object, then each field
//! present in the object is written in schema order with `prost::encoding`.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────────┬──────────────────────────────┐
//! │ key (varint)         │ payload                      │
//! │ number << 3 | wire   │                              │
//! └──────────────────────┴──────────────────────────────┘
//! ```
//!
//! ### Wire Types
//! - 0: varint      - bool, int64, uint64, sint64 (zig-zag)
//! - 1: fixed64     - double (little-endian)
//! - 2: length-delim - string, bytes, packed repeated scalars
//!
//! Unknown fields of any wire type are skipped on decode.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use prost::encoding::{self, DecodeContext, WireType};
use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::Format;
use crate::error::{BinKvError, CodecError};

/// Largest field number protobuf allows (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = encoding::MAX_TAG;

// =============================================================================
// Schema
// =============================================================================

/// Scalar type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int64,
    UInt64,
    SInt64,
    Double,
    String,
    Bytes,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Bool => "bool",
            FieldKind::Int64 => "int64",
            FieldKind::UInt64 => "uint64",
            FieldKind::SInt64 => "sint64",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// A numbered message field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub number: u32,
    pub name: String,
    pub kind: FieldKind,
    pub repeated: bool,
}

impl Field {
    pub fn new(number: u32, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            number,
            name: name.into(),
            kind,
            repeated: false,
        }
    }

    /// Mark the field as a list
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }
}

/// Message layout used to encode and decode one kind of value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Create a schema, rejecting out-of-range or duplicate field numbers and
    /// duplicate field names
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> crate::Result<Self> {
        let name = name.into();
        let mut numbers = HashSet::new();
        let mut names = HashSet::new();

        for field in &fields {
            if field.number == 0 || field.number > MAX_FIELD_NUMBER {
                return Err(BinKvError::Config(format!(
                    "{}: field {:?} has number {} outside 1..={}",
                    name, field.name, field.number, MAX_FIELD_NUMBER
                )));
            }
            if !numbers.insert(field.number) {
                return Err(BinKvError::Config(format!(
                    "{}: duplicate field number {}",
                    name, field.number
                )));
            }
            if !names.insert(field.name.as_str()) {
                return Err(BinKvError::Config(format!(
                    "{}: duplicate field name {:?}",
                    name, field.name
                )));
            }
        }

        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_by_number(&self, number: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// Encode a JSON object as a protobuf message
    pub fn encode_value(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let object = value.as_object().ok_or_else(|| {
            self.encode_error(format!("expected an object, got {}", describe(value)))
        })?;

        if let Some(unknown) = object.keys().find(|k| self.field_by_name(k).is_none()) {
            return Err(self.encode_error(format!("no field named {:?}", unknown)));
        }

        let mut buf = Vec::new();
        for field in &self.fields {
            match object.get(&field.name) {
                None | Some(Value::Null) => {}
                Some(Value::Array(items)) if field.repeated => {
                    for item in items {
                        self.encode_field(&mut buf, field, item)?;
                    }
                }
                Some(other) if field.repeated => {
                    return Err(self.encode_error(format!(
                        "repeated field {:?} expects a list, got {}",
                        field.name,
                        describe(other)
                    )));
                }
                Some(item) => self.encode_field(&mut buf, field, item)?,
            }
        }

        Ok(buf)
    }

    fn encode_field(&self, buf: &mut Vec<u8>, field: &Field, value: &Value) -> Result<(), CodecError> {
        let mismatch = || {
            self.encode_error(format!(
                "field {:?} expects {}, got {}",
                field.name,
                field.kind,
                describe(value)
            ))
        };
        let tag = field.number;

        match field.kind {
            FieldKind::Bool => encoding::bool::encode(tag, &value.as_bool().ok_or_else(mismatch)?, buf),
            FieldKind::Int64 => encoding::int64::encode(tag, &value.as_i64().ok_or_else(mismatch)?, buf),
            FieldKind::UInt64 => encoding::uint64::encode(tag, &value.as_u64().ok_or_else(mismatch)?, buf),
            FieldKind::SInt64 => encoding::sint64::encode(tag, &value.as_i64().ok_or_else(mismatch)?, buf),
            FieldKind::Double => {
                let number = value.as_f64().ok_or_else(mismatch)?;
                if !number.is_finite() {
                    return Err(self.encode_error(format!("field {:?} is not finite", field.name)));
                }
                encoding::double::encode(tag, &number, buf)
            }
            FieldKind::String => {
                let text = value.as_str().ok_or_else(mismatch)?.to_string();
                encoding::string::encode(tag, &text, buf)
            }
            FieldKind::Bytes => encoding::bytes::encode(tag, &bytes_of(value).ok_or_else(mismatch)?, buf),
        }

        Ok(())
    }

    /// Decode a protobuf message into a JSON object
    ///
    /// Repeated fields accept packed and unpacked records and decode as empty
    /// lists when they never appear. For singular fields the last occurrence wins.
    pub fn decode_value(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let fail = |e: prost::DecodeError| self.decode_error(e);
        let mut object = Map::new();
        let mut buf = bytes;

        while !buf.is_empty() {
            let (tag, wire_type) = encoding::decode_key(&mut buf).map_err(fail)?;

            let Some(field) = self.field_by_number(tag) else {
                encoding::skip_field(wire_type, tag, &mut buf, DecodeContext::default()).map_err(fail)?;
                continue;
            };

            if field.repeated {
                let items = merge_repeated(field.kind, wire_type, &mut buf).map_err(fail)?;
                let slot = object
                    .entry(field.name.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(existing) = slot {
                    for item in items {
                        existing.push(self.scalar(field, item)?);
                    }
                }
            } else {
                let item = merge_one(field.kind, wire_type, &mut buf).map_err(fail)?;
                object.insert(field.name.clone(), self.scalar(field, item)?);
            }
        }

        for field in self.fields.iter().filter(|f| f.repeated) {
            object
                .entry(field.name.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
        }

        Ok(Value::Object(object))
    }

    fn scalar(&self, field: &Field, item: Scalar) -> Result<Value, CodecError> {
        let value = match item {
            Scalar::Bool(v) => Value::Bool(v),
            Scalar::Int(v) => Value::from(v),
            Scalar::UInt(v) => Value::from(v),
            Scalar::Double(v) => Number::from_f64(v).map(Value::Number).ok_or_else(|| {
                self.decode_error(format!("field {:?} holds non-finite double {}", field.name, v))
            })?,
            Scalar::String(v) => Value::String(v),
            Scalar::Bytes(v) => Value::Array(v.into_iter().map(Value::from).collect()),
        };
        Ok(value)
    }

    fn encode_error(&self, message: impl fmt::Display) -> CodecError {
        CodecError::Encode(format!("protobuf ({}): {}", self.name, message))
    }

    fn decode_error(&self, message: impl fmt::Display) -> CodecError {
        CodecError::Decode(format!("protobuf ({}): {}", self.name, message))
    }
}

// =============================================================================
// Format
// =============================================================================

/// Protobuf against an optional default schema
#[derive(Debug, Clone, Default)]
pub struct Protobuf {
    schema: Option<Arc<Schema>>,
}

impl Protobuf {
    /// Protobuf without a default schema; every call must bring its own
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema: Some(Arc::new(schema)),
        }
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    /// Decode against `schema`, or the default schema when `None`
    pub fn decode_with<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
        schema: Option<&Schema>,
    ) -> Result<T, CodecError> {
        let schema = schema
            .or_else(|| self.schema())
            .ok_or_else(|| CodecError::Decode("protobuf: no schema to decode against".to_string()))?;

        let value = schema.decode_value(bytes)?;
        serde_json::from_value(value).map_err(|e| schema.decode_error(e))
    }
}

impl Format for Protobuf {
    fn name(&self) -> &'static str {
        "protobuf"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let schema = self
            .schema()
            .ok_or_else(|| CodecError::Encode("protobuf: no schema to encode against".to_string()))?;

        let value = lower(value).map_err(|e| schema.encode_error(e))?;
        schema.encode_value(&value)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        self.decode_with(bytes, None)
    }
}

// =============================================================================
// Lowering
// =============================================================================

/// Lower a value to a JSON tree through its MessagePack form
///
/// `serde_json::to_value` turns NaN and infinities into `null`, which the
/// encoder would then skip. Going through MessagePack keeps the raw float so
/// it can be rejected here.
fn lower<T: Serialize + ?Sized>(value: &T) -> Result<Value, String> {
    let packed = rmp_serde::to_vec_named(value).map_err(|e| e.to_string())?;
    rmp_serde::from_slice::<FiniteValue>(&packed)
        .map(|lowered| lowered.0)
        .map_err(|e| e.to_string())
}

/// JSON value that refuses non-finite floats
struct FiniteValue(Value);

impl<'de> Deserialize<'de> for FiniteValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FiniteVisitor).map(FiniteValue)
    }
}

struct FiniteVisitor;

impl<'de> Visitor<'de> for FiniteVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a value with finite numbers")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| E::custom(format!("non-finite float {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Array(v.iter().map(|b| Value::from(*b)).collect()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(FiniteValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Map::new();
        while let Some((key, FiniteValue(item))) = map.next_entry::<String, FiniteValue>()? {
            object.insert(key, item);
        }
        Ok(Value::Object(object))
    }
}

// =============================================================================
// Wire helpers
// =============================================================================

/// One decoded field payload before it becomes JSON
enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

fn merge_one(kind: FieldKind, wire_type: WireType, buf: &mut &[u8]) -> Result<Scalar, prost::DecodeError> {
    let ctx = DecodeContext::default();
    let item = match kind {
        FieldKind::Bool => {
            let mut v = false;
            encoding::bool::merge(wire_type, &mut v, buf, ctx)?;
            Scalar::Bool(v)
        }
        FieldKind::Int64 => {
            let mut v = 0i64;
            encoding::int64::merge(wire_type, &mut v, buf, ctx)?;
            Scalar::Int(v)
        }
        FieldKind::UInt64 => {
            let mut v = 0u64;
            encoding::uint64::merge(wire_type, &mut v, buf, ctx)?;
            Scalar::UInt(v)
        }
        FieldKind::SInt64 => {
            let mut v = 0i64;
            encoding::sint64::merge(wire_type, &mut v, buf, ctx)?;
            Scalar::Int(v)
        }
        FieldKind::Double => {
            let mut v = 0f64;
            encoding::double::merge(wire_type, &mut v, buf, ctx)?;
            Scalar::Double(v)
        }
        FieldKind::String => {
            let mut v = String::new();
            encoding::string::merge(wire_type, &mut v, buf, ctx)?;
            Scalar::String(v)
        }
        FieldKind::Bytes => {
            let mut v = Vec::new();
            encoding::bytes::merge(wire_type, &mut v, buf, ctx)?;
            Scalar::Bytes(v)
        }
    };
    Ok(item)
}

/// Read one record of a repeated field, packed or not
fn merge_repeated(
    kind: FieldKind,
    wire_type: WireType,
    buf: &mut &[u8],
) -> Result<Vec<Scalar>, prost::DecodeError> {
    let ctx = DecodeContext::default();
    let items = match kind {
        FieldKind::Bool => {
            let mut v = Vec::new();
            encoding::bool::merge_repeated(wire_type, &mut v, buf, ctx)?;
            v.into_iter().map(Scalar::Bool).collect()
        }
        FieldKind::Int64 => {
            let mut v = Vec::new();
            encoding::int64::merge_repeated(wire_type, &mut v, buf, ctx)?;
            v.into_iter().map(Scalar::Int).collect()
        }
        FieldKind::UInt64 => {
            let mut v = Vec::new();
            encoding::uint64::merge_repeated(wire_type, &mut v, buf, ctx)?;
            v.into_iter().map(Scalar::UInt).collect()
        }
        FieldKind::SInt64 => {
            let mut v = Vec::new();
            encoding::sint64::merge_repeated(wire_type, &mut v, buf, ctx)?;
            v.into_iter().map(Scalar::Int).collect()
        }
        FieldKind::Double => {
            let mut v = Vec::new();
            encoding::double::merge_repeated(wire_type, &mut v, buf, ctx)?;
            v.into_iter().map(Scalar::Double).collect()
        }
        FieldKind::String => {
            let mut v = Vec::new();
            encoding::string::merge_repeated(wire_type, &mut v, buf, ctx)?;
            v.into_iter().map(Scalar::String).collect()
        }
        FieldKind::Bytes => {
            let mut v: Vec<Vec<u8>> = Vec::new();
            encoding::bytes::merge_repeated(wire_type, &mut v, buf, ctx)?;
            v.into_iter().map(Scalar::Bytes).collect()
        }
    };
    Ok(items)
}

/// Bytes fields accept a list of octets (serde's shape for `Vec<u8>`) or a string
fn bytes_of(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(s) => Some(s.as_bytes().to_vec()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
