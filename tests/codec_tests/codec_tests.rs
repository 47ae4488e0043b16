//! Codec Tests
//!
//! Tests for primary encoding, the JSON fallback and configuration.

use std::collections::{BTreeMap, HashMap};

use binkv::codec::{Codec, Encoded, Format, FormatType, Json, MessagePack, Protobuf};
use binkv::config::{CodecConfig, FALLBACK_PROPERTY, FORMAT_PROPERTY};
use binkv::{BinKvError, CodecError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Helper Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    tags: Vec<String>,
    score: f64,
    active: bool,
    manager: Option<String>,
}

fn sample_user() -> User {
    User {
        id: 42,
        name: "ada".to_string(),
        tags: vec!["admin".to_string(), "ops".to_string()],
        score: 9.5,
        active: true,
        manager: None,
    }
}

/// Only has a textual representation
#[derive(Debug, Clone, PartialEq)]
struct Timestamp(String);

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.0)
        } else {
            Err(serde::ser::Error::custom("timestamp has no binary representation"))
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Event {
    id: u32,
    at: Timestamp,
}

fn sample_event() -> Event {
    Event {
        id: 7,
        at: Timestamp("2024-01-01T00:00:00Z".to_string()),
    }
}

/// Numeric value written only in text formats
#[derive(Debug, Clone, Copy, PartialEq)]
struct Celsius(u16);

impl Serialize for Celsius {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_u16(self.0)
        } else {
            Err(serde::ser::Error::custom("celsius has no binary representation"))
        }
    }
}

impl<'de> Deserialize<'de> for Celsius {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u16::deserialize(deserializer).map(Celsius)
    }
}

/// List value written only in text formats
#[derive(Debug, Clone, PartialEq)]
struct Samples(Vec<u32>);

impl Serialize for Samples {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            self.0.serialize(serializer)
        } else {
            Err(serde::ser::Error::custom("samples have no binary representation"))
        }
    }
}

impl<'de> Deserialize<'de> for Samples {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<u32>::deserialize(deserializer).map(Samples)
    }
}

/// Rejected by every format
struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("never serializable"))
    }
}

fn codec(format_type: FormatType, fallback_enabled: bool) -> Codec {
    Codec::new(
        CodecConfig::builder()
            .format_type(format_type)
            .fallback_enabled(fallback_enabled)
            .build(),
    )
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_msgpack_round_trip_struct() {
    let codec = Codec::default();
    let user = sample_user();

    let encoded = codec.encode_tagged(&user).unwrap();
    assert!(!encoded.is_fallback());

    let decoded: User = codec.decode(encoded.as_bytes()).unwrap();
    assert_eq!(decoded, user);
}

#[test]
fn test_msgpack_round_trip_collections() {
    let codec = Codec::default();

    let mut map: HashMap<String, Vec<i64>> = HashMap::new();
    map.insert("primes".to_string(), vec![2, 3, 5, 7]);
    map.insert("negative".to_string(), vec![-1, i64::MIN]);
    let bytes = codec.encode(&map).unwrap();
    assert_eq!(codec.decode::<HashMap<String, Vec<i64>>>(&bytes).unwrap(), map);

    let nested: BTreeMap<String, Option<(u8, String)>> = [
        ("a".to_string(), Some((1, "one".to_string()))),
        ("b".to_string(), None),
    ]
    .into_iter()
    .collect();
    let bytes = codec.encode(&nested).unwrap();
    assert_eq!(
        codec.decode::<BTreeMap<String, Option<(u8, String)>>>(&bytes).unwrap(),
        nested
    );
}

#[test]
fn test_msgpack_round_trip_scalars() {
    let codec = Codec::default();

    assert_eq!(codec.decode::<u64>(&codec.encode(&u64::MAX).unwrap()).unwrap(), u64::MAX);
    assert_eq!(codec.decode::<f64>(&codec.encode(&-0.25f64).unwrap()).unwrap(), -0.25);
    assert_eq!(codec.decode::<bool>(&codec.encode(&false).unwrap()).unwrap(), false);
    assert_eq!(
        codec.decode::<String>(&codec.encode("héllo").unwrap()).unwrap(),
        "héllo"
    );
}

#[test]
fn test_msgpack_named_structs_are_maps() {
    let bytes = Codec::default().encode(&sample_user()).unwrap();
    // fixmap with six entries
    assert_eq!(bytes[0], 0x86);
}

#[test]
fn test_msgpack_compact_structs_are_arrays() {
    let codec = Codec::with_formats(
        CodecConfig::default(),
        MessagePack::compact(),
        Protobuf::new(),
        Json,
    );
    let bytes = codec.encode(&sample_user()).unwrap();
    // fixarray with six entries
    assert_eq!(bytes[0], 0x96);

    // Positional structs still decode
    let decoded: User = codec.decode(&bytes).unwrap();
    assert_eq!(decoded, sample_user());
}

#[test]
fn test_msgpack_bin_decodes_as_text() {
    let bytes = [0xc4, 0x05, b'h', b'e', b'l', b'l', b'o'];
    let decoded: String = codec(FormatType::MessagePack, false).decode(&bytes).unwrap();
    assert_eq!(decoded, "hello");
}

// =============================================================================
// Fallback Tests
// =============================================================================

#[test]
fn test_fallback_encodes_as_json() {
    let codec = codec(FormatType::MessagePack, true);
    let event = sample_event();

    let encoded = codec.encode_tagged(&event).unwrap();
    assert!(encoded.is_fallback());
    assert_eq!(encoded.as_bytes(), serde_json::to_vec(&event).unwrap().as_slice());

    // Untagged encode returns the same bytes
    assert_eq!(codec.encode(&event).unwrap(), encoded.into_bytes());
}

#[test]
fn test_fallback_round_trip() {
    let codec = codec(FormatType::MessagePack, true);
    let event = sample_event();

    let bytes = codec.encode(&event).unwrap();
    let decoded: Event = codec.decode(&bytes).unwrap();
    assert_eq!(decoded, event);
}

#[test]
fn test_fallback_disabled_encode_error() {
    let codec = codec(FormatType::MessagePack, false);
    let result = codec.encode(&sample_event());
    assert!(matches!(result, Err(CodecError::Encode(_))));
}

#[test]
fn test_fallback_also_failing_is_encode_error() {
    let codec = codec(FormatType::MessagePack, true);
    match codec.encode(&Unserializable) {
        Err(CodecError::Encode(message)) => {
            assert!(message.contains("messagepack"));
            assert!(message.contains("fallback"));
        }
        other => panic!("Expected encode error, got {:?}", other),
    }
}

#[test]
fn test_fallback_decodes_json_text() {
    let json = br#"{"a":1,"b":2}"#;

    let decoded: HashMap<String, i32> = codec(FormatType::MessagePack, true).decode(json).unwrap();
    assert_eq!(decoded.get("a"), Some(&1));
    assert_eq!(decoded.get("b"), Some(&2));

    let result: Result<HashMap<String, i32>, _> = codec(FormatType::MessagePack, false).decode(json);
    assert!(matches!(result, Err(CodecError::Decode(_))));
}

#[test]
fn test_fallback_disabled_decode_error() {
    // 0xc1 is never used by MessagePack
    let result: Result<u32, _> = codec(FormatType::MessagePack, false).decode(&[0xc1]);
    assert!(matches!(result, Err(CodecError::Decode(_))));
}

#[test]
fn test_fallback_non_utf8_is_decode_error() {
    let result: Result<u32, _> = codec(FormatType::MessagePack, true).decode(&[0xc1, 0xff]);
    match result {
        Err(CodecError::Decode(message)) => assert!(message.contains("UTF-8")),
        other => panic!("Expected decode error, got {:?}", other),
    }
}

#[test]
fn test_primary_decoder_accepts_foreign_bytes() {
    // JSON "7" is also the MessagePack positive fixint 0x37
    let json = serde_json::to_vec(&7u8).unwrap();
    let decoded: u8 = codec(FormatType::MessagePack, true).decode(&json).unwrap();
    assert_eq!(decoded, 0x37);
}

#[test]
fn test_fallback_round_trip_number() {
    let codec = codec(FormatType::MessagePack, true);

    let encoded = codec.encode_tagged(&Celsius(42)).unwrap();
    assert!(encoded.is_fallback());
    assert_eq!(encoded.as_bytes(), b"42");

    // 0x34 alone would be MessagePack 52; the second byte makes it JSON
    let decoded: Celsius = codec.decode(encoded.as_bytes()).unwrap();
    assert_eq!(decoded, Celsius(42));
}

#[test]
fn test_fallback_round_trip_array() {
    let codec = codec(FormatType::MessagePack, true);
    let samples = Samples(vec![3, 10, 250]);

    let encoded = codec.encode_tagged(&samples).unwrap();
    assert!(encoded.is_fallback());
    assert_eq!(encoded.as_bytes(), b"[3,10,250]");

    let decoded: Samples = codec.decode(encoded.as_bytes()).unwrap();
    assert_eq!(decoded, samples);
}

#[test]
fn test_fallback_json_into_dynamic_value() {
    let codec = codec(FormatType::MessagePack, true);

    let number: serde_json::Value = codec.decode(b"42").unwrap();
    assert_eq!(number, serde_json::json!(42));

    let array: serde_json::Value = codec.decode(b"[1,2]").unwrap();
    assert_eq!(array, serde_json::json!([1, 2]));
}

#[test]
fn test_msgpack_rejects_trailing_bytes() {
    let codec = codec(FormatType::MessagePack, false);

    let result: Result<u8, _> = codec.decode(&[0x07, 0xff, 0xff]);
    match result {
        Err(CodecError::Decode(message)) => assert!(message.contains("2 trailing bytes")),
        other => panic!("Expected decode error, got {:?}", other),
    }

    let exact: u8 = codec.decode(&[0x07]).unwrap();
    assert_eq!(exact, 7);
}

#[test]
fn test_protobuf_without_schema_falls_back() {
    let codec = codec(FormatType::Protobuf, true);
    let user = sample_user();

    let encoded = codec.encode_tagged(&user).unwrap();
    assert!(matches!(encoded, Encoded::Fallback(_)));

    let decoded: User = codec.decode(encoded.as_bytes()).unwrap();
    assert_eq!(decoded, user);
}

#[test]
fn test_protobuf_without_schema_errors_when_fallback_disabled() {
    let codec = codec(FormatType::Protobuf, false);

    match codec.encode(&sample_user()) {
        Err(CodecError::Encode(message)) => assert!(message.contains("no schema")),
        other => panic!("Expected encode error, got {:?}", other),
    }

    let result: Result<User, _> = codec.decode(&[0x08, 0x01]);
    assert!(matches!(result, Err(CodecError::Decode(_))));
}

// =============================================================================
// Format Tests
// =============================================================================

#[test]
fn test_json_format_direct() {
    let bytes = Json.encode(&sample_user()).unwrap();
    assert!(bytes.starts_with(b"{\"id\":42"));
    assert_eq!(Json.decode::<User>(&bytes).unwrap(), sample_user());
    assert_eq!(Json.name(), "json");
}

#[test]
fn test_msgpack_format_direct() {
    let bytes = MessagePack::named().encode(&sample_user()).unwrap();
    assert_eq!(MessagePack::named().decode::<User>(&bytes).unwrap(), sample_user());
    assert!(MessagePack::named().decode::<User>(b"").is_err());
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_format_type_parse_and_display() {
    assert_eq!("messagepack".parse::<FormatType>().unwrap(), FormatType::MessagePack);
    assert_eq!("MessagePack".parse::<FormatType>().unwrap(), FormatType::MessagePack);
    assert_eq!(" protobuf ".parse::<FormatType>().unwrap(), FormatType::Protobuf);
    assert!(matches!("avro".parse::<FormatType>(), Err(BinKvError::Config(_))));

    assert_eq!(FormatType::MessagePack.to_string(), "messagepack");
    assert_eq!(FormatType::Protobuf.to_string(), "protobuf");
}

#[test]
fn test_codec_config_defaults() {
    let config = CodecConfig::default();
    assert_eq!(config.format_type, FormatType::MessagePack);
    assert!(config.fallback_enabled);

    let codec = Codec::new(config);
    assert_eq!(codec.format_type(), FormatType::MessagePack);
    assert!(codec.fallback_enabled());
}

#[test]
fn test_codec_config_from_properties() {
    let mut props = HashMap::new();
    props.insert(FORMAT_PROPERTY.to_string(), "protobuf".to_string());
    props.insert(FALLBACK_PROPERTY.to_string(), "false".to_string());
    props.insert("unrelated.key".to_string(), "ignored".to_string());

    let config = CodecConfig::from_properties(&props).unwrap();
    assert_eq!(config.format_type, FormatType::Protobuf);
    assert!(!config.fallback_enabled);

    let empty = CodecConfig::from_properties(&HashMap::new()).unwrap();
    assert_eq!(empty, CodecConfig::default());
}

#[test]
fn test_codec_config_from_properties_rejects_bad_values() {
    let mut props = HashMap::new();
    props.insert(FALLBACK_PROPERTY.to_string(), "sometimes".to_string());
    assert!(matches!(
        CodecConfig::from_properties(&props),
        Err(BinKvError::Config(_))
    ));

    let mut props = HashMap::new();
    props.insert(FORMAT_PROPERTY.to_string(), "xml".to_string());
    assert!(matches!(
        CodecConfig::from_properties(&props),
        Err(BinKvError::Config(_))
    ));
}
