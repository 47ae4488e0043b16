//! Client Module
//!
//! Runs every value through the `Codec` on its way into and out of a store.
//!
//! ## Data Flow
//! ```text
//! set(key, value) ──▶ Codec::encode ──▶ KvStore::write(key, bytes)
//! get(key)        ◀── Codec::decode ◀── KvStore::read(key)
//!
//! pipeline_binary_ops([(kind, key, value?), ...])
//!     "set" ──▶ encode ──▶ Batch::write ─┐
//!     "get" ─────────────▶ Batch::read  ─┼─▶ KvStore::execute ──▶ decode replies
//!     other ──▶ skipped                  ┘
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Codec, Schema};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::network::Connection;
use crate::store::{Ack, Batch, KvStore, RawReply, SetOptions};

/// Operation kind that writes a value
pub const SET: &str = "set";

/// Operation kind that reads a value
pub const GET: &str = "get";

/// One entry of a pipeline request
///
/// `kind` is matched against [`SET`] and [`GET`]; entries of any other kind
/// are dropped without producing a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation<V> {
    pub kind: String,
    pub key: Vec<u8>,
    pub value: Option<V>,
}

impl<V> Operation<V> {
    pub fn new(kind: impl Into<String>, key: impl Into<Vec<u8>>, value: Option<V>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
            value,
        }
    }

    pub fn set(key: impl Into<Vec<u8>>, value: V) -> Self {
        Self::new(SET, key, Some(value))
    }

    pub fn get(key: impl Into<Vec<u8>>) -> Self {
        Self::new(GET, key, None)
    }
}

impl<K, Key, V> From<(K, Key, Option<V>)> for Operation<V>
where
    K: Into<String>,
    Key: Into<Vec<u8>>,
{
    fn from((kind, key, value): (K, Key, Option<V>)) -> Self {
        Self::new(kind, key, value)
    }
}

/// One result of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum BatchReply<T> {
    /// Store acknowledgment of a write, untouched
    Ack(Ack),

    /// Decoded read result (`None` when the key is absent)
    Value(Option<T>),
}

impl<T> BatchReply<T> {
    pub fn ack(&self) -> Option<Ack> {
        match self {
            BatchReply::Ack(ack) => Some(*ack),
            BatchReply::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            BatchReply::Value(value) => value,
            BatchReply::Ack(_) => None,
        }
    }
}

/// Key-value client that stores encoded values
///
/// Holds no state besides the store handle and the codec. Store errors come
/// back unmodified as `S::Error`; codec errors are converted into it.
pub struct BinaryClient<S: KvStore> {
    store: S,
    codec: Codec,
}

impl BinaryClient<Connection> {
    /// Connect to a remote store described by `config`
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let connection = Connection::open(config)?;
        Ok(Self::new(connection, Codec::new(config.codec)))
    }
}

impl<S: KvStore> BinaryClient<S> {
    pub fn new(store: S, codec: Codec) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Release the store handle
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Encode `value` and store it under `key`
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> std::result::Result<Ack, S::Error> {
        self.set_with_options(key, value, &SetOptions::default())
    }

    /// Encode `value` and store it under `key`, passing `options` to the store
    pub fn set_with_options<T: Serialize + ?Sized>(
        &mut self,
        key: impl AsRef<[u8]>,
        value: &T,
        options: &SetOptions,
    ) -> std::result::Result<Ack, S::Error> {
        let bytes = self.codec.encode(value)?;
        self.store.write(key.as_ref(), &bytes, options)
    }

    /// Fetch and decode the value under `key`
    ///
    /// An absent key (or an empty payload) is `Ok(None)`.
    pub fn get<T: DeserializeOwned>(
        &mut self,
        key: impl AsRef<[u8]>,
    ) -> std::result::Result<Option<T>, S::Error> {
        self.get_with_schema(key, None)
    }

    /// Like [`get`](Self::get), decoding protobuf payloads against `schema`
    pub fn get_with_schema<T: DeserializeOwned>(
        &mut self,
        key: impl AsRef<[u8]>,
        schema: Option<&Schema>,
    ) -> std::result::Result<Option<T>, S::Error> {
        match self.store.read(key.as_ref())? {
            Some(bytes) if !bytes.is_empty() => {
                Ok(Some(self.codec.decode_with_schema(&bytes, schema)?))
            }
            _ => Ok(None),
        }
    }

    /// Run a list of set/get operations as one pipeline
    ///
    /// Results follow the order of the recognized operations. Operations with
    /// an unknown kind are skipped and leave no slot in the output. A `set`
    /// without a value stores an encoded nil.
    pub fn pipeline_binary_ops<T, V, I>(
        &mut self,
        operations: I,
    ) -> std::result::Result<Vec<BatchReply<T>>, S::Error>
    where
        T: DeserializeOwned,
        V: Serialize,
        I: IntoIterator<Item = Operation<V>>,
    {
        let operations = operations.into_iter();
        let mut batch = Batch::with_capacity(operations.size_hint().0);

        for operation in operations {
            match operation.kind.as_str() {
                SET => {
                    let bytes = self.codec.encode(&operation.value)?;
                    batch.write(operation.key, bytes);
                }
                GET => {
                    batch.read(operation.key);
                }
                other => {
                    tracing::debug!(kind = other, "skipping pipeline operation of unknown kind");
                }
            }
        }

        let replies = self.store.execute(batch)?;

        replies
            .into_iter()
            .map(|reply| -> std::result::Result<BatchReply<T>, S::Error> {
                match reply {
                    RawReply::Ack(ack) => Ok(BatchReply::Ack(ack)),
                    RawReply::Bytes(Some(bytes)) if !bytes.is_empty() => {
                        Ok(BatchReply::Value(Some(self.codec.decode(&bytes)?)))
                    }
                    RawReply::Bytes(_) => Ok(BatchReply::Value(None)),
                }
            })
            .collect()
    }
}
