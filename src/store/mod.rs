//! Store Module
//!
//! The narrow boundary between the client and a key-value store.
//!
//! ## Responsibilities
//! - Single-key write and read of raw bytes
//! - Pipelines: many commands in one transmission, one reply per command
//!   in submission order
//!
//! A store never sees decoded values. Pipelines are not transactions: each
//! command takes effect on its own.

mod batch;
mod memory;

pub use batch::{Batch, BatchCommand};
pub use memory::MemoryStore;

use std::time::Duration;

use crate::error::CodecError;

/// Write condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// Only write when the key does not exist (NX)
    IfAbsent,

    /// Only write when the key already exists (XX)
    IfPresent,
}

/// Options forwarded untouched to the store on write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Time to live
    pub expire: Option<Duration>,

    pub condition: Option<SetCondition>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expire(mut self, ttl: Duration) -> Self {
        self.expire = Some(ttl);
        self
    }

    pub fn if_absent(mut self) -> Self {
        self.condition = Some(SetCondition::IfAbsent);
        self
    }

    pub fn if_present(mut self) -> Self {
        self.condition = Some(SetCondition::IfPresent);
        self
    }
}

/// Store acknowledgment of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Value stored
    Ok,

    /// A write condition was not met; nothing stored
    Skipped,
}

/// One reply of a pipeline, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawReply {
    /// Reply to a write
    Ack(Ack),

    /// Reply to a read (`None` when the key is absent)
    Bytes(Option<Vec<u8>>),
}

/// A key-value store reachable through single-key calls and pipelines
///
/// All calls block until the store answers. Thread-safety of the underlying
/// handle is the implementation's business; `&mut self` keeps one caller in
/// flight per handle.
pub trait KvStore {
    /// Error raised by the store. Codec failures are converted into it so
    /// client calls have a single error type.
    type Error: std::error::Error + From<CodecError>;

    /// Store `value` under `key`
    fn write(&mut self, key: &[u8], value: &[u8], options: &SetOptions) -> Result<Ack, Self::Error>;

    /// Fetch the bytes stored under `key`
    fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Submit a pipeline and collect one reply per command, in order
    fn execute(&mut self, batch: Batch) -> Result<Vec<RawReply>, Self::Error>;
}
