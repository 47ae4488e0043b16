//! In-process store
//!
//! HashMap behind a `parking_lot::Mutex`, shared between clones.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::{Ack, Batch, BatchCommand, KvStore, RawReply, SetCondition, SetOptions};
use crate::error::{BinKvError, Result};

/// A stored value with its optional deadline
#[derive(Debug, Clone)]
struct Slot {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory key-value store
///
/// Clones share the same data, so a test can keep one handle to inspect raw
/// bytes while a client owns another. Expired keys are dropped lazily when
/// touched.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<Vec<u8>, Slot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes stored under `key`
    pub fn raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut data = self.data.lock();
        Self::live_slot(&mut data, key, Instant::now()).map(|slot| slot.value.clone())
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data.lock().values().filter(|slot| !slot.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.data.lock().clear();
    }

    fn live_slot<'a>(
        data: &'a mut HashMap<Vec<u8>, Slot>,
        key: &[u8],
        now: Instant,
    ) -> Option<&'a Slot> {
        if data.get(key).is_some_and(|slot| slot.is_expired(now)) {
            data.remove(key);
            return None;
        }
        data.get(key)
    }

    fn apply_write(
        data: &mut HashMap<Vec<u8>, Slot>,
        key: &[u8],
        value: &[u8],
        options: &SetOptions,
    ) -> Ack {
        let now = Instant::now();
        let exists = Self::live_slot(data, key, now).is_some();

        let allowed = match options.condition {
            None => true,
            Some(SetCondition::IfAbsent) => !exists,
            Some(SetCondition::IfPresent) => exists,
        };
        if !allowed {
            return Ack::Skipped;
        }

        data.insert(
            key.to_vec(),
            Slot {
                value: value.to_vec(),
                expires_at: options.expire.map(|ttl| now + ttl),
            },
        );
        Ack::Ok
    }
}

impl KvStore for MemoryStore {
    type Error = BinKvError;

    fn write(&mut self, key: &[u8], value: &[u8], options: &SetOptions) -> Result<Ack> {
        tracing::trace!(key_len = key.len(), value_len = value.len(), "memory write");
        let mut data = self.data.lock();
        Ok(Self::apply_write(&mut data, key, value, options))
    }

    fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        tracing::trace!(key_len = key.len(), "memory read");
        Ok(self.raw(key))
    }

    fn execute(&mut self, batch: Batch) -> Result<Vec<RawReply>> {
        tracing::trace!(commands = batch.len(), "memory pipeline");
        let mut data = self.data.lock();
        let now = Instant::now();

        let replies = batch
            .into_commands()
            .into_iter()
            .map(|command| match command {
                BatchCommand::Write { key, value, options } => {
                    RawReply::Ack(Self::apply_write(&mut data, &key, &value, &options))
                }
                BatchCommand::Read { key } => RawReply::Bytes(
                    Self::live_slot(&mut data, &key, now).map(|slot| slot.value.clone()),
                ),
            })
            .collect();

        Ok(replies)
    }
}
