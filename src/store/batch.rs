//! Pipeline batch
//!
//! Commands queued for a single `KvStore::execute` round trip.

use super::SetOptions;

/// A queued store command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchCommand {
    Write {
        key: Vec<u8>,
        value: Vec<u8>,
        options: SetOptions,
    },
    Read {
        key: Vec<u8>,
    },
}

/// Ordered list of commands submitted together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<BatchCommand>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    /// Queue a write with default options
    pub fn write(&mut self, key: impl Into<Vec<u8>>, value: Vec<u8>) -> &mut Self {
        self.write_with_options(key, value, SetOptions::default())
    }

    pub fn write_with_options(
        &mut self,
        key: impl Into<Vec<u8>>,
        value: Vec<u8>,
        options: SetOptions,
    ) -> &mut Self {
        self.commands.push(BatchCommand::Write {
            key: key.into(),
            value,
            options,
        });
        self
    }

    /// Queue a read
    pub fn read(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.commands.push(BatchCommand::Read { key: key.into() });
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[BatchCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<BatchCommand> {
        self.commands
    }
}
