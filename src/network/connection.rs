//! Connection
//!
//! A blocking connection to a Redis-compatible store.

use std::time::Duration;

use redis::{Cmd, FromRedisValue, RedisError, Value};
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::{BinKvError, Result};
use crate::store::{Ack, Batch, BatchCommand, KvStore, RawReply, SetCondition, SetOptions};

/// Build `SET key value [PX ms] [NX|XX]`
///
/// A TTL below one millisecond is sent as `PX 1` so the key is never
/// created already expired.
pub fn set_command(key: &[u8], value: &[u8], options: &SetOptions) -> Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);

    if let Some(ttl) = options.expire {
        let ms = u64::try_from(ttl.as_millis().max(1)).unwrap_or(u64::MAX);
        cmd.arg("PX").arg(ms);
    }
    match options.condition {
        Some(SetCondition::IfAbsent) => {
            cmd.arg("NX");
        }
        Some(SetCondition::IfPresent) => {
            cmd.arg("XX");
        }
        None => {}
    }

    cmd
}

/// Build `GET key`
pub fn get_command(key: &[u8]) -> Cmd {
    let mut cmd = redis::cmd("GET");
    cmd.arg(key);
    cmd
}

/// A single connection to a Redis-compatible store
pub struct Connection {
    inner: redis::Connection,

    /// Configured address, for logging
    addr: String,
}

impl Connection {
    /// Connect to `config.server_addr` and apply the configured timeouts
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let client = redis::Client::open(config.connection_url().as_str())?;

        let inner = if config.connect_timeout_ms > 0 {
            client.get_connection_with_timeout(Duration::from_millis(config.connect_timeout_ms))
        } else {
            client.get_connection()
        }
        .map_err(|e| {
            debug!("Connect to {} failed: {}", config.server_addr, e);
            e
        })?;

        inner.set_read_timeout(millis(config.read_timeout_ms))?;
        inner.set_write_timeout(millis(config.write_timeout_ms))?;

        debug!("Connected to {}", config.server_addr);
        Ok(Self {
            inner,
            addr: config.server_addr.clone(),
        })
    }

    /// Health check; returns the server's reply text
    pub fn ping(&mut self) -> Result<String> {
        Ok(redis::cmd("PING").query(&mut self.inner)?)
    }

    /// Address this connection was opened with
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

/// `None` for 0, which disables a timeout
fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// `OK` stores, nil means the NX/XX condition did not hold
fn ack(reply: Option<String>) -> Ack {
    match reply {
        Some(_) => Ack::Ok,
        None => Ack::Skipped,
    }
}

impl KvStore for Connection {
    type Error = BinKvError;

    fn write(&mut self, key: &[u8], value: &[u8], options: &SetOptions) -> Result<Ack> {
        trace!("SET on {}", self.addr);
        let reply: Option<String> = set_command(key, value, options).query(&mut self.inner)?;
        Ok(ack(reply))
    }

    fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        trace!("GET on {}", self.addr);
        Ok(get_command(key).query(&mut self.inner)?)
    }

    /// Sends every command in one pipeline and reads one reply per command
    ///
    /// The whole pipeline is read back even when a command fails, so the
    /// connection stays usable; the first error is returned afterwards.
    fn execute(&mut self, batch: Batch) -> Result<Vec<RawReply>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let commands = batch.into_commands();
        let mut pipe = redis::pipe();
        for command in &commands {
            match command {
                BatchCommand::Write { key, value, options } => {
                    pipe.add_command(set_command(key, value, options));
                }
                BatchCommand::Read { key } => {
                    pipe.add_command(get_command(key));
                }
            }
        }

        trace!("Sending pipeline of {} commands to {}", commands.len(), self.addr);
        let values: Vec<Value> = pipe.query(&mut self.inner)?;

        let mut replies = Vec::with_capacity(values.len());
        let mut first_err: Option<RedisError> = None;

        for (index, (command, value)) in commands.iter().zip(&values).enumerate() {
            let reply = match command {
                BatchCommand::Write { .. } => Option::<String>::from_redis_value(value).map(|r| RawReply::Ack(ack(r))),
                BatchCommand::Read { .. } => Option::<Vec<u8>>::from_redis_value(value).map(RawReply::Bytes),
            };

            match reply {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    warn!("Pipeline command {} failed on {}: {}", index, self.addr, e);
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(replies),
        }
    }
}
