//! Network Module
//!
//! Transport to a remote Redis-compatible store.
//!
//! ## Architecture
//! - One blocking `redis::Connection` per client
//! - `SET`/`GET` built as `redis::Cmd` values
//! - Pipelines sent with `redis::pipe()`, replies read back in order

mod connection;

pub use connection::{get_command, set_command, Connection};
