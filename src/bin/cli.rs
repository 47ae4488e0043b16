//! binkv CLI Client
//!
//! Command-line interface for storing encoded values in a Redis-compatible
//! store.

use std::time::Duration;

use binkv::{
    BatchReply, BinaryClient, BinKvError, ClientConfig, CodecConfig, FormatType, Operation,
    SetOptions,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// binkv CLI
#[derive(Parser, Debug)]
#[command(name = "binkv-cli")]
#[command(about = "Store and fetch MessagePack/Protobuf encoded values")]
#[command(version)]
struct Args {
    /// Server address (host:port or redis:// URL)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Primary value format (messagepack or protobuf)
    ///
    /// The CLI carries no protobuf schema, so with `protobuf` every value is
    /// written as JSON through the fallback (or rejected with --no-fallback).
    #[arg(short, long, default_value = "messagepack")]
    format: FormatType,

    /// Fail instead of falling back to JSON
    #[arg(long)]
    no_fallback: bool,

    /// Socket timeout in milliseconds (0 = none)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key to a JSON value (plain text is stored as a string)
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Expire the key after this many milliseconds
        #[arg(long)]
        ttl_ms: Option<u64>,

        /// Only set the key if it does not exist
        #[arg(long, conflicts_with = "xx")]
        nx: bool,

        /// Only set the key if it already exists
        #[arg(long)]
        xx: bool,
    },

    /// Run operations in one pipeline: set:KEY=VALUE, get:KEY
    Pipe {
        /// Operations, in order
        #[arg(required = true)]
        ops: Vec<String>,
    },

    /// Ping the server
    Ping,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,binkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> binkv::Result<()> {
    let config = ClientConfig::builder()
        .server_addr(&args.server)
        .connect_timeout_ms(args.timeout_ms)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .codec(
            CodecConfig::builder()
                .format_type(args.format)
                .fallback_enabled(!args.no_fallback)
                .build(),
        )
        .build();

    tracing::debug!("Connecting to {} ({})", config.server_addr, config.codec.format_type);
    let mut client = BinaryClient::connect(&config)?;

    match args.command {
        Commands::Get { key } => match client.get::<Value>(&key)? {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Commands::Set {
            key,
            value,
            ttl_ms,
            nx,
            xx,
        } => {
            let mut options = SetOptions::new();
            if let Some(ms) = ttl_ms {
                options = options.expire(Duration::from_millis(ms));
            }
            if nx {
                options = options.if_absent();
            }
            if xx {
                options = options.if_present();
            }

            match client.set_with_options(&key, &parse_value(&value), &options)? {
                binkv::Ack::Ok => println!("OK"),
                binkv::Ack::Skipped => println!("(not set)"),
            }
        }
        Commands::Pipe { ops } => {
            let operations = ops
                .iter()
                .map(|op| parse_operation(op))
                .collect::<binkv::Result<Vec<_>>>()?;

            let replies: Vec<BatchReply<Value>> = client.pipeline_binary_ops(operations)?;
            for reply in replies {
                match reply {
                    BatchReply::Ack(binkv::Ack::Ok) => println!("OK"),
                    BatchReply::Ack(binkv::Ack::Skipped) => println!("(not set)"),
                    BatchReply::Value(Some(value)) => println!("{}", value),
                    BatchReply::Value(None) => println!("(nil)"),
                }
            }
        }
        Commands::Ping => println!("{}", client.store_mut().ping()?),
    }

    Ok(())
}

/// JSON when it parses, otherwise the raw text as a string
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// `kind:KEY` or `set:KEY=VALUE`
fn parse_operation(op: &str) -> binkv::Result<Operation<Value>> {
    let (kind, rest) = op
        .split_once(':')
        .ok_or_else(|| BinKvError::Config(format!("Operation {:?} is not KIND:KEY", op)))?;

    if kind == binkv::client::SET {
        let (key, value) = rest
            .split_once('=')
            .ok_or_else(|| BinKvError::Config(format!("Operation {:?} is not set:KEY=VALUE", op)))?;
        return Ok(Operation::set(key, parse_value(value)));
    }

    Ok(Operation::new(kind, rest, None))
}
