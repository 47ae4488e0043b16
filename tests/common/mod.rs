//! Shared test helpers
//!
//! A minimal Redis-compatible store that understands PING, GET and SET (with
//! PX, NX and XX). Connection setup commands (CLIENT, SELECT, AUTH) are
//! acknowledged and ignored. Keys starting with `forbidden` are refused with
//! an error reply.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use binkv::ClientConfig;
use parking_lot::Mutex;

type Data = Arc<Mutex<HashMap<Vec<u8>, (Vec<u8>, Option<Instant>)>>>;

/// Start a server on an ephemeral port and return its address
///
/// The accept loop runs until the test process exits.
pub fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let data: Data = Arc::new(Mutex::new(HashMap::new()));

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let data = Arc::clone(&data);
            thread::spawn(move || serve(stream, data));
        }
    });

    addr
}

/// Client config pointing at `addr` with short timeouts
pub fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig::builder()
        .server_addr(addr.to_string())
        .connect_timeout_ms(1000)
        .read_timeout_ms(2000)
        .write_timeout_ms(2000)
        .build()
}

// =============================================================================
// Replies
// =============================================================================

fn ok() -> Vec<u8> {
    b"+OK\r\n".to_vec()
}

fn simple(text: &str) -> Vec<u8> {
    format!("+{}\r\n", text).into_bytes()
}

fn error(message: &str) -> Vec<u8> {
    format!("-{}\r\n", message).into_bytes()
}

fn bulk(bytes: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", bytes.len()).into_bytes();
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\r\n");
    out
}

fn nil() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

// =============================================================================
// Server
// =============================================================================

fn serve(stream: TcpStream, data: Data) {
    let mut reader = stream.try_clone().unwrap();
    let mut writer = BufWriter::new(stream);
    // One parser per connection; it buffers bytes between requests
    let mut parser = redis::Parser::new();

    while let Ok(request) = parser.parse_value(&mut reader) {
        let reply = match redis::from_redis_value::<Vec<Vec<u8>>>(&request) {
            Ok(args) => dispatch(&args, &data),
            Err(_) => error("ERR expected array of bulk strings"),
        };

        if writer.write_all(&reply).is_err() || writer.flush().is_err() {
            break;
        }
    }
}

fn dispatch(args: &[Vec<u8>], data: &Data) -> Vec<u8> {
    let Some(name) = args.first() else {
        return error("ERR empty command");
    };
    let now = Instant::now();

    match name.to_ascii_uppercase().as_slice() {
        b"PING" => simple("PONG"),
        b"CLIENT" | b"SELECT" | b"AUTH" => ok(),
        b"GET" if args.len() == 2 => {
            let mut data = data.lock();
            let expired = matches!(data.get(&args[1]), Some((_, Some(deadline))) if *deadline <= now);
            if expired {
                data.remove(&args[1]);
            }
            match data.get(&args[1]) {
                Some((value, _)) => bulk(value),
                None => nil(),
            }
        }
        b"SET" if args.len() >= 3 => {
            let key = &args[1];
            if key.starts_with(b"forbidden") {
                return error("ERR forbidden key");
            }

            let mut expires_at = None;
            let mut nx = false;
            let mut xx = false;
            let mut rest = args[3..].iter();
            while let Some(opt) = rest.next() {
                match opt.to_ascii_uppercase().as_slice() {
                    b"PX" => {
                        let Some(ms) = rest
                            .next()
                            .and_then(|v| std::str::from_utf8(v).ok())
                            .and_then(|v| v.parse::<u64>().ok())
                        else {
                            return error("ERR syntax error");
                        };
                        expires_at = Some(now + Duration::from_millis(ms));
                    }
                    b"NX" => nx = true,
                    b"XX" => xx = true,
                    _ => return error("ERR syntax error"),
                }
            }

            let mut data = data.lock();
            let exists = matches!(data.get(key), Some((_, deadline)) if deadline.map_or(true, |d| d > now));
            if (nx && exists) || (xx && !exists) {
                return nil();
            }
            data.insert(key.clone(), (args[2].clone(), expires_at));
            ok()
        }
        _ => error(&format!(
            "ERR unknown command '{}'",
            String::from_utf8_lossy(name)
        )),
    }
}
