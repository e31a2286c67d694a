//! Client for a torrent daemon's local IPC socket.
//!
//! `trx` speaks the daemon's bencoded, hex length-prefixed protocol over a
//! Unix stream socket: it negotiates the protocol version, tags every
//! command, matches replies back to their request by tag and reconnects
//! once when the socket drops.
//!
//! # Quick start
//!
//! ```no_run
//! let mut client = trx::Client::new("/tmp/transmission-daemon");
//!
//! client.start_all().expect("daemon unreachable");
//! for status in client.status_all().expect("daemon unreachable") {
//!     println!("{status:?}");
//! }
//! ```
//!
//! Everything is blocking and a [`Client`] carries one request at a time.
//! Use one client per thread, or share one through [`SharedClient`].

#![cfg(unix)]

mod client;
mod commands;
mod error;
mod session;
#[cfg(test)]
mod testing;
mod transport;

pub use client::{Client, ClientBuilder, SharedClient};
pub use commands::{AddTorrent, INFO_TYPES, STATUS_TYPES};
pub use error::{Error, Result};
pub use session::{Session, SessionState};
pub use transport::{Connector, Transport, UnixConnector, UnixTransport};
pub use trx_proto::{self as proto, Value};
