//! Raw stream-socket transport to the daemon.
//!
//! A [`Connector`] knows where the daemon lives and opens a fresh
//! [`Transport`] per connection. Neither knows anything about frames.

use std::fmt;
use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result, classify};

/// A connected byte stream to the daemon.
pub trait Transport: fmt::Debug {
    /// Writes all of `bytes`.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Blocks until exactly `n` bytes have been read.
    ///
    /// A stream that closes first yields [`Error::ConnectionLost`].
    fn recv_exact(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Releases the socket. Calling it twice is harmless.
    fn close(&mut self);
}

/// Opens transports to one fixed daemon address.
pub trait Connector: fmt::Debug {
    /// The transport this connector produces.
    type Transport: Transport;

    /// Connects to the daemon.
    ///
    /// Fails with [`Error::NoDaemon`] when nothing is listening. Never
    /// waits for the daemon to appear.
    fn connect(&self) -> Result<Self::Transport>;
}

/// Connects to a daemon over a Unix domain socket.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    /// Filesystem path of the daemon's socket.
    path: PathBuf,
    /// Read timeout applied to every new stream.
    read_timeout: Option<Duration>,
    /// Write timeout applied to every new stream.
    write_timeout: Option<Duration>,
}

impl UnixConnector {
    /// Creates a connector for the socket at `path`, without timeouts.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_timeout: None,
            write_timeout: None,
        }
    }

    /// Sets the read timeout for new streams (`None` blocks forever).
    pub const fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write timeout for new streams (`None` blocks forever).
    pub const fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// The socket path this connector targets.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for UnixConnector {
    type Transport = UnixTransport;

    fn connect(&self) -> Result<UnixTransport> {
        let stream = UnixStream::connect(&self.path).map_err(|e| match e.kind() {
            // A stale socket file with no listener refuses rather than
            // disappearing; both mean the daemon is not running.
            io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => Error::NoDaemon {
                path: self.path.clone(),
                source: e,
            },
            _ => classify(e),
        })?;
        stream.set_read_timeout(self.read_timeout)?;
        stream.set_write_timeout(self.write_timeout)?;
        debug!(path = %self.path.display(), "connected to daemon");
        Ok(UnixTransport {
            stream: Some(stream),
        })
    }
}

/// A Unix socket connection. Closed when dropped.
#[derive(Debug)]
pub struct UnixTransport {
    /// The socket, `None` once closed.
    stream: Option<UnixStream>,
}

impl UnixTransport {
    /// Returns the open stream or a not-connected failure.
    fn stream(&mut self) -> Result<&mut UnixStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::ConnectionLost(io::ErrorKind::NotConnected.into()))
    }
}

impl Transport for UnixTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        stream.write_all(bytes).map_err(classify)?;
        stream.flush().map_err(classify)
    }

    fn recv_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let stream = self.stream()?;
        let mut buf = Vec::new();
        // Grow as bytes arrive instead of trusting `n` up front.
        stream
            .take(n as u64)
            .read_to_end(&mut buf)
            .map_err(classify)?;
        if buf.len() == n {
            Ok(buf)
        } else {
            Err(Error::ConnectionLost(io::ErrorKind::UnexpectedEof.into()))
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}
