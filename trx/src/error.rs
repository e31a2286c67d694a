//! Error types for trx operations.

use std::io;
use std::path::PathBuf;

use trx_proto::{CodecError, REQUIRED_MAX, Value, params_line, to_line};

/// Alias for `Result<T, trx::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the daemon client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Nothing is listening at the configured socket path.
    #[error("no daemon at {}; make sure it is up and running", path.display())]
    NoDaemon {
        /// The socket path that was tried.
        path: PathBuf,
        /// The underlying connect error.
        #[source]
        source: io::Error,
    },

    /// The daemon's advertised protocol range is too old.
    #[error(
        "daemon supports protocol up to v{max}, at least v{} is required",
        REQUIRED_MAX
    )]
    InsufficientProtocolVersion {
        /// The `version.max` the daemon advertised.
        max: i64,
    },

    /// The daemon's first frame was not a version announcement.
    #[error("illegal handshake from daemon: {0}")]
    Handshake(String),

    /// The socket was severed mid-session.
    #[error("connection to daemon lost")]
    ConnectionLost(#[source] io::Error),

    /// The daemon endpoint actively refused the connection.
    #[error("daemon refused the connection")]
    Refused(#[source] io::Error),

    /// A configured read or write timeout elapsed.
    #[error("timed out talking to daemon")]
    Timeout(#[source] io::Error),

    /// A command was sent but no decodable reply frame came back.
    #[error("no response from daemon to `{command}` with parameters {}", params_line(.params))]
    NoResponse {
        /// The command name that was sent.
        command: String,
        /// The parameters that were sent with it.
        params: Vec<Value>,
    },

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The daemon answered with a failure keyword.
    #[error("command `{command}` failed")]
    CommandFailed {
        /// The command name that failed.
        command: String,
    },

    /// The daemon answered with a reply of an unexpected shape.
    #[error("invalid response to `{command}`: {}", to_line(.reply))]
    InvalidResponse {
        /// The command name that was sent.
        command: String,
        /// The reply as received.
        reply: Value,
    },

    /// A by-id query found no torrent with that id.
    #[error("no torrent with id {id}")]
    NoSuchTorrent {
        /// The requested torrent id.
        id: i64,
    },

    /// Any other I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether a fresh connection may cure this error.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }

    /// Whether this error leaves the socket in an unusable state.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionLost(_) | Self::Refused(_) | Self::Timeout(_) | Self::Io(_)
        )
    }
}

/// Maps a socket I/O error onto the client's failure classes.
pub(crate) fn classify(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::UnexpectedEof => Error::ConnectionLost(e),
        io::ErrorKind::ConnectionRefused => Error::Refused(e),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::Timeout(e),
        _ => Error::Io(e),
    }
}
