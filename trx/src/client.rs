//! Tagged request/response engine on top of a [`Session`].
//!
//! Every command goes out as `[name, params..., tag]`. Replies whose
//! trailing tag differs from the one just sent are dropped until the
//! matching one arrives.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::trace;
use trx_proto::{DEFAULT_SOCKET, FAILED, SUCCEEDED, Value};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::{Connector, UnixConnector};

/// Builder for a [`Client`] talking to a Unix socket.
///
/// Defaults: [`DEFAULT_SOCKET`], warm-up enabled, no timeouts.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// let mut client = trx::Client::builder()
///     .socket("/run/transmission/daemon.sock")
///     .read_timeout(Duration::from_secs(10))
///     .build();
///
/// let port = client.port().expect("daemon unreachable");
/// println!("listening on {port}");
/// ```
#[derive(Debug, Clone)]
#[must_use = "a ClientBuilder does nothing until .build() is called"]
pub struct ClientBuilder {
    /// Daemon socket path.
    socket: PathBuf,
    /// Send a `noop` after the first handshake.
    warm_up: bool,
    /// Per-read timeout; `None` blocks forever.
    read_timeout: Option<Duration>,
    /// Per-write timeout; `None` blocks forever.
    write_timeout: Option<Duration>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET),
            warm_up: true,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl ClientBuilder {
    /// Sets the daemon socket path.
    pub fn socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket = path.into();
        self
    }

    /// Enables or disables the warm-up `noop` after connecting (default: on).
    pub const fn warm_up(mut self, enable: bool) -> Self {
        self.warm_up = enable;
        self
    }

    /// Bounds every socket read. An elapsed timeout fails the call with
    /// [`Error::Timeout`] and drops the connection.
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Bounds every socket write.
    pub const fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Builds the client. No connection is made until the first call.
    pub fn build(self) -> Client {
        let connector = UnixConnector::new(self.socket)
            .read_timeout(self.read_timeout)
            .write_timeout(self.write_timeout);
        Client {
            session: Session::new(connector).warm_up(self.warm_up),
        }
    }
}

/// A synchronous daemon client.
///
/// `call` takes `&mut self`, so a client carries at most one request in
/// flight. Share one across threads through [`SharedClient`].
#[derive(Debug)]
pub struct Client<C: Connector = UnixConnector> {
    /// Connection state and tag counter.
    session: Session<C>,
}

impl Client {
    /// Returns a builder with default settings.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Creates a client for the socket at `path` with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::builder().socket(path).build()
    }
}

impl<C: Connector> Client<C> {
    /// Wraps an existing session.
    pub const fn from_session(session: Session<C>) -> Self {
        Self { session }
    }

    /// The underlying session.
    pub const fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Closes the connection. The next call reconnects.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Sends `command` with `params` and returns the reply carrying its tag.
    ///
    /// An empty `params` is sent as a single `0`, since the daemon expects
    /// at least one parameter slot. Replies for other tags are discarded.
    /// There is no timeout unless one was configured on the transport.
    pub fn call(&mut self, command: &str, params: Vec<Value>) -> Result<Value> {
        let params = if params.is_empty() {
            vec![trx_proto::int(0)]
        } else {
            params
        };

        self.session.ensure_ready()?;
        let tag = self.session.next_tag();
        self.session
            .send_frame(&trx_proto::command(command, params.clone(), tag))?;

        loop {
            let Some(reply) = self.session.receive_frame()? else {
                return Err(Error::NoResponse {
                    command: command.to_owned(),
                    params,
                });
            };
            if trx_proto::tag_of(&reply) == Some(tag) {
                self.session.clear_pending();
                return Ok(reply);
            }
            trace!(tag, ?reply, "discarding reply for another request");
        }
    }

    /// Like [`call`](Self::call), reporting whether the reply keyword is
    /// `succeeded`.
    pub fn call_success(&mut self, command: &str, params: Vec<Value>) -> Result<bool> {
        let reply = self.call(command, params)?;
        Ok(trx_proto::keyword_of(&reply) == Some(SUCCEEDED))
    }

    /// Calls `command` and returns the value following the keyword `key`.
    ///
    /// Getters answer `[key, value, tag]`, e.g. `get-port` answers
    /// `["port", 9090, tag]`.
    pub fn call_keyword(&mut self, command: &str, key: &str, params: Vec<Value>) -> Result<Value> {
        let reply = self.call(command, params)?;
        let keyword = trx_proto::keyword_of(&reply).map(str::to_owned);
        match keyword.as_deref() {
            Some(k) if k == key => match reply {
                Value::List(mut items) if items.len() > 2 => Ok(items.swap_remove(1)),
                other => Err(Error::InvalidResponse {
                    command: command.to_owned(),
                    reply: other,
                }),
            },
            Some(k) if FAILED.contains(&k) => Err(Error::CommandFailed {
                command: command.to_owned(),
            }),
            _ => Err(Error::InvalidResponse {
                command: command.to_owned(),
                reply,
            }),
        }
    }
}

/// A [`Client`] behind a mutex, for callers on several threads.
///
/// Calls are serialized: a thread waiting for its reply holds the lock, so
/// no other caller can consume that reply.
#[derive(Debug)]
pub struct SharedClient<C: Connector = UnixConnector> {
    /// The serialized client.
    inner: Mutex<Client<C>>,
}

impl<C: Connector> SharedClient<C> {
    /// Wraps `client`.
    pub const fn new(client: Client<C>) -> Self {
        Self {
            inner: Mutex::new(client),
        }
    }

    /// Runs `f` with exclusive access to the client.
    pub fn with<R>(&self, f: impl FnOnce(&mut Client<C>) -> R) -> R {
        f(&mut self.lock())
    }

    /// Serialized [`Client::call`].
    pub fn call(&self, command: &str, params: Vec<Value>) -> Result<Value> {
        self.lock().call(command, params)
    }

    /// Locks the client. A panic in another caller does not poison it: the
    /// session either finished its exchange or dropped the connection.
    fn lock(&self) -> MutexGuard<'_, Client<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Connector> From<Client<C>> for SharedClient<C> {
    fn from(client: Client<C>) -> Self {
        Self::new(client)
    }
}
