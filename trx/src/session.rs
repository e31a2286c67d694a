//! Connection state, version handshake and the reconnect-once policy.
//!
//! A [`Session`] owns at most one live transport plus the tag counter. It
//! connects lazily: nothing touches the socket until the first frame is
//! sent or received.

use std::io;

use tracing::debug;
use trx_proto::{LEN_WIDTH, REQUIRED_MAX, Value};

use crate::error::{Error, Result};
use crate::transport::{Connector, Transport, UnixConnector};

/// Where a [`Session`] is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum SessionState {
    /// No socket is open.
    #[default]
    Disconnected,
    /// A socket is open and versions are being exchanged.
    Handshaking,
    /// Versions agreed; commands may be sent.
    Ready,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Handshaking => "handshaking",
            Self::Ready => "ready",
        })
    }
}

/// One logical connection to the daemon.
///
/// Transient socket failures (broken pipe, reset, early close) drop the
/// session back to [`SessionState::Disconnected`]. Each command gets exactly
/// one inline reconnect, shared between its `send_frame` and every
/// `receive_frame` that follows; the next transient failure reaches the
/// caller.
#[derive(Debug)]
pub struct Session<C: Connector = UnixConnector> {
    /// Opens fresh transports.
    connector: C,
    /// The live transport, if any.
    transport: Option<C::Transport>,
    /// Current lifecycle state.
    state: SessionState,
    /// Last tag handed out. Never reset.
    tag: i64,
    /// Send a `noop` after the first handshake.
    warm_up: bool,
    /// Last command frame sent, replayed after a reconnect.
    pending: Option<Vec<u8>>,
    /// The current command already used its reconnect.
    reconnected: bool,
}

impl<C: Connector> Session<C> {
    /// Creates a disconnected session.
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
            transport: None,
            state: SessionState::Disconnected,
            tag: 0,
            warm_up: true,
            pending: None,
            reconnected: false,
        }
    }

    /// Enables or disables the warm-up `noop` after the first handshake.
    #[must_use]
    pub const fn warm_up(mut self, enable: bool) -> Self {
        self.warm_up = enable;
        self
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The most recently allocated tag (0 before any).
    pub const fn last_tag(&self) -> i64 {
        self.tag
    }

    /// The connector this session dials.
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Allocates the next request tag.
    pub const fn next_tag(&mut self) -> i64 {
        self.tag += 1;
        self.tag
    }

    /// Connects and handshakes unless the session is already ready.
    pub fn ensure_ready(&mut self) -> Result<()> {
        if self.state == SessionState::Ready && self.transport.is_some() {
            return Ok(());
        }
        self.connect(self.warm_up)
    }

    /// Encodes `value` and writes it as one frame.
    ///
    /// Starts a new command: the frame is remembered so that a
    /// receive-side reconnect can replay it, and the reconnect allowance is
    /// renewed.
    pub fn send_frame(&mut self, value: &Value) -> Result<()> {
        let frame = trx_proto::encode(value)?;
        self.pending = None;
        self.reconnected = false;
        self.ensure_ready()?;
        match self.write_frame(&frame) {
            Err(e) if e.is_transient() => {
                debug!(error = %e, "send failed, reconnecting once");
                self.reconnect()?;
                self.write_frame(&frame)?;
            }
            other => other?,
        }
        self.pending = Some(frame);
        Ok(())
    }

    /// Reads one frame.
    ///
    /// Returns `None` when the length field is not valid hex.
    pub fn receive_frame(&mut self) -> Result<Option<Value>> {
        self.ensure_ready()?;
        match self.read_frame() {
            Err(e) if e.is_transient() => {
                let Some(frame) = self.pending.clone() else {
                    return Err(e);
                };
                if self.reconnected {
                    return Err(e);
                }
                debug!(error = %e, "receive failed, reconnecting and resending once");
                self.reconnect()?;
                self.write_frame(&frame)?;
                self.read_frame()
            }
            other => other,
        }
    }

    /// Forgets the replayable frame once its reply has arrived.
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Closes the socket, if open, and returns to `Disconnected`.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.state = SessionState::Disconnected;
    }

    /// Spends the current command's reconnect allowance.
    fn reconnect(&mut self) -> Result<()> {
        self.reconnected = true;
        self.connect(false)
    }

    /// Replaces any transport with a fresh, handshaken one.
    fn connect(&mut self, warm_up: bool) -> Result<()> {
        self.close();
        self.state = SessionState::Handshaking;
        match self.handshake(warm_up) {
            Ok(()) => {
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    /// Exchanges version ranges on a new transport.
    fn handshake(&mut self, warm_up: bool) -> Result<()> {
        self.transport = Some(self.connector.connect()?);

        let announce = self
            .read_frame()?
            .ok_or_else(|| Error::Handshake("no version frame".into()))?;
        let max = trx_proto::version_max(&announce)
            .ok_or_else(|| Error::Handshake(trx_proto::to_line(&announce)))?;
        if max < REQUIRED_MAX {
            return Err(Error::InsufficientProtocolVersion { max });
        }
        self.write_frame(&trx_proto::encode(&trx_proto::handshake())?)?;

        // Without a first tagged command the daemon does not reliably tag
        // later replies.
        if warm_up {
            let tag = self.next_tag();
            let noop = trx_proto::command("noop", vec![trx_proto::int(0)], tag);
            self.write_frame(&trx_proto::encode(&noop)?)?;
        }
        debug!(daemon_max = max, "handshake complete");
        Ok(())
    }

    /// Writes raw frame bytes, dropping the connection on socket failure.
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let result = self.transport_mut()?.send(frame);
        if result.as_ref().is_err_and(Error::is_transport) {
            self.close();
        }
        result
    }

    /// Reads and decodes one frame, dropping the connection on socket failure.
    fn read_frame(&mut self) -> Result<Option<Value>> {
        let result = self.read_frame_inner();
        if result.as_ref().is_err_and(Error::is_transport) {
            self.close();
        }
        result
    }

    /// Length field, then exactly that many payload bytes.
    fn read_frame_inner(&mut self) -> Result<Option<Value>> {
        let transport = self.transport_mut()?;
        let field = transport.recv_exact(LEN_WIDTH)?;
        let field: [u8; LEN_WIDTH] = field
            .as_slice()
            .try_into()
            .map_err(|_| Error::ConnectionLost(io::ErrorKind::UnexpectedEof.into()))?;
        let Some(len) = trx_proto::decode_length(&field) else {
            return Ok(None);
        };
        let payload = transport.recv_exact(len as usize)?;
        Ok(Some(trx_proto::decode_payload(&payload)?))
    }

    /// The live transport, or a not-connected failure.
    fn transport_mut(&mut self) -> Result<&mut C::Transport> {
        self.transport
            .as_mut()
            .ok_or_else(|| Error::ConnectionLost(io::ErrorKind::NotConnected.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, echo_succeeded, silent};

    #[test]
    fn starts_disconnected_and_lazy() {
        let script = Script::new(2, echo_succeeded);
        let session = Session::new(script.connector());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(script.connects(), 0);
    }

    #[test]
    fn handshake_sends_version_then_warm_up() {
        let script = Script::new(2, silent);
        let mut session = Session::new(script.connector());
        session.ensure_ready().unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        let sent = script.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], trx_proto::handshake());
        assert_eq!(
            sent[1],
            trx_proto::command("noop", vec![trx_proto::int(0)], 1)
        );
        assert_eq!(session.last_tag(), 1);

        session.ensure_ready().unwrap();
        assert_eq!(script.connects(), 1);
    }

    #[test]
    fn warm_up_can_be_suppressed() {
        let script = Script::new(2, silent);
        let mut session = Session::new(script.connector()).warm_up(false);
        session.ensure_ready().unwrap();
        assert_eq!(script.sent(), vec![trx_proto::handshake()]);
        assert_eq!(session.last_tag(), 0);
    }

    #[test]
    fn rejects_old_daemon() {
        let script = Script::new(1, silent);
        let mut session = Session::new(script.connector());
        let err = session.ensure_ready().unwrap_err();

        assert!(matches!(err, Error::InsufficientProtocolVersion { max: 1 }));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(script.sent().is_empty());
        assert_eq!(script.live(), 0);
    }

    #[test]
    fn rejects_announcement_without_version() {
        let script = Script::new(2, silent);
        script.set_hello(trx_proto::dict(vec![("hello", trx_proto::int(1))]));
        let mut session = Session::new(script.connector());
        assert!(matches!(session.ensure_ready(), Err(Error::Handshake(_))));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn missing_daemon_is_reported() {
        let script = Script::new(2, silent);
        script.refuse_connects();
        let mut session = Session::new(script.connector());
        assert!(matches!(
            session.ensure_ready(),
            Err(Error::NoDaemon { .. })
        ));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn one_reconnect_on_send_failure() {
        let script = Script::new(2, silent);
        let mut session = Session::new(script.connector());
        session.ensure_ready().unwrap();

        script.fail_sends(1);
        let cmd = trx_proto::command("start-all", vec![trx_proto::int(0)], 2);
        session.send_frame(&cmd).unwrap();

        assert_eq!(script.connects(), 2);
        assert_eq!(session.state(), SessionState::Ready);
        // Reconnects skip the warm-up.
        let sent = script.sent();
        assert_eq!(sent.last(), Some(&cmd));
        assert_eq!(sent[sent.len() - 2], trx_proto::handshake());
    }

    #[test]
    fn second_send_failure_propagates() {
        let script = Script::new(2, silent);
        let mut session = Session::new(script.connector());
        session.ensure_ready().unwrap();

        script.fail_sends(2);
        let cmd = trx_proto::command("start-all", vec![trx_proto::int(0)], 2);
        let err = session.send_frame(&cmd).unwrap_err();

        assert!(matches!(err, Error::ConnectionLost(_)));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(script.connects(), 2);
        assert_eq!(script.live(), 0);
    }

    #[test]
    fn receive_failure_replays_pending_frame() {
        let script = Script::new(2, echo_succeeded);
        let mut session = Session::new(script.connector()).warm_up(false);
        session.ensure_ready().unwrap();

        let cmd = trx_proto::command("stop-all", vec![trx_proto::int(0)], 1);
        session.send_frame(&cmd).unwrap();
        script.fail_recvs(1);
        let reply = session.receive_frame().unwrap().unwrap();

        assert_eq!(trx_proto::tag_of(&reply), Some(1));
        assert_eq!(script.connects(), 2);
        let resent = script.sent().into_iter().filter(|v| *v == cmd).count();
        assert_eq!(resent, 2);
    }

    #[test]
    fn receive_failure_without_pending_propagates() {
        let script = Script::new(2, silent);
        let mut session = Session::new(script.connector()).warm_up(false);
        session.ensure_ready().unwrap();

        script.fail_recvs(1);
        assert!(matches!(
            session.receive_frame(),
            Err(Error::ConnectionLost(_))
        ));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn replay_failure_propagates() {
        let script = Script::new(2, echo_succeeded);
        let mut session = Session::new(script.connector()).warm_up(false);
        session.ensure_ready().unwrap();

        let cmd = trx_proto::command("remove", vec![trx_proto::int(5)], 1);
        session.send_frame(&cmd).unwrap();
        script.fail_recvs(2);
        assert!(matches!(
            session.receive_frame(),
            Err(Error::ConnectionLost(_))
        ));
        assert_eq!(script.connects(), 2);
        let resent = script.sent().into_iter().filter(|v| *v == cmd).count();
        assert_eq!(resent, 2);
    }

    #[test]
    fn send_and_receive_share_one_reconnect() {
        let script = Script::new(2, silent);
        let mut session = Session::new(script.connector()).warm_up(false);
        session.ensure_ready().unwrap();

        script.fail_sends(1);
        let cmd = trx_proto::command("start-all", vec![trx_proto::int(0)], 1);
        session.send_frame(&cmd).unwrap();
        script.fail_recvs(1);
        assert!(matches!(
            session.receive_frame(),
            Err(Error::ConnectionLost(_))
        ));
        assert_eq!(script.connects(), 2);
        assert_eq!(session.state(), SessionState::Disconnected);

        // A new command gets a fresh allowance.
        script.fail_sends(1);
        let next = trx_proto::command("stop-all", vec![trx_proto::int(0)], 2);
        session.send_frame(&next).unwrap();
        assert_eq!(script.sent().last(), Some(&next));
    }

    #[test]
    fn close_returns_to_disconnected() {
        let script = Script::new(2, silent);
        let mut session = Session::new(script.connector());
        session.ensure_ready().unwrap();
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(script.live(), 0);
    }
}
