//! Scripted in-memory daemon for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use trx_proto::{LEN_WIDTH, Value, dict, int, list, tag_of, text};

use crate::error::{Error, Result};
use crate::transport::{Connector, Transport};

/// Produces the raw frames the daemon sends back for one received value.
pub(crate) type Responder = fn(&Value) -> Vec<Vec<u8>>;

/// State shared by the script and every transport it hands out.
#[derive(Debug)]
struct Inner {
    /// `version.max` in the default announcement.
    daemon_max: i64,
    /// Replaces the default announcement when set.
    hello: Option<Value>,
    /// Answers each value the client sends.
    responder: Responder,
    /// Bytes waiting to be read on the current connection.
    inbound: VecDeque<u8>,
    /// Values the client sent, across all connections.
    sent: Vec<Value>,
    /// Successful connects so far.
    connects: usize,
    /// Transports opened and not yet closed.
    live: usize,
    /// Upcoming sends that fail with a broken pipe.
    fail_sends: usize,
    /// Upcoming reads that fail with a reset.
    fail_recvs: usize,
    /// Connects fail as if no daemon were listening.
    refuse: bool,
}

/// Shared handle to the fake daemon; doubles as its connector.
#[derive(Debug, Clone)]
pub(crate) struct Script(Rc<RefCell<Inner>>);

impl Script {
    /// A daemon advertising `daemon_max` and answering with `responder`.
    pub(crate) fn new(daemon_max: i64, responder: Responder) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            daemon_max,
            hello: None,
            responder,
            inbound: VecDeque::new(),
            sent: Vec::new(),
            connects: 0,
            live: 0,
            fail_sends: 0,
            fail_recvs: 0,
            refuse: false,
        })))
    }

    /// Another handle to the same daemon, for a session to dial.
    pub(crate) fn connector(&self) -> Self {
        self.clone()
    }

    /// Overrides the version announcement.
    pub(crate) fn set_hello(&self, hello: Value) {
        self.0.borrow_mut().hello = Some(hello);
    }

    /// Makes the next `n` sends fail.
    pub(crate) fn fail_sends(&self, n: usize) {
        self.0.borrow_mut().fail_sends = n;
    }

    /// Makes the next `n` reads fail.
    pub(crate) fn fail_recvs(&self, n: usize) {
        self.0.borrow_mut().fail_recvs = n;
    }

    /// Makes every later connect fail with `NoDaemon`.
    pub(crate) fn refuse_connects(&self) {
        self.0.borrow_mut().refuse = true;
    }

    /// Queues raw bytes on the current connection.
    pub(crate) fn push_raw(&self, bytes: &[u8]) {
        self.0.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    /// Every value the client has successfully sent, in order.
    pub(crate) fn sent(&self) -> Vec<Value> {
        self.0.borrow().sent.clone()
    }

    /// Successful connects so far.
    pub(crate) fn connects(&self) -> usize {
        self.0.borrow().connects
    }

    /// Transports opened and not yet closed.
    pub(crate) fn live(&self) -> usize {
        self.0.borrow().live
    }
}

impl Connector for Script {
    type Transport = MockTransport;

    fn connect(&self) -> Result<MockTransport> {
        let mut inner = self.0.borrow_mut();
        if inner.refuse {
            return Err(Error::NoDaemon {
                path: "/mock/daemon.sock".into(),
                source: io::ErrorKind::NotFound.into(),
            });
        }
        inner.connects += 1;
        inner.live += 1;
        let hello = inner.hello.clone().unwrap_or_else(|| {
            dict(vec![(
                "version",
                dict(vec![("min", int(1)), ("max", int(inner.daemon_max))]),
            )])
        });
        inner.inbound.clear();
        inner.inbound.extend(frame(&hello));
        Ok(MockTransport {
            script: self.clone(),
            open: true,
        })
    }
}

/// One fake connection.
#[derive(Debug)]
pub(crate) struct MockTransport {
    /// The daemon behind this connection.
    script: Script,
    /// Cleared by `close`.
    open: bool,
}

impl Transport for MockTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.open {
            return Err(Error::ConnectionLost(io::ErrorKind::NotConnected.into()));
        }
        let mut inner = self.script.0.borrow_mut();
        if inner.fail_sends > 0 {
            inner.fail_sends -= 1;
            return Err(Error::ConnectionLost(io::ErrorKind::BrokenPipe.into()));
        }
        let value = trx_proto::decode_payload(&bytes[LEN_WIDTH..]).unwrap();
        let replies = (inner.responder)(&value);
        inner.sent.push(value);
        for reply in replies {
            inner.inbound.extend(reply);
        }
        Ok(())
    }

    fn recv_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut inner = self.script.0.borrow_mut();
        if inner.fail_recvs > 0 {
            inner.fail_recvs -= 1;
            return Err(Error::ConnectionLost(io::ErrorKind::ConnectionReset.into()));
        }
        if !self.open || inner.inbound.len() < n {
            return Err(Error::ConnectionLost(io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(inner.inbound.drain(..n).collect())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.script.0.borrow_mut().live -= 1;
        }
    }
}

/// Encodes `value` as a full frame.
pub(crate) fn frame(value: &Value) -> Vec<u8> {
    trx_proto::encode(value).unwrap()
}

/// Builds a reply `[keyword, tag]`.
pub(crate) fn reply(keyword: &str, tag: i64) -> Value {
    list(vec![text(keyword), int(tag)])
}

/// Never answers.
pub(crate) fn silent(_: &Value) -> Vec<Vec<u8>> {
    Vec::new()
}

/// Answers every tagged command with `["succeeded", tag]`.
pub(crate) fn echo_succeeded(value: &Value) -> Vec<Vec<u8>> {
    tag_of(value)
        .map(|tag| vec![frame(&reply("succeeded", tag))])
        .unwrap_or_default()
}
