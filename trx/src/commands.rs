//! Named daemon commands.
//!
//! Each method is a single [`Client::call`] with a fixed command name; the
//! only work done here is picking the reply apart.

use std::path::PathBuf;

use trx_proto::{Value, as_str, dict, dict_get, int, list, text};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::transport::Connector;

/// Fields requested by the status queries.
pub const STATUS_TYPES: &[&str] = &[
    "completed",
    "download-speed",
    "download-total",
    "error",
    "error-message",
    "eta",
    "id",
    "peers-downloading",
    "peers-from",
    "peers-total",
    "peers-uploading",
    "running",
    "state",
    "swarm-speed",
    "tracker",
    "scrape-completed",
    "scrape-leechers",
    "scrape-seeders",
    "upload-speed",
    "upload-total",
];

/// Fields requested by the info queries.
pub const INFO_TYPES: &[&str] = &[
    "id", "hash", "name", "path", "saved", "private", "trackers", "comment", "creator", "date",
    "size", "files",
];

/// A torrent file to hand to the daemon.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct AddTorrent {
    /// Path to the `.torrent` file; made absolute before sending.
    pub file: PathBuf,
    /// Download directory, if not the daemon's default.
    pub directory: Option<String>,
    /// Whether to start right away, if not the daemon's default.
    pub autostart: Option<bool>,
}

impl AddTorrent {
    /// Adds `file` with daemon defaults.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    /// Sets the download directory.
    #[must_use]
    pub fn directory(mut self, dir: impl Into<String>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Sets whether the torrent starts right away.
    #[must_use]
    pub const fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = Some(autostart);
        self
    }
}

/// Encodes a field-name list.
fn types(names: &[&str]) -> Value {
    list(names.iter().map(text).collect())
}

/// Encodes a single-id selector.
fn ids(id: i64) -> Value {
    list(vec![int(id)])
}

impl<C: Connector> Client<C> {
    /// Getter whose value is an integer.
    fn get_int(&mut self, command: &str, key: &str) -> Result<i64> {
        match self.call_keyword(command, key, Vec::new())? {
            Value::Int(n) => Ok(n),
            reply => Err(Error::InvalidResponse {
                command: command.to_owned(),
                reply,
            }),
        }
    }

    /// Getter whose value is a list.
    fn get_list(&mut self, command: &str, key: &str, params: Vec<Value>) -> Result<Vec<Value>> {
        match self.call_keyword(command, key, params)? {
            Value::List(items) => Ok(items),
            reply => Err(Error::InvalidResponse {
                command: command.to_owned(),
                reply,
            }),
        }
    }

    /// First entry of a by-id query.
    fn get_one(&mut self, command: &str, key: &str, id: i64, fields: &[&str]) -> Result<Value> {
        let query = dict(vec![("id", ids(id)), ("type", types(fields))]);
        self.get_list(command, key, vec![query])?
            .into_iter()
            .next()
            .ok_or(Error::NoSuchTorrent { id })
    }

    /// Global download limit.
    pub fn downlimit(&mut self) -> Result<i64> {
        self.get_int("get-downlimit", "downlimit")
    }

    /// Sets the global download limit.
    pub fn set_downlimit(&mut self, limit: i64) -> Result<bool> {
        self.call_success("downlimit", vec![int(limit)])
    }

    /// Global upload limit.
    pub fn uplimit(&mut self) -> Result<i64> {
        self.get_int("get-uplimit", "uplimit")
    }

    /// Sets the global upload limit.
    pub fn set_uplimit(&mut self, limit: i64) -> Result<bool> {
        self.call_success("uplimit", vec![int(limit)])
    }

    /// Peer listening port.
    pub fn port(&mut self) -> Result<i64> {
        self.get_int("get-port", "port")
    }

    /// Sets the peer listening port.
    pub fn set_port(&mut self, port: i64) -> Result<bool> {
        self.call_success("port", vec![int(port)])
    }

    /// Directory torrents are downloaded into.
    pub fn directory(&mut self) -> Result<String> {
        let value = self.call_keyword("get-directory", "directory", Vec::new())?;
        match as_str(&value) {
            Some(dir) => Ok(dir.to_owned()),
            None => Err(Error::InvalidResponse {
                command: "get-directory".into(),
                reply: value,
            }),
        }
    }

    /// Sets the download directory.
    pub fn set_directory(&mut self, directory: &str) -> Result<bool> {
        self.call_success("directory", vec![text(directory)])
    }

    /// Whether added torrents start automatically.
    pub fn autostart(&mut self) -> Result<bool> {
        self.get_int("get-autostart", "autostart").map(|n| n != 0)
    }

    /// Sets whether added torrents start automatically.
    pub fn set_autostart(&mut self, autostart: bool) -> Result<bool> {
        self.call_success("autostart", vec![int(i64::from(autostart))])
    }

    /// Whether the listening port is mapped automatically.
    pub fn automap(&mut self) -> Result<bool> {
        self.get_int("get-automap", "automap").map(|n| n != 0)
    }

    /// Sets whether the listening port is mapped automatically.
    pub fn set_automap(&mut self, automap: bool) -> Result<bool> {
        self.call_success("automap", vec![int(i64::from(automap))])
    }

    /// Status of every torrent.
    pub fn status_all(&mut self) -> Result<Vec<Value>> {
        self.get_list("get-status-all", "status", vec![types(STATUS_TYPES)])
    }

    /// Metadata of every torrent.
    pub fn info_all(&mut self) -> Result<Vec<Value>> {
        self.get_list("get-info-all", "info", vec![types(INFO_TYPES)])
    }

    /// Status of one torrent.
    pub fn status(&mut self, id: i64) -> Result<Value> {
        self.get_one("get-status", "status", id, STATUS_TYPES)
    }

    /// Metadata of one torrent.
    pub fn info(&mut self, id: i64) -> Result<Value> {
        self.get_one("get-info", "info", id, INFO_TYPES)
    }

    /// Starts every torrent.
    pub fn start_all(&mut self) -> Result<bool> {
        self.call_success("start-all", Vec::new())
    }

    /// Stops every torrent.
    pub fn stop_all(&mut self) -> Result<bool> {
        self.call_success("stop-all", Vec::new())
    }

    /// Starts one torrent.
    pub fn start(&mut self, id: i64) -> Result<bool> {
        self.call_success("start", vec![ids(id)])
    }

    /// Stops one torrent.
    pub fn stop(&mut self, id: i64) -> Result<bool> {
        self.call_success("stop", vec![ids(id)])
    }

    /// Uploads a torrent file and returns the id the daemon assigned.
    ///
    /// Fails with [`Error::Io`] if the file does not exist. Returns
    /// `Ok(None)` when the daemon accepted the command but said nothing.
    pub fn add_torrent(&mut self, torrent: &AddTorrent) -> Result<Option<i64>> {
        let file = std::path::absolute(&torrent.file)?;
        std::fs::metadata(&file)?;

        let mut entries = vec![(
            "file",
            Value::Bytes(file.as_os_str().as_encoded_bytes().to_vec()),
        )];
        if let Some(dir) = &torrent.directory {
            entries.push(("directory", text(dir)));
        }
        if let Some(autostart) = torrent.autostart {
            entries.push(("autostart", int(i64::from(autostart))));
        }

        match self.get_list("addfile-detailed", "info", vec![dict(entries)]) {
            Ok(info) => Ok(info.first().and_then(|t| match dict_get(t, "id") {
                Some(Value::Int(id)) => Some(*id),
                _ => None,
            })),
            Err(Error::NoResponse { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Removes one torrent, failing with [`Error::NoSuchTorrent`] if the
    /// daemon does not know it.
    pub fn remove_torrent(&mut self, id: i64) -> Result<bool> {
        self.info(id)?;
        self.call_success("remove", vec![ids(id)])
    }

    /// Removes every torrent.
    pub fn remove_all(&mut self) -> Result<bool> {
        self.call_success("remove-all", Vec::new())
    }

    /// Round-trips a `noop`.
    pub fn ping(&mut self) -> Result<bool> {
        self.call_success("noop", Vec::new())
    }
}
