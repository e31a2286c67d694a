//! Builders and accessors for protocol values.
//!
//! Commands are bencoded lists `[name, params..., tag]`; replies mirror
//! them as `[keyword, ..., tag]`. Only the handshake uses a mapping.

use std::collections::HashMap;

pub use serde_bencode::value::Value;

/// Default socket path of a locally running daemon.
pub const DEFAULT_SOCKET: &str = "/tmp/transmission-daemon";

/// Lowest protocol version this client speaks.
pub const PROTOCOL_MIN: i64 = 1;

/// Highest protocol version this client speaks.
pub const PROTOCOL_MAX: i64 = 2;

/// Minimum `version.max` a daemon must advertise.
pub const REQUIRED_MAX: i64 = 2;

/// Reply keyword of a successful command.
pub const SUCCEEDED: &str = "succeeded";

/// Reply keywords of a failed command.
pub const FAILED: &[&str] = &["failure", "failed"];

/// Builds a byte-string value from text.
pub fn text(s: impl AsRef<str>) -> Value {
    Value::Bytes(s.as_ref().as_bytes().to_vec())
}

/// Builds an integer value.
pub const fn int(n: i64) -> Value {
    Value::Int(n)
}

/// Builds a list value.
pub const fn list(items: Vec<Value>) -> Value {
    Value::List(items)
}

/// Builds a mapping from string keys.
pub fn dict<K: AsRef<str>>(entries: Vec<(K, Value)>) -> Value {
    Value::Dict(
        entries
            .into_iter()
            .map(|(k, v)| (k.as_ref().as_bytes().to_vec(), v))
            .collect::<HashMap<_, _>>(),
    )
}

/// Builds a tagged command `[name, params..., tag]`.
pub fn command(name: &str, params: Vec<Value>, tag: i64) -> Value {
    let mut items = Vec::with_capacity(params.len() + 2);
    items.push(text(name));
    items.extend(params);
    items.push(Value::Int(tag));
    Value::List(items)
}

/// The client's version announcement: `{"version": {"min": 1, "max": 2}}`.
pub fn handshake() -> Value {
    dict(vec![(
        "version",
        dict(vec![
            ("min", int(PROTOCOL_MIN)),
            ("max", int(PROTOCOL_MAX)),
        ]),
    )])
}

/// Returns the trailing integer of a list, i.e. the tag a reply answers.
pub fn tag_of(value: &Value) -> Option<i64> {
    match value {
        Value::List(items) => match items.last() {
            Some(Value::Int(tag)) => Some(*tag),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the leading keyword of a list reply.
pub fn keyword_of(value: &Value) -> Option<&str> {
    match value {
        Value::List(items) => items.first().and_then(as_str),
        _ => None,
    }
}

/// Views a byte-string value as UTF-8 text.
pub fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::Bytes(b) => std::str::from_utf8(b).ok(),
        _ => None,
    }
}

/// Looks up `key` in a mapping value.
pub fn dict_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Dict(map) => map.get(key.as_bytes()),
        _ => None,
    }
}

/// Extracts `version.max` from a daemon's version announcement.
pub fn version_max(value: &Value) -> Option<i64> {
    match dict_get(dict_get(value, "version")?, "max")? {
        Value::Int(max) => Some(*max),
        _ => None,
    }
}
