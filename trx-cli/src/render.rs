//! Rendering daemon replies for the terminal.

use trx::Value;
use trx::proto::sorted;

/// Converts a bencoded value into JSON. Byte strings that are not UTF-8
/// become arrays of numbers.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(n) => (*n).into(),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => s.into(),
            Err(_) => b.iter().copied().collect::<Vec<u8>>().into(),
        },
        Value::List(items) => items.iter().map(to_json).collect(),
        Value::Dict(map) => sorted(map)
            .into_iter()
            .map(|(k, v)| (k, to_json(v)))
            .collect::<serde_json::Map<_, _>>()
            .into(),
    }
}
