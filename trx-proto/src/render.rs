//! One-line text rendering of protocol values.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use crate::message::Value;

/// Renders a value on one line: byte strings as (lossy) UTF-8, lists in
/// brackets, mappings as `key=value` pairs sorted by key.
pub fn to_line(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Renders a parameter list the way it would appear inside a command.
pub fn params_line(params: &[Value]) -> String {
    let mut out = String::from("[");
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(&mut out, param);
    }
    out.push(']');
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Bytes(b) => out.push_str(&String::from_utf8_lossy(b)),
        Value::List(items) => out.push_str(&params_line(items)),
        Value::Dict(map) => {
            for (i, (k, v)) in sorted(map).into_iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{k}=");
                write_value(out, v);
            }
        }
    }
}

/// Mapping entries keyed by their lossy UTF-8 names, in order.
pub fn sorted(map: &HashMap<Vec<u8>, Value>) -> BTreeMap<String, &Value> {
    map.iter()
        .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), v))
        .collect()
}
