//! Wire protocol for talking to a torrent daemon over its local socket.
//!
//! Values are bencoded with [`serde_bencode`] and framed with an
//! 8-character lowercase hex length prefix. There is no other header, no
//! checksum and no end marker.

mod codec;
mod message;
mod render;

pub use codec::{
    CodecError, LEN_WIDTH, MAX_PAYLOAD, decode_from, decode_length, decode_payload, encode,
    encode_to,
};
pub use message::{
    DEFAULT_SOCKET, FAILED, PROTOCOL_MAX, PROTOCOL_MIN, REQUIRED_MAX, SUCCEEDED, Value, as_str,
    command, dict, dict_get, handshake, int, keyword_of, list, tag_of, text, version_max,
};
pub use render::{params_line, sorted, to_line};
