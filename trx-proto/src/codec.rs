//! Hex length-prefixed frame codec.
//!
//! Each frame is: `[8 lowercase hex digits: payload length][bencoded payload]`.

use std::io::{self, Read, Write};

use serde_bencode::value::Value;

/// Width of the ASCII hex length field.
pub const LEN_WIDTH: usize = 8;

/// Largest payload an 8-digit hex length field can describe.
pub const MAX_PAYLOAD: usize = 0xFFFF_FFFF;

/// Errors produced while turning values into frames and back.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The serializer rejected the value.
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_bencode::Error),

    /// The payload bytes are not a valid bencoded value.
    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_bencode::Error),

    /// The payload does not fit in the length field.
    #[error("payload of {0} bytes exceeds the 8-digit length field")]
    TooLarge(usize),
}

/// Encodes `value` into a complete frame (length field plus payload).
pub fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    let payload = serde_bencode::to_bytes(value).map_err(CodecError::Encode)?;
    if payload.len() > MAX_PAYLOAD {
        return Err(CodecError::TooLarge(payload.len()));
    }
    let mut frame = Vec::with_capacity(LEN_WIDTH + payload.len());
    frame.extend_from_slice(format!("{:08x}", payload.len()).as_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Parses a length field.
///
/// Returns `None` when the field is not eight hex digits. Callers treat
/// that as "no message" rather than as an error.
pub fn decode_length(field: &[u8; LEN_WIDTH]) -> Option<u32> {
    if !field.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(field).ok()?;
    u32::from_str_radix(text, 16).ok()
}

/// Decodes a bencoded payload.
pub fn decode_payload(payload: &[u8]) -> Result<Value, CodecError> {
    serde_bencode::from_bytes(payload).map_err(CodecError::Decode)
}

/// Encodes `value` as a frame and writes it to `w`.
pub fn encode_to<W: Write>(w: &mut W, value: &Value) -> io::Result<()> {
    let frame = encode(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    w.write_all(&frame)?;
    w.flush()
}

/// Reads one frame from `r`.
///
/// Returns `Ok(None)` when the length field is not valid hex.
pub fn decode_from<R: Read>(r: &mut R) -> io::Result<Option<Value>> {
    let mut field = [0u8; LEN_WIDTH];
    r.read_exact(&mut field)?;
    let Some(len) = decode_length(&field) else {
        return Ok(None);
    };
    let mut payload = Vec::new();
    r.take(u64::from(len)).read_to_end(&mut payload)?;
    if payload.len() != len as usize {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    decode_payload(&payload)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
