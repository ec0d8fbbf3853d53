//! Line codec for the broker topics
//!
//! All messages are framed as:
//! ```text
//! [ JSON object, no embedded newlines ][ '\n' ]
//! ```
//!
//! Newline framing keeps the payloads readable on a broker console and
//! preserves message boundaries over stream transports.

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::defaults::MAX_FRAME_SIZE;
use crate::{AckEnvelope, CommandEnvelope};

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a command envelope into a newline-terminated frame
pub fn encode_command(envelope: &CommandEnvelope) -> Result<Bytes, CodecError> {
    encode_json(envelope)
}

/// Encode an acknowledgment envelope into a newline-terminated frame
pub fn encode_ack(envelope: &AckEnvelope) -> Result<Bytes, CodecError> {
    encode_json(envelope)
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<Bytes, CodecError> {
    let raw = serde_json::to_vec(value)?;
    if raw.len() >= MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(raw.len()));
    }

    let mut buf = BytesMut::with_capacity(raw.len() + 1);
    buf.extend_from_slice(&raw);
    buf.extend_from_slice(b"\n");
    Ok(buf.freeze())
}

/// Decode a single acknowledgment frame (trailing newline optional)
pub fn decode_ack(frame: &[u8]) -> Result<AckEnvelope, CodecError> {
    Ok(serde_json::from_slice(trim_frame(frame))?)
}

/// Decode a single command frame (trailing newline optional)
pub fn decode_command(frame: &[u8]) -> Result<CommandEnvelope, CodecError> {
    Ok(serde_json::from_slice(trim_frame(frame))?)
}

fn trim_frame(frame: &[u8]) -> &[u8] {
    let end = frame
        .iter()
        .rposition(|b| *b != b'\n' && *b != b'\r')
        .map(|p| p + 1)
        .unwrap_or(0);
    &frame[..end]
}

/// Incremental decoder for stream transports
///
/// Feed raw bytes with [`extend`](Self::extend), then drain complete frames
/// with [`next_frame`](Self::next_frame).
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes to the internal buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete frame, without its newline terminator.
    ///
    /// Returns `Ok(None)` when no complete frame is buffered yet. Blank
    /// lines are skipped.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, CodecError> {
        loop {
            match self.buf.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    let mut line = self.buf.split_to(pos + 1);
                    line.truncate(pos);
                    if line.iter().all(|b| b.is_ascii_whitespace()) {
                        continue;
                    }
                    return Ok(Some(line.freeze()));
                }
                None => {
                    if self.buf.len() >= MAX_FRAME_SIZE {
                        return Err(CodecError::FrameTooLarge(self.buf.len()));
                    }
                    return Ok(None);
                }
            }
        }
    }
}
