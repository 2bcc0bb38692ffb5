//! Stream framing.
//!
//! TCP delivers bytes with no message boundaries. Each frame on the wire is
//! a `u16` little-endian length followed by that many bytes, the first of
//! which is the message type tag.

use crate::{HEADER_LEN, MAX_FRAME_LENGTH};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Framing failures. Every variant is fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The length prefix is larger than [`MAX_FRAME_LENGTH`].
    #[error("length limit exceeded: {length} > {max}")]
    LengthLimitExceeded { length: usize, max: usize },

    /// A zero length prefix leaves no room for the type tag.
    #[error("empty frame")]
    EmptyFrame,
}

/// One complete frame: the type tag and the payload that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub tag: u8,
    pub payload: Bytes,
}

/// Per-connection reassembly buffer.
///
/// Bytes are appended with [`FrameDecoder::extend`] as they arrive and
/// complete frames are taken out with [`FrameDecoder::next_frame`]. A frame
/// is only ever returned whole.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    failed: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk read from the socket.
    pub fn extend(&mut self, chunk: &[u8]) {
        if !self.failed {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Takes the next complete frame off the front of the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Once an error has been
    /// returned the decoder stays failed and yields nothing further.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.failed || self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }

        let length = u16::from_le_bytes([self.buffer[0], self.buffer[1]]) as usize;
        if length > MAX_FRAME_LENGTH {
            self.fail();
            return Err(FrameError::LengthLimitExceeded {
                length,
                max: MAX_FRAME_LENGTH,
            });
        }
        if length == 0 {
            self.fail();
            return Err(FrameError::EmptyFrame);
        }

        if self.buffer.len() < HEADER_LEN + length {
            return Ok(None);
        }

        self.buffer.advance(HEADER_LEN);
        let mut body = self.buffer.split_to(length).freeze();
        let tag = body.get_u8();

        Ok(Some(Frame { tag, payload: body }))
    }

    /// Feeds a chunk and drains every frame it completes.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, FrameError> {
        self.extend(chunk);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn fail(&mut self) {
        self.failed = true;
        self.buffer.clear();
    }
}

/// Builds the wire bytes for one frame.
///
/// Callers keep payloads below [`MAX_FRAME_LENGTH`]; the tile streamer does
/// so by sending one section row per message.
pub fn encode_frame(tag: u8, payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len() + 1);
    out.put_u16_le((payload.len() + 1) as u16);
    out.put_u8(tag);
    out.put_slice(payload);
    out.freeze()
}
