//! Payload primitives.
//!
//! Fixed-layout structs go through bincode, whose default encoding is
//! fixed-width little-endian integers, the same as the game client. Strings
//! use a 7-bit variable-length prefix, which bincode cannot express, so
//! they are read and written by hand here.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Why a payload could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("need {need} bytes at offset {offset}, have {have}")]
    Truncated {
        need: usize,
        offset: usize,
        have: usize,
    },

    #[error("string length prefix too long")]
    StringPrefixTooLong,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// bincode rejected a fixed-layout struct.
    #[error("bad layout: {0}")]
    Layout(String),

    /// A list of `u16` entries was left with a stray byte.
    #[error("odd list length {0}")]
    OddLength(usize),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Cursor over a payload.
#[derive(Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            len: data.len(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Unread bytes, without consuming them.
    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    fn ensure(&self, need: usize) -> CodecResult<()> {
        if self.buf.remaining() < need {
            return Err(CodecError::Truncated {
                need,
                offset: self.len - self.buf.remaining(),
                have: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<Bytes> {
        self.ensure(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    /// Reads a fixed-layout struct and advances past its encoded size.
    pub fn read_struct<T: DeserializeOwned + Serialize>(&mut self) -> CodecResult<T> {
        let value: T =
            bincode::deserialize(self.buf).map_err(|e| CodecError::Layout(e.to_string()))?;
        let size = bincode::serialized_size(&value)
            .map_err(|e| CodecError::Layout(e.to_string()))? as usize;
        self.ensure(size)?;
        self.buf.advance(size);
        Ok(value)
    }

    /// Reads a string with a 7-bit variable-length prefix.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let mut len = 0usize;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            len |= ((byte & 0x7f) as usize) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 28 {
                return Err(CodecError::StringPrefixTooLong);
            }
        }
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Reads `u16` entries until the payload is used up.
    pub fn read_u16_list(&mut self) -> CodecResult<Vec<u16>> {
        if self.remaining() % 2 != 0 {
            return Err(CodecError::OddLength(self.remaining()));
        }
        let mut list = Vec::with_capacity(self.remaining() / 2);
        while self.buf.has_remaining() {
            list.push(self.buf.get_u16_le());
        }
        Ok(list)
    }
}

/// Growable payload buffer.
#[derive(Debug, Default)]
pub struct PacketWriter {
    data: BytesMut,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.data.put_u8(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.data.put_u16_le(value);
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.put_slice(bytes);
        self
    }

    pub fn write_struct<T: Serialize>(&mut self, value: &T) -> &mut Self {
        // Plain structs of integers into a growable buffer cannot fail.
        let _ = bincode::serialize_into((&mut self.data).writer(), value);
        self
    }

    pub fn write_string(&mut self, value: &str) -> &mut Self {
        let mut len = value.len();
        while len >= 0x80 {
            self.data.put_u8((len as u8 & 0x7f) | 0x80);
            len >>= 7;
        }
        self.data.put_u8(len as u8);
        self.data.put_slice(value.as_bytes());
        self
    }

    pub fn finish(self) -> Bytes {
        self.data.freeze()
    }
}
