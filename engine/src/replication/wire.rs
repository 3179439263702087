//! Little-endian byte cursors for replication messages.
//!
//! Every field is written at an offset computed from the widths of the fields
//! before it. Nothing relies on in-memory struct layout.

use std::fmt;

/// Append-only little-endian encoder.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked little-endian decoder over a borrowed buffer.
#[derive(Debug)]
pub struct WireReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Take the next `len` bytes.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    /// Take everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.bytes[self.offset..];
        self.offset = self.bytes.len();
        bytes
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, WireError> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, WireError> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Result<u64, WireError> {
        self.array().map(u64::from_le_bytes)
    }

    /// Fail if any input is left unread.
    pub const fn finish(&self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(WireError::TrailingBytes(extra)),
        }
    }
}

/// Errors produced while encoding or decoding replication messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A field or key runs past the end of the input.
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Input continues after a complete message.
    TrailingBytes(usize),
    /// More value bytes than the recorded `value_size`.
    ValueOverrun { value_size: u32, available: usize },
    /// Unknown multipart aspect byte.
    UnknownAspect(u8),
    /// Unknown message code byte.
    UnknownCode(u8),
    /// Header code differs from the payload type being decoded.
    CodeMismatch { expected: u8, actual: u8 },
    /// A frame that should be `SMALL` carries another aspect.
    NotSmall(u8),
    /// The header's `msgsize` disagrees with the bytes that follow it.
    SizeMismatch { msgsize: u16, actual: usize },
    /// A payload, key or value is too long for its size field.
    TooLarge { field: &'static str, len: usize },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated {
                offset,
                needed,
                available,
            } => write!(
                f,
                "truncated at offset {offset}: need {needed} bytes, {available} available"
            ),
            Self::TrailingBytes(n) => write!(f, "{n} unexpected trailing bytes"),
            Self::ValueOverrun {
                value_size,
                available,
            } => write!(
                f,
                "value fragment of {available} bytes exceeds value_size {value_size}"
            ),
            Self::UnknownAspect(v) => write!(f, "unknown multipart aspect: 0x{v:02x}"),
            Self::UnknownCode(v) => write!(f, "unknown message code: {v}"),
            Self::CodeMismatch { expected, actual } => {
                write!(f, "expected message code {expected}, got {actual}")
            }
            Self::NotSmall(v) => write!(f, "expected a small frame, got aspect 0x{v:02x}"),
            Self::SizeMismatch { msgsize, actual } => {
                write!(f, "msgsize {msgsize} but {actual} payload bytes")
            }
            Self::TooLarge { field, len } => write!(f, "{field} too large: {len} bytes"),
        }
    }
}

impl std::error::Error for WireError {}
