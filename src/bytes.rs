// Little-endian slice reader used by the WAD, ShadeLz and GXT parsers.
//
// Every read is tagged with a field name so structural errors report the
// field, the absolute offset, and how many bytes were needed vs available.
// These formats are reverse-engineered; precise error context is the main
// debugging tool when a file does not match the expected layout.

use thiserror::Error;

/// Structural read failure: the buffer ended inside a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unexpected end of buffer reading `{field}` at offset {offset:#x}: \
     need {needed} bytes, {available} available"
)]
pub struct ReadError {
    pub field: &'static str,
    pub offset: usize,
    pub needed: usize,
    pub available: usize,
}

/// Cursor over an in-memory buffer.
///
/// All integer reads are little-endian, matching the WAD/ShadeLz/GXT wire
/// formats. The cursor only moves forward; `position()` reports the number
/// of bytes consumed so far (the WAD base offset is derived from it).
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left in the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Take `len` raw bytes.
    pub fn bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], ReadError> {
        if self.remaining() < len {
            return Err(ReadError {
                field,
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Take a fixed-size array.
    pub fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], ReadError> {
        let slice = self.bytes(field, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8, ReadError> {
        Ok(self.array::<1>(field)?[0])
    }

    pub fn u16(&mut self, field: &'static str) -> Result<u16, ReadError> {
        Ok(u16::from_le_bytes(self.array::<2>(field)?))
    }

    pub fn u32(&mut self, field: &'static str) -> Result<u32, ReadError> {
        Ok(u32::from_le_bytes(self.array::<4>(field)?))
    }

    pub fn i32(&mut self, field: &'static str) -> Result<i32, ReadError> {
        Ok(i32::from_le_bytes(self.array::<4>(field)?))
    }

    pub fn u64(&mut self, field: &'static str) -> Result<u64, ReadError> {
        Ok(u64::from_le_bytes(self.array::<8>(field)?))
    }

    /// Read a u32-length-prefixed byte run (the WAD string encoding).
    pub fn prefixed_bytes(&mut self, field: &'static str) -> Result<&'a [u8], ReadError> {
        let len = self.u32(field)? as usize;
        self.bytes(field, len)
    }
}
