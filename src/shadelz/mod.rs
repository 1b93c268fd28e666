// ShadeLz decompression.
//
// ShadeLz is the proprietary LZ77-family scheme used for payloads inside
// WAD entries. A stream is a 12-byte header (magic, decompressed size,
// compressed size, all little-endian) followed by flag-driven instructions:
//
//   1xxx xxxx  match start:    length = ((flag >> 5) & 0x3) + 4
//                              displacement = (flag & 0x1F) << 8 | next
//   011x xxxx  match continue: length = flag & 0x1F, reuse last displacement
//   010x xxxx  RLE run:        one value byte repeated
//   00xx xxxx  raw literals:   copied straight from the input
//
// The flag patterns overlap, so the dispatch order above is load-bearing:
// 0x80 must be tested before 0x60, 0x60 before 0x40. A reordering would
// silently mis-decode rather than fail.
//
// Only decoding is implemented; the games ship no tooling that requires an
// encoder and none has been observed.

mod history;

pub use history::{CircularHistory, HISTORY_CAPACITY};

use thiserror::Error;

use crate::bytes::{ByteReader, ReadError};

/// ShadeLz stream magic (first 4 bytes of a compressed payload).
pub const SHADELZ_MAGIC: [u8; 4] = [0xFC, 0xAA, 0x55, 0xA7];

/// Fixed stream header length: magic + decompressed size + compressed size.
pub const HEADER_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ShadeLzError {
    /// The first four bytes are not the ShadeLz magic.
    #[error(
        "bad ShadeLz magic at offset 0x0: expected [FC, AA, 55, A7], got {found:02X?}"
    )]
    Magic { found: [u8; 4] },

    /// The buffer ended inside the 12-byte stream header.
    #[error("malformed ShadeLz header: {0}")]
    Header(#[from] ReadError),

    /// Input ran out before the declared output size was reached.
    #[error("truncated ShadeLz stream: declared {declared} bytes, decoded {decoded}")]
    Truncated { declared: usize, decoded: usize },

    /// An instruction would have written past the declared output size.
    /// Output is clamped at the boundary; the excess is never written.
    #[error(
        "ShadeLz instruction overruns declared size {declared} by {excess} bytes"
    )]
    Overrun { declared: usize, excess: usize },
}

// ---------------------------------------------------------------------------
// Stream header
// ---------------------------------------------------------------------------

/// Parsed 12-byte ShadeLz stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Size the payload decompresses to.
    pub decompressed_size: u32,
    /// Size of the compressed stream as recorded by the packer.
    pub compressed_size: u32,
}

/// True iff `bytes` starts a ShadeLz stream: at least 12 bytes long and
/// carrying the magic. This is the sniff callers run on raw WAD entries.
pub fn is_compressed(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && bytes[..4] == SHADELZ_MAGIC
}

/// Parse and validate the stream header.
///
/// A magic mismatch is detected from the first 4 bytes alone; the size
/// fields are not touched in that case.
pub fn parse_header(bytes: &[u8]) -> Result<StreamHeader, ShadeLzError> {
    let mut r = ByteReader::new(bytes);
    let found = r.array::<4>("magic")?;
    if found != SHADELZ_MAGIC {
        return Err(ShadeLzError::Magic { found });
    }
    let decompressed_size = r.u32("decompressed_size")?;
    let compressed_size = r.u32("compressed_size")?;
    Ok(StreamHeader {
        decompressed_size,
        compressed_size,
    })
}

// ---------------------------------------------------------------------------
// Decompression
// ---------------------------------------------------------------------------

/// Decompress a complete ShadeLz stream (header + payload).
///
/// The result is exactly `decompressed_size` bytes long; anything short is
/// surfaced as [`ShadeLzError::Truncated`], never returned silently.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, ShadeLzError> {
    let header = parse_header(bytes)?;
    if header.compressed_size as usize != bytes.len() {
        log::debug!(
            "ShadeLz compressed_size field says {}, buffer is {} bytes",
            header.compressed_size,
            bytes.len()
        );
    }
    decode_payload(&bytes[HEADER_LEN..], header.decompressed_size as usize)
}

/// Run the instruction loop over a headerless payload, targeting `declared`
/// output bytes.
pub fn decode_payload(input: &[u8], declared: usize) -> Result<Vec<u8>, ShadeLzError> {
    let mut out = Vec::with_capacity(declared);
    let mut history = CircularHistory::new();
    let mut pos = 0usize;
    // Persists across match-continue instructions.
    let mut previous_displacement = 0usize;

    while out.len() < declared && pos < input.len() {
        let flag = input[pos];
        pos += 1;

        // Dispatch order is significant: the bit patterns overlap.
        if flag & 0x80 == 0x80 {
            // Match start.
            let length = (((flag >> 5) & 0x3) as usize) + 4;
            let Some(&low) = input.get(pos) else { break };
            pos += 1;
            let displacement = (((flag & 0x1F) as usize) << 8) | low as usize;
            previous_displacement = displacement;
            copy_match(&mut history, displacement, length, declared, &mut out)?;
        } else if flag & 0x60 == 0x60 {
            // Match continue: same displacement as the previous match.
            let length = (flag & 0x1F) as usize;
            copy_match(&mut history, previous_displacement, length, declared, &mut out)?;
        } else if flag & 0x40 == 0x40 {
            // RLE run.
            let length = if flag & 0x10 == 0 {
                ((flag & 0x0F) as usize) + 4
            } else {
                let Some(&low) = input.get(pos) else { break };
                pos += 1;
                (((flag & 0x0F) as usize) << 8) + low as usize + 4
            };
            let Some(&value) = input.get(pos) else { break };
            pos += 1;

            let room = declared - out.len();
            let take = length.min(room);
            for _ in 0..take {
                out.push(value);
                history.push(value);
            }
            if length > room {
                return Err(ShadeLzError::Overrun {
                    declared,
                    excess: length - room,
                });
            }
        } else {
            // Raw literal run.
            let length = if flag & 0x20 == 0 {
                (flag & 0x1F) as usize
            } else {
                let Some(&low) = input.get(pos) else { break };
                pos += 1;
                (((flag & 0x1F) as usize) << 8) + low as usize
            };

            let room = declared - out.len();
            let clamped = length.min(room);
            // If the input runs short the loop exits and Truncated fires.
            let take = clamped.min(input.len() - pos);
            for _ in 0..take {
                let byte = input[pos];
                pos += 1;
                out.push(byte);
                history.push(byte);
            }
            if length > room {
                return Err(ShadeLzError::Overrun {
                    declared,
                    excess: length - room,
                });
            }
        }
    }

    if out.len() < declared {
        return Err(ShadeLzError::Truncated {
            declared,
            decoded: out.len(),
        });
    }
    Ok(out)
}

/// Copy a back-reference, clamped at the declared output size.
fn copy_match(
    history: &mut CircularHistory,
    displacement: usize,
    length: usize,
    declared: usize,
    out: &mut Vec<u8>,
) -> Result<(), ShadeLzError> {
    let room = declared - out.len();
    let take = length.min(room);
    history.copy(displacement, take, out);
    if length > room {
        return Err(ShadeLzError::Overrun {
            declared,
            excess: length - room,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
