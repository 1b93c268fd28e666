// Extraction pipeline: WAD entry -> ShadeLz sniff/decompress -> GXT decode.
//
// Each stage is a pure transformation owned by its own module; this file
// only wires them together and folds their errors into one enum. Callers
// that want an image file hand the RGBA buffer to whatever encoder they
// use — nothing here writes image formats.

use thiserror::Error;

use crate::gxt::{self, DecodedImage, GxtError, GxtFile};
use crate::shadelz::{self, ShadeLzError};
use crate::wad::{self, WadArchive, WadError};

// ---------------------------------------------------------------------------
// Combined error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("archive error: {0}")]
    Wad(#[from] WadError),
    #[error("decompression error: {0}")]
    ShadeLz(#[from] ShadeLzError),
    #[error("texture error: {0}")]
    Gxt(#[from] GxtError),
}

// ---------------------------------------------------------------------------
// Entry extraction
// ---------------------------------------------------------------------------

/// Slice an entry out of the archive buffer and transparently decompress it
/// when it carries the ShadeLz magic. Uncompressed entries are returned
/// as-is.
pub fn read_entry(
    archive: &WadArchive,
    buffer: &[u8],
    base_offset: usize,
    path: &str,
) -> Result<Vec<u8>, PipelineError> {
    let raw = wad::entry_bytes(archive, buffer, base_offset, path)?;
    if shadelz::is_compressed(raw) {
        log::debug!("entry `{path}` is ShadeLz-compressed, decompressing");
        Ok(shadelz::decompress(raw)?)
    } else {
        Ok(raw.to_vec())
    }
}

/// Decode every texture in a (possibly compressed) GXT entry.
///
/// The returned vector has one slot per texture; unsupported formats fail
/// in their own slot without aborting siblings, mirroring `gxt::decode_all`.
pub fn decode_entry_textures(
    archive: &WadArchive,
    buffer: &[u8],
    base_offset: usize,
    path: &str,
) -> Result<Vec<Result<DecodedImage, GxtError>>, PipelineError> {
    let bytes = read_entry(archive, buffer, base_offset, path)?;
    let file = GxtFile::parse(&bytes)?;
    Ok(gxt::decode_all(&bytes, &file))
}
