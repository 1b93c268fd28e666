// WAD parsing and extraction.

use std::fs;
use std::path::Path;

use crate::bytes::ByteReader;

use super::format::{DirChild, DirEntry, FileEntry, WadArchive, WadError, WAD_MAGIC};

/// Parse a WAD archive from an in-memory buffer.
///
/// Returns the archive together with the base offset of the data region
/// (the number of header bytes consumed); every `FileEntry::offset` is
/// relative to it. A malformed header is fatal — no partial archive is
/// ever returned.
pub fn read(buffer: &[u8]) -> Result<(WadArchive, usize), WadError> {
    let mut r = ByteReader::new(buffer);

    let found = r.array::<4>("magic")?;
    if found != WAD_MAGIC {
        return Err(WadError::Magic { found });
    }

    let version_major = r.u32("version_major")?;
    let version_minor = r.u32("version_minor")?;

    let extra_header = r.prefixed_bytes("extra_header")?.to_vec();

    let file_count = r.u32("file_count")? as usize;
    let mut files = Vec::with_capacity(file_count);
    for _ in 0..file_count {
        let path = read_string(&mut r, "file_path")?;
        let size = r.u64("file_size")?;
        let offset = r.u64("file_offset")?;
        files.push(FileEntry { path, size, offset });
    }

    let dir_count = r.u32("dir_count")? as usize;
    let mut dirs = Vec::with_capacity(dir_count);
    for _ in 0..dir_count {
        let path = read_string(&mut r, "dir_path")?;
        let child_count = r.u32("dir_child_count")? as usize;
        let mut children = Vec::with_capacity(child_count);
        for _ in 0..child_count {
            let name = read_string(&mut r, "dir_child_name")?;
            let kind = r.u8("dir_child_kind")?;
            children.push(DirChild { name, kind });
        }
        dirs.push(DirEntry { path, children });
    }

    let base_offset = r.position();
    log::debug!(
        "parsed WAD v{version_major}.{version_minor}: {} files, {} dirs, \
         data region at {base_offset:#x}",
        files.len(),
        dirs.len()
    );

    Ok((
        WadArchive {
            version_major,
            version_minor,
            extra_header,
            files,
            dirs,
        },
        base_offset,
    ))
}

fn read_string(r: &mut ByteReader<'_>, field: &'static str) -> Result<String, WadError> {
    let offset = r.position();
    let raw = r.prefixed_bytes(field)?;
    String::from_utf8(raw.to_vec()).map_err(|_| WadError::PathEncoding { offset })
}

/// Slice one entry's payload out of the archive buffer.
pub fn entry_bytes<'a>(
    archive: &WadArchive,
    buffer: &'a [u8],
    base_offset: usize,
    path: &str,
) -> Result<&'a [u8], WadError> {
    let entry = archive.entry(path).ok_or_else(|| WadError::NoSuchEntry {
        path: path.to_string(),
    })?;
    slice_entry(entry, buffer, base_offset)
}

fn slice_entry<'a>(
    entry: &FileEntry,
    buffer: &'a [u8],
    base_offset: usize,
) -> Result<&'a [u8], WadError> {
    let start = base_offset + entry.offset as usize;
    let end = start + entry.size as usize;
    if end > buffer.len() || start > end {
        return Err(WadError::EntryOutOfBounds {
            path: entry.path.clone(),
            start,
            end,
            buffer_len: buffer.len(),
        });
    }
    Ok(&buffer[start..end])
}

/// Write every entry to `out_dir/<entry path>`, creating parent directories.
///
/// Entry paths always use forward slashes; they are mapped through path
/// components so extraction behaves the same on every host OS.
pub fn extract_all(
    archive: &WadArchive,
    buffer: &[u8],
    base_offset: usize,
    out_dir: &Path,
) -> Result<(), WadError> {
    for entry in &archive.files {
        let data = slice_entry(entry, buffer, base_offset)?;
        let mut dest = out_dir.to_path_buf();
        for component in entry.path.split('/') {
            dest.push(component);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, data)?;
    }
    Ok(())
}
