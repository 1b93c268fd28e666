// WAD ("AGAR") archive layout constants and in-memory model.
//
// On-disk layout, all integers little-endian, strings u32-length-prefixed
// UTF-8 (field order is load-bearing for interop, never reorder):
//
//   [magic "AGAR" 4]
//   [u32 version_major] [u32 version_minor]
//   [u32 extra_header_size] [extra_header bytes]
//   [u32 file_count]
//     per file: [path] [u64 size] [u64 offset]
//   [u32 dir_count]
//     per dir:  [path] [u32 child_count]
//       per child: [name] [u8 kind]
//   payload data region (entry offsets are relative to its start)

use thiserror::Error;

use crate::bytes::ReadError;

/// WAD header magic, ASCII with no terminator.
pub const WAD_MAGIC: [u8; 4] = *b"AGAR";

/// Child kind tag in the directory table: file.
pub const CHILD_FILE: u8 = 0;
/// Child kind tag in the directory table: subdirectory.
pub const CHILD_DIR: u8 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum WadError {
    /// The first four bytes are not "AGAR".
    #[error("bad WAD magic at offset 0x0: expected \"AGAR\", got {found:02X?}")]
    Magic { found: [u8; 4] },

    /// The buffer ended inside a header field.
    #[error("malformed WAD header: {0}")]
    Header(#[from] ReadError),

    /// A table path is not valid UTF-8.
    #[error("WAD path at offset {offset:#x} is not valid UTF-8")]
    PathEncoding { offset: usize },

    /// An entry's data range lies outside the buffer.
    #[error(
        "entry `{path}` data range {start:#x}..{end:#x} is outside the \
         {buffer_len:#x}-byte buffer"
    )]
    EntryOutOfBounds {
        path: String,
        start: usize,
        end: usize,
        buffer_len: usize,
    },

    /// No file table entry with the requested path.
    #[error("archive has no entry `{path}`")]
    NoSuchEntry { path: String },

    /// A payload handed to the writer disagrees with the file table.
    /// The table is an ordering invariant: entry `i`'s offset must equal
    /// the cumulative size of payloads `0..i-1`, with no padding.
    #[error(
        "payload for `{path}` breaks the file table: expected {expected} bytes \
         at relative offset {offset:#x}, got {actual} bytes"
    )]
    PayloadMismatch {
        path: String,
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// Filesystem failure while extracting or creating.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Archive model
// ---------------------------------------------------------------------------

/// One logical file in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Relative path, forward slashes, case-sensitive, unique.
    pub path: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Payload offset relative to the archive base offset.
    pub offset: u64,
}

/// One child listed under a directory table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirChild {
    pub name: String,
    /// 0 = file, 1 = subdirectory.
    pub kind: u8,
}

/// One directory table entry. The directory table mirrors the file table's
/// tree shape but carries no offsets; extraction never needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: String,
    pub children: Vec<DirChild>,
}

/// Parsed WAD archive. Immutable once constructed; file entries are sorted
/// lexicographically by path bytes when the archive is built from a
/// directory tree, which makes repacking deterministic.
#[derive(Debug, Clone)]
pub struct WadArchive {
    pub version_major: u32,
    pub version_minor: u32,
    pub extra_header: Vec<u8>,
    pub files: Vec<FileEntry>,
    pub dirs: Vec<DirEntry>,
}

impl WadArchive {
    /// Look up a file entry by exact path.
    pub fn entry(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|e| e.path == path)
    }

    /// Total byte length of the serialized header (magic through the end of
    /// the directory table). Equals the base offset of the data region.
    pub fn header_len(&self) -> usize {
        let mut len = 4 + 4 + 4; // magic + version pair
        len += 4 + self.extra_header.len();
        len += 4;
        for f in &self.files {
            len += 4 + f.path.len() + 8 + 8;
        }
        len += 4;
        for d in &self.dirs {
            len += 4 + d.path.len() + 4;
            for c in &d.children {
                len += 4 + c.name.len() + 1;
            }
        }
        len
    }
}
