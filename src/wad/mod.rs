// WAD ("AGAR") archive container.
//
// The game bundles its logical files into a single archive with a
// path-indexed file table and a decorative directory table. This module
// reads archives from in-memory buffers, slices and extracts entries,
// writes archives back out, and creates new ones from directory trees.
//
// # Modules
//
// - `format` — layout constants, in-memory model, error type
// - `read`   — header parsing, entry slicing, extract-all
// - `write`  — header emission, archive writing, create-from-dirs

pub mod format;
pub mod read;
pub mod write;

pub use format::{
    CHILD_DIR, CHILD_FILE, DirChild, DirEntry, FileEntry, WAD_MAGIC, WadArchive, WadError,
};
pub use read::{entry_bytes, extract_all, read};
pub use write::{DEFAULT_VERSION, PayloadSource, create, emit_header, write};
