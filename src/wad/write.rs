// WAD writing and creation from directory trees.
//
// Determinism rules (same as the game's own archives):
//   - paths are normalized to forward slashes
//   - file entries are sorted lexicographically by path bytes
//   - payloads follow the header in table order with no padding, so entry
//     `i`'s offset equals the summed sizes of payloads `0..i-1`

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::format::{
    CHILD_DIR, CHILD_FILE, DirChild, DirEntry, FileEntry, WAD_MAGIC, WadArchive, WadError,
};

// ---------------------------------------------------------------------------
// Payload sources
// ---------------------------------------------------------------------------

/// Supplies payload bytes for each file table entry during writing.
pub trait PayloadSource {
    fn payload(&mut self, entry: &FileEntry) -> Result<Vec<u8>, WadError>;
}

/// Disk-backed source: entry path → physical file. A missing file is fatal.
impl PayloadSource for HashMap<String, PathBuf> {
    fn payload(&mut self, entry: &FileEntry) -> Result<Vec<u8>, WadError> {
        match self.get(&entry.path) {
            Some(physical) => Ok(fs::read(physical)?),
            None => Err(WadError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no source file for entry `{}`", entry.path),
            ))),
        }
    }
}

/// In-memory source, mostly for tests and repack tooling.
impl PayloadSource for HashMap<String, Vec<u8>> {
    fn payload(&mut self, entry: &FileEntry) -> Result<Vec<u8>, WadError> {
        match self.get(&entry.path) {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(WadError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no payload for entry `{}`", entry.path),
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Header emission
// ---------------------------------------------------------------------------

fn write_string<W: Write>(w: &mut W, s: &str) -> std::io::Result<()> {
    w.write_all(&(s.len() as u32).to_le_bytes())?;
    w.write_all(s.as_bytes())
}

/// Serialize the header (magic through the directory table) to `w`.
/// Emission order mirrors `read()` exactly.
pub fn emit_header<W: Write>(archive: &WadArchive, w: &mut W) -> std::io::Result<()> {
    w.write_all(&WAD_MAGIC)?;
    w.write_all(&archive.version_major.to_le_bytes())?;
    w.write_all(&archive.version_minor.to_le_bytes())?;

    w.write_all(&(archive.extra_header.len() as u32).to_le_bytes())?;
    w.write_all(&archive.extra_header)?;

    w.write_all(&(archive.files.len() as u32).to_le_bytes())?;
    for f in &archive.files {
        write_string(w, &f.path)?;
        w.write_all(&f.size.to_le_bytes())?;
        w.write_all(&f.offset.to_le_bytes())?;
    }

    w.write_all(&(archive.dirs.len() as u32).to_le_bytes())?;
    for d in &archive.dirs {
        write_string(w, &d.path)?;
        w.write_all(&(d.children.len() as u32).to_le_bytes())?;
        for c in &d.children {
            write_string(w, &c.name)?;
            w.write_all(&[c.kind])?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Archive writing
// ---------------------------------------------------------------------------

/// Write a complete archive to `out_path`, pulling payload bytes from
/// `source` in file table order.
///
/// Each payload is checked against the table before being appended: its
/// length must match `entry.size` and the running byte count must match
/// `entry.offset`.
pub fn write<S: PayloadSource>(
    archive: &WadArchive,
    out_path: &Path,
    source: &mut S,
) -> Result<(), WadError> {
    let file = File::create(out_path)?;
    let mut w = BufWriter::new(file);

    emit_header(archive, &mut w)?;

    let mut running_offset = 0u64;
    for entry in &archive.files {
        let payload = source.payload(entry)?;
        if payload.len() as u64 != entry.size || running_offset != entry.offset {
            return Err(WadError::PayloadMismatch {
                path: entry.path.clone(),
                offset: entry.offset,
                expected: entry.size,
                actual: payload.len() as u64,
            });
        }
        w.write_all(&payload)?;
        running_offset += entry.size;
    }

    w.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Creation from directory trees
// ---------------------------------------------------------------------------

/// Default version pair stamped on archives this crate creates.
pub const DEFAULT_VERSION: (u32, u32) = (1, 1);

/// Build a WAD from one or more input directories and write it to `out_path`.
///
/// Each directory is walked recursively; files keep their paths relative to
/// the directory root. When the same relative path appears under more than
/// one input directory the first directory wins — silently, so a mod overlay
/// listed before the base game data overrides it.
pub fn create(input_dirs: &[PathBuf], out_path: &Path) -> Result<(), WadError> {
    let mut sources: HashMap<String, PathBuf> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for dir in input_dirs {
        for walked in WalkDir::new(dir).follow_links(false) {
            let walked = walked.map_err(|e| {
                let msg = e.to_string();
                WadError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::other(msg)),
                )
            })?;
            if !walked.file_type().is_file() {
                continue;
            }
            let rel = normalize_rel_path(dir, walked.path())?;
            if sources.contains_key(&rel) {
                log::warn!(
                    "duplicate relative path `{rel}`: keeping the copy from an \
                     earlier input directory"
                );
                continue;
            }
            sources.insert(rel.clone(), walked.path().to_path_buf());
            order.push(rel);
        }
    }

    order.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));

    let mut files = Vec::with_capacity(order.len());
    let mut offset = 0u64;
    for path in &order {
        let size = fs::metadata(&sources[path])?.len();
        files.push(FileEntry {
            path: path.clone(),
            size,
            offset,
        });
        offset += size;
    }

    let dirs = derive_dir_table(&files);
    let archive = WadArchive {
        version_major: DEFAULT_VERSION.0,
        version_minor: DEFAULT_VERSION.1,
        extra_header: Vec::new(),
        files,
        dirs,
    };

    write(&archive, out_path, &mut sources)
}

fn normalize_rel_path(root: &Path, file: &Path) -> Result<String, WadError> {
    let rel = file.strip_prefix(root).map_err(|_| {
        WadError::Io(std::io::Error::other(format!(
            "walked path {} is outside input dir {}",
            file.display(),
            root.display()
        )))
    })?;
    let mut out = String::new();
    for (i, comp) in rel.components().enumerate() {
        if i != 0 {
            out.push('/');
        }
        out.push_str(&comp.as_os_str().to_string_lossy());
    }
    Ok(out)
}

/// Derive the decorative directory table from the file list: one entry per
/// directory (the root is the empty path), each listing its immediate
/// children sorted by name.
pub fn derive_dir_table(files: &[FileEntry]) -> Vec<DirEntry> {
    // dir path -> child name -> kind
    let mut tree: BTreeMap<String, BTreeMap<String, u8>> = BTreeMap::new();
    tree.entry(String::new()).or_default();

    for f in files {
        let components: Vec<&str> = f.path.split('/').collect();
        let mut parent = String::new();
        for (i, comp) in components.iter().enumerate() {
            let is_file = i == components.len() - 1;
            let kind = if is_file { CHILD_FILE } else { CHILD_DIR };
            tree.entry(parent.clone())
                .or_default()
                .insert((*comp).to_string(), kind);
            if !is_file {
                if parent.is_empty() {
                    parent = (*comp).to_string();
                } else {
                    parent = format!("{parent}/{comp}");
                }
                tree.entry(parent.clone()).or_default();
            }
        }
    }

    tree.into_iter()
        .map(|(path, children)| DirEntry {
            path,
            children: children
                .into_iter()
                .map(|(name, kind)| DirChild { name, kind })
                .collect(),
        })
        .collect()
}
