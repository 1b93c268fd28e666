//! Shadekit: reverse-engineered asset formats for a Shade-engine visual
//! novel, built for modding toolchains that extract, inspect and repack
//! game data.
//!
//! The crate provides:
//! - WAD ("AGAR") archive reading, extraction, writing and creation (`wad`)
//! - ShadeLz decompression (`shadelz`)
//! - GXT palette-indexed texture decoding with unswizzling (`gxt`)
//! - Composition helpers tying the three together (`pipeline`)
//!
//! # Quick Start
//!
//! ```no_run
//! use shadekit::{pipeline, shadelz, wad};
//!
//! let buffer = std::fs::read("partition_data.wad").unwrap();
//! let (archive, base) = wad::read(&buffer).unwrap();
//!
//! for entry in &archive.files {
//!     // Transparently handles ShadeLz-compressed entries.
//!     let bytes = pipeline::read_entry(&archive, &buffer, base, &entry.path).unwrap();
//!     println!("{}: {} bytes", entry.path, bytes.len());
//!     assert!(!shadelz::is_compressed(&bytes));
//! }
//! ```
//!
//! All decode paths are pure transformations over in-memory buffers; file
//! I/O happens only in `wad::extract_all` and `wad::create`. Independent
//! archive entries and textures may be processed in parallel (see the
//! `parallel` feature); a single ShadeLz stream is inherently sequential.

pub mod bytes;
pub mod gxt;
pub mod pipeline;
pub mod shadelz;
pub mod wad;

pub use gxt::{DecodedImage, GxtError, GxtFile};
pub use pipeline::PipelineError;
pub use shadelz::ShadeLzError;
pub use wad::{WadArchive, WadError};
