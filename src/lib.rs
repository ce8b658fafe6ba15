//! psarc-rs: reader and builder for PSARC archives
//!
//! PSARC is a block-compressed container addressed by 128-bit MD5 path
//! hashes. This library provides:
//! - Parsing of the big-endian header, entry table and block-size table
//! - Per-block decoding for store, zlib, LZMA, Zstandard and Oodle
//! - Path resolution through the archive's embedded manifest
//! - Building new zlib archives, optionally seeded from an existing one
//!
//! # Example
//!
//! ```no_run
//! use psarc_rs::{ArchiveBuilder, ArchiveReader, BuildOptions};
//! use std::fs::File;
//!
//! // Create an archive
//! let mut builder = ArchiveBuilder::new();
//! builder.add_file("songs/arr/lead.json", b"{}");
//! builder.build(File::create("example.psarc")?, &BuildOptions::default())?;
//!
//! // Read from archive
//! let mut reader = ArchiveReader::open("example.psarc")?;
//! let data = reader.open_path("songs/arr/lead.json")?;
//! assert_eq!(data.as_deref(), Some(&b"{}"[..]));
//! # Ok::<(), psarc_rs::PsarcError>(())
//! ```

pub mod archive;
pub mod error;
pub mod manifest;

// Re-export commonly used types
pub use archive::{
    ArchiveBuilder, ArchiveFlags, ArchiveReader, BlockSizeTable, BuildOptions, BuilderFile,
    CompressionType, FileEntry, FileHeader, PathHash, TocHeader, Version, HEADER_SIZE,
    MAGIC_NUMBER,
};
pub use error::{ErrorCategory, PsarcError, Result};
pub use manifest::Manifest;
