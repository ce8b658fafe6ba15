use crate::archive::block_table::BlockSizeTable;
use crate::archive::cipher;
use crate::archive::codec::{self, BlockDecoder};
use crate::archive::format::{CompressionType, FileEntry, FileHeader, HEADER_SIZE, MAX_FILE_SIZE};
use crate::archive::hash::PathHash;
use crate::error::{PsarcError, Result};
use crate::manifest::Manifest;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Archive reader with O(1) lookup by path hash
///
/// Owns the backing stream. Opening a file seeks that stream, so every
/// `open_*` call takes `&mut self`; share a reader between threads only
/// behind a lock.
pub struct ArchiveReader<R> {
    stream: R,
    stream_len: u64,
    header: FileHeader,
    entries: Vec<FileEntry>,
    index: HashMap<PathHash, usize>,
    block_table: BlockSizeTable,
    manifest: Manifest,
}

impl ArchiveReader<File> {
    /// Open an archive file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Parse an archive from a stream
    ///
    /// A stream shorter than the header yields an empty archive.
    pub fn from_reader(mut stream: R) -> Result<Self> {
        let stream_len = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;

        if stream_len < HEADER_SIZE as u64 {
            debug!("Stream of {} bytes is shorter than a header, treating as empty", stream_len);
            return Ok(Self {
                stream,
                stream_len,
                header: FileHeader::new(),
                entries: Vec::new(),
                index: HashMap::new(),
                block_table: BlockSizeTable::default(),
                manifest: Manifest::default(),
            });
        }

        // Read header
        let header = FileHeader::read_from(&mut stream)?;
        header.validate()?;

        if header.toc.size as u64 > stream_len {
            return Err(PsarcError::InvalidFormat(format!(
                "Table of contents ({} bytes) is larger than the archive ({} bytes)",
                header.toc.size, stream_len
            )));
        }

        debug!(
            "PSARC {} ({}), {} entries, block size {}, flags {:?}",
            header.version,
            header.compression,
            header.toc.entry_count,
            header.block_size,
            header.flags
        );

        // Read all entries
        let count = header.toc.entry_count as usize;
        let mut entries: Vec<FileEntry> = Vec::with_capacity(count);
        let mut index = HashMap::with_capacity(count);
        let mut raw = Vec::new();
        if count > 0 {
            raw.resize(header.toc.entry_size as usize, 0);
        }

        for _ in 0..count {
            stream
                .read_exact(&mut raw)
                .map_err(|e| truncated(e, "file entry table"))?;
            let entry = FileEntry::read_from(&raw[..])?;

            match index.get(&entry.hash) {
                Some(&position) => entries[position] = entry,
                None => {
                    index.insert(entry.hash, entries.len());
                    entries.push(entry);
                }
            }
        }

        // Read the block size table in one go
        let mut table = vec![0u8; header.block_table_len()?];
        stream
            .read_exact(&mut table)
            .map_err(|e| truncated(e, "block size table"))?;
        let block_table = BlockSizeTable::from_bytes(table, header.block_size);

        let case_insensitive = header.is_case_insensitive();
        let mut reader = Self {
            stream,
            stream_len,
            header,
            entries,
            index,
            block_table,
            manifest: Manifest::new(case_insensitive),
        };
        reader.load_manifest()?;

        Ok(reader)
    }

    fn load_manifest(&mut self) -> Result<()> {
        let Some(entry) = self.entry(&PathHash::MANIFEST).copied() else {
            debug!("Archive has no manifest entry");
            return Ok(());
        };

        match self.open_entry(&entry) {
            Ok(blob) => {
                self.manifest = Manifest::parse(&blob, self.header.is_case_insensitive());
                debug!("Manifest lists {} paths", self.manifest.len());
                Ok(())
            }
            Err(PsarcError::CodecUnavailable(reason)) => {
                warn!("Manifest could not be read, paths are unavailable: {}", reason);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Get archive header information
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn compression(&self) -> CompressionType {
        self.header.compression
    }

    pub fn block_size(&self) -> u32 {
        self.header.block_size
    }

    pub fn block_table(&self) -> &BlockSizeTable {
        &self.block_table
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.header.is_case_insensitive()
    }

    /// Get number of entries in archive, manifest included
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All entries in table order
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Get entry information without reading data
    pub fn entry(&self, hash: &PathHash) -> Option<&FileEntry> {
        self.index.get(hash).map(|&position| &self.entries[position])
    }

    pub fn contains_hash(&self, hash: &PathHash) -> bool {
        self.index.contains_key(hash)
    }

    /// Check if a path resolves to an entry
    pub fn contains(&self, path: &str) -> bool {
        self.contains_hash(&self.hash_path(path))
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// List all paths named by the manifest
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.manifest.paths()
    }

    /// Hash for a path; unknown paths hash the literal string
    pub fn hash_path(&self, path: &str) -> PathHash {
        self.manifest.hash_path(path)
    }

    /// Map every known hash back to its manifest path
    pub fn reverse_paths(&self) -> HashMap<PathHash, String> {
        self.manifest.reverse_paths()
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> R {
        self.stream
    }

    /// Read a file by hash; `None` if the archive has no such entry
    pub fn open_hash(&mut self, hash: &PathHash) -> Result<Option<Vec<u8>>> {
        match self.entry(hash).copied() {
            Some(entry) => self.open_entry(&entry).map(Some),
            None => {
                trace!("No entry for hash {}", hash);
                Ok(None)
            }
        }
    }

    /// Read a file by path; `None` if the path does not resolve to an entry
    pub fn open_path(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        let hash = self.hash_path(path);
        self.open_hash(&hash)
    }

    /// Read and decompress one entry
    pub fn open_entry(&mut self, entry: &FileEntry) -> Result<Vec<u8>> {
        if entry.decompressed_size > MAX_FILE_SIZE {
            return Err(PsarcError::Unsupported(format!(
                "File {} is {} bytes, larger than the {} byte limit",
                entry.hash, entry.decompressed_size, MAX_FILE_SIZE
            )));
        }

        let size = entry.decompressed_size as usize;
        let block_size = self.header.block_size as usize;
        let compression = self.header.compression;
        let encrypted = self.header.is_encrypted();

        trace!(
            "Opening {} ({} bytes at {:#x}, first block {})",
            entry.hash,
            size,
            entry.offset,
            entry.block_index
        );

        // Grown per block; the declared size is untrusted
        let mut output = Vec::new();
        if size == 0 {
            return Ok(output);
        }

        self.stream.seek(SeekFrom::Start(entry.offset))?;

        let mut block = Vec::new();
        let mut decoder: Option<Box<dyn BlockDecoder>> = None;
        let mut block_index = entry.block_index;
        let mut position = entry.offset;

        while output.len() < size {
            let remaining = size - output.len();

            // Read the next block; 0 means a full, uncompressed block
            let declared = self.block_table.get(block_index)?;
            let block_len = if declared == 0 { block_size } else { declared as usize };
            let truncated_block = || {
                PsarcError::DecompressionFailed(format!(
                    "Block {} of {} is truncated (expected {} bytes)",
                    block_index, entry.hash, block_len
                ))
            };
            if position.saturating_add(block_len as u64) > self.stream_len {
                return Err(truncated_block());
            }
            block.resize(block_len, 0);
            self.stream.read_exact(&mut block).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => truncated_block(),
                _ => PsarcError::Io(e),
            })?;
            position += block_len as u64;

            let mut chunk_len = block_len;
            if encrypted {
                let material = self.block_table.cipher_material().ok_or_else(|| {
                    PsarcError::DecryptionFailed(
                        "Block size table is too short to hold key material".to_string(),
                    )
                })?;
                chunk_len = cipher::decrypt_block(&mut block, material)?;
            }
            let chunk = &block[..chunk_len];

            // A block exactly as long as what is left is stored as-is
            if chunk_len == remaining || declared == 0 {
                let n = chunk_len.min(remaining);
                trace!("Block {}: {} literal bytes", block_index, n);
                output.extend_from_slice(&chunk[..n]);
                block_index = next_block(block_index)?;
                continue;
            }

            let mut codec = match decoder.take() {
                Some(codec) => codec,
                None => codec::decoder_for(compression)?,
            };
            // Block size and file size are both untrusted; reserve no more
            // than the chunk itself can expand to
            let filled = output.len();
            let expected = match codec.decoded_len_bound(chunk) {
                Some(bound) => remaining.min(block_size).min(bound),
                None => remaining.min(block_size),
            };
            output.resize(filled + expected, 0);
            let produced = codec
                .decode_block(chunk, &mut output[filled..filled + expected])?
                .min(expected);
            decoder = Some(codec);

            if produced == 0 {
                return Err(PsarcError::DecompressionFailed(format!(
                    "Block {} of {} decoded to nothing",
                    block_index, entry.hash
                )));
            }

            trace!("Block {}: {} -> {} bytes", block_index, chunk_len, produced);
            output.truncate(filled + produced);
            block_index = next_block(block_index)?;
        }

        Ok(output)
    }
}

fn next_block(index: u32) -> Result<u32> {
    index
        .checked_add(1)
        .ok_or_else(|| PsarcError::InvalidFormat("Block index overflow".to_string()))
}

fn truncated(err: io::Error, what: &str) -> PsarcError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => PsarcError::InvalidFormat(format!("Truncated {}", what)),
        _ => PsarcError::Io(err),
    }
}
