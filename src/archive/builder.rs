use crate::archive::block_table::BlockSizeTable;
use crate::archive::codec;
use crate::archive::format::{
    ArchiveFlags, CompressionType, FileEntry, FileHeader, TocHeader, Version, ENTRY_SIZE,
    HEADER_SIZE, MAX_FILE_SIZE,
};
use crate::archive::hash::{fold_case, normalize_path, PathHash};
use crate::archive::reader::ArchiveReader;
use crate::error::{PsarcError, Result};
use crate::manifest::Manifest;
use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use tracing::{debug, trace, warn};

/// Candidate block sizes, smallest first
const BLOCK_SIZES: [u32; 3] = [256, 65536, 16_777_216];

/// Block size used for items larger than every candidate
const MAX_BLOCK_SIZE: u32 = 16_777_216;

/// Settings for serializing an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub version: Version,
    pub compression: CompressionType,
    pub flags: ArchiveFlags,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            version: Version::default(),
            compression: CompressionType::Zlib,
            flags: ArchiveFlags::CASE_INSENSITIVE_PATHS,
        }
    }
}

/// One file queued for the next build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderFile {
    pub hash: PathHash,
    pub path: Option<String>,
    pub data: Vec<u8>,
    /// The hash was supplied by the caller rather than derived from `path`
    pub explicit_hash: bool,
}

/// Editable file set that serializes to a new archive
///
/// Files keep insertion order. Replacing a file keeps its position.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    files: Vec<BuilderFile>,
    case_insensitive: bool,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    /// Create an empty builder hashing paths case-insensitively
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            case_insensitive: true,
        }
    }

    /// Seed a builder with every file of an opened archive
    ///
    /// Each entry is decompressed and paired with its manifest path, if any.
    /// The manifest entry itself is regenerated on build.
    pub fn from_archive<R: Read + Seek>(reader: &mut ArchiveReader<R>) -> Result<Self> {
        let paths = reader.reverse_paths();
        let entries: Vec<FileEntry> = reader
            .entries()
            .iter()
            .filter(|entry| !entry.is_manifest())
            .copied()
            .collect();

        let mut builder = Self {
            files: Vec::with_capacity(entries.len()),
            case_insensitive: reader.is_case_insensitive(),
        };

        for entry in entries {
            let data = reader.open_entry(&entry)?;
            builder.files.push(BuilderFile {
                hash: entry.hash,
                path: paths.get(&entry.hash).cloned(),
                data,
                explicit_hash: false,
            });
        }

        debug!("Seeded builder with {} files", builder.files.len());
        Ok(builder)
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Add a file by path, replacing any file with the same hash
    pub fn add_file(&mut self, path: &str, data: &[u8]) -> PathHash {
        let normalized = normalize_path(path);
        let hash = PathHash::from_path(&normalized, self.case_insensitive);
        self.upsert(hash, Some(normalized), data, false);
        hash
    }

    /// Add a file by hash
    ///
    /// The hash is written as given, even when a path is supplied; the path
    /// only lands in the manifest. Without a path, a file already stored
    /// under the same hash keeps its path.
    pub fn add_file_with_hash(&mut self, hash: PathHash, path: Option<&str>, data: &[u8]) {
        self.upsert(hash, path.map(normalize_path), data, true);
    }

    fn upsert(&mut self, hash: PathHash, path: Option<String>, data: &[u8], explicit_hash: bool) {
        match self.files.iter_mut().find(|file| file.hash == hash) {
            Some(existing) => {
                trace!("Replacing {}", hash);
                existing.data = data.to_vec();
                if path.is_some() {
                    existing.path = path;
                    existing.explicit_hash = explicit_hash;
                }
            }
            None => self.files.push(BuilderFile {
                hash,
                path,
                data: data.to_vec(),
                explicit_hash,
            }),
        }
    }

    /// Remove files stored under this path; true if anything was removed
    pub fn delete_file(&mut self, path: &str) -> bool {
        let key = fold_case(&normalize_path(path), self.case_insensitive);
        let hash = PathHash::from_data(key.as_bytes());
        let case_insensitive = self.case_insensitive;

        let before = self.files.len();
        self.files.retain(|file| {
            let same_path = file
                .path
                .as_deref()
                .is_some_and(|p| fold_case(p, case_insensitive) == key);
            !(same_path || file.hash == hash)
        });
        before != self.files.len()
    }

    /// Remove the file stored under this hash; true if it existed
    pub fn delete_hash(&mut self, hash: &PathHash) -> bool {
        let before = self.files.len();
        self.files.retain(|file| file.hash != *hash);
        before != self.files.len()
    }

    pub fn files(&self) -> &[BuilderFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains_hash(&self, hash: &PathHash) -> bool {
        self.files.iter().any(|file| file.hash == *hash)
    }

    /// Serialize the file set as a new archive
    ///
    /// The codec and file sizes are validated before anything is written.
    /// A failure after that point can leave `output` partially written.
    pub fn build<W: Write>(&self, mut output: W, options: &BuildOptions) -> Result<()> {
        codec::ensure_buildable(options.compression)?;

        if let Some(file) = self
            .files
            .iter()
            .find(|file| file.data.len() as u64 > MAX_FILE_SIZE)
        {
            return Err(PsarcError::Unsupported(format!(
                "File {} is {} bytes, larger than the {} byte limit",
                file.hash,
                file.data.len(),
                MAX_FILE_SIZE
            )));
        }

        let mut flags = options.flags;
        let dropped = flags - ArchiveFlags::CASE_INSENSITIVE_PATHS;
        if !dropped.is_empty() {
            warn!("Dropping unsupported archive flags {:?}", dropped);
            flags &= ArchiveFlags::CASE_INSENSITIVE_PATHS;
        }
        let case_insensitive = flags.contains(ArchiveFlags::CASE_INSENSITIVE_PATHS);

        // Files keyed by their path are rehashed so the manifest matches the
        // output flags; caller-supplied hashes are kept
        let mut manifest = Manifest::new(case_insensitive);
        let mut items: Vec<(PathHash, &[u8], bool)> = Vec::with_capacity(self.files.len());
        let mut positions: HashMap<PathHash, usize> = HashMap::new();

        for file in &self.files {
            let (hash, has_path) = match &file.path {
                Some(path) if file.explicit_hash => {
                    manifest.insert_with_hash(path, file.hash);
                    (file.hash, true)
                }
                Some(path) => (manifest.insert(path), true),
                None => (file.hash, false),
            };
            match positions.get(&hash) {
                Some(&position) => items[position] = (hash, file.data.as_slice(), has_path),
                None => {
                    positions.insert(hash, items.len());
                    items.push((hash, file.data.as_slice(), has_path));
                }
            }
        }

        let manifest_blob = manifest.to_blob();

        // Manifest first, then hash-only files, then files with a path
        let mut ordered: Vec<(PathHash, &[u8])> = Vec::with_capacity(items.len() + 1);
        ordered.push((PathHash::MANIFEST, manifest_blob.as_slice()));
        ordered.extend(items.iter().filter(|item| !item.2).map(|item| (item.0, item.1)));
        ordered.extend(items.iter().filter(|item| item.2).map(|item| (item.0, item.1)));

        let largest = ordered.iter().map(|(_, data)| data.len()).max().unwrap_or(0);
        let block_size = select_block_size(largest);

        debug!(
            "Building {} entries ({} paths), block size {}, largest item {} bytes",
            ordered.len(),
            manifest.len(),
            block_size,
            largest
        );

        // Compress into an in-memory payload with payload-relative offsets
        let mut table = BlockSizeTable::new(block_size);
        let mut entries = Vec::with_capacity(ordered.len());
        let mut payload = Vec::new();

        for (hash, data) in ordered {
            let block_index = u32::try_from(table.len())
                .map_err(|_| PsarcError::Unsupported("Too many blocks".to_string()))?;
            entries.push(FileEntry {
                hash,
                block_index,
                decompressed_size: data.len() as u64,
                offset: payload.len() as u64,
            });

            for chunk in data.chunks(block_size as usize) {
                let compressed = codec::compress_block(options.compression, chunk)?;
                if compressed.len() < chunk.len() {
                    table.push(compressed.len() as u32)?;
                    payload.extend_from_slice(&compressed);
                } else {
                    // Incompressible; a full block is recorded as 0
                    let recorded = if chunk.len() == block_size as usize {
                        0
                    } else {
                        chunk.len() as u32
                    };
                    table.push(recorded)?;
                    payload.extend_from_slice(chunk);
                }
            }
        }

        let toc_size = HEADER_SIZE + entries.len() * ENTRY_SIZE + table.as_bytes().len();
        let toc_size_u32 = u32::try_from(toc_size).map_err(|_| {
            PsarcError::Unsupported(format!("Table of contents of {} bytes is too large", toc_size))
        })?;

        let header = FileHeader {
            version: options.version,
            compression: options.compression,
            toc: TocHeader {
                size: toc_size_u32,
                entry_size: ENTRY_SIZE as u32,
                entry_count: entries.len() as u32,
            },
            block_size,
            flags,
        };

        // Second pass: shift offsets past the table of contents
        header.write_to(&mut output)?;
        for entry in &mut entries {
            entry.offset += toc_size as u64;
            entry.write_to(&mut output)?;
        }
        output.write_all(table.as_bytes())?;
        output.write_all(&payload)?;
        output.flush()?;

        debug!(
            "Wrote {} bytes ({} blocks)",
            toc_size + payload.len(),
            table.len()
        );
        Ok(())
    }
}

/// Smallest candidate block size that holds the largest item whole
fn select_block_size(largest: usize) -> u32 {
    BLOCK_SIZES
        .iter()
        .copied()
        .find(|&size| largest <= size as usize)
        .unwrap_or(MAX_BLOCK_SIZE)
}
