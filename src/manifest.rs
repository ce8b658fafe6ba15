//! Path manifest for PSARC archives
//!
//! # Manifest Scope
//!
//! Entries are addressed by [`PathHash`] only. The manifest is the archive's
//! own list of paths, stored as the content of the zero-hash entry:
//!
//! ```text
//! songs/arr/lead.json
//! songs/bin/generic/lead.sng
//! gfxassets/album_art/cover_256.dds
//! ```
//!
//! Lines use forward slashes and are newline separated, in file order, with
//! no trailing newline. A hash with no line in the manifest is legal; its
//! content can only be opened by hash.
//!
//! In case-insensitive archives every path is upper-cased before hashing, and
//! the manifest keys are stored upper-cased as well, so lookups with any
//! casing resolve to the same entry.

use crate::archive::hash::{fold_case, normalize_path, PathHash};
use std::collections::HashMap;

/// Bidirectional path/hash mapping derived from the manifest entry
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    hashes: HashMap<String, PathHash>,
    order: Vec<String>,
    case_insensitive: bool,
}

impl Manifest {
    /// Create an empty manifest with the given case rule
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            hashes: HashMap::new(),
            order: Vec::new(),
            case_insensitive,
        }
    }

    /// Parse the content of the manifest entry
    pub fn parse(blob: &[u8], case_insensitive: bool) -> Self {
        let mut manifest = Self::new(case_insensitive);
        let text = String::from_utf8_lossy(blob);
        for line in text.split('\n').map(str::trim).filter(|line| !line.is_empty()) {
            manifest.insert(line);
        }
        manifest
    }

    /// Serialize paths in insertion order, newline separated
    pub fn to_blob(&self) -> Vec<u8> {
        self.order.join("\n").into_bytes()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Normalized, case-folded form of a path as stored in this manifest
    pub fn key(&self, path: &str) -> String {
        fold_case(&normalize_path(path), self.case_insensitive)
    }

    /// Add a path, returning its hash
    pub fn insert(&mut self, path: &str) -> PathHash {
        let hash = PathHash::from_data(self.key(path).as_bytes());
        self.insert_with_hash(path, hash);
        hash
    }

    /// Add a path addressed by a hash that was not derived from it
    pub fn insert_with_hash(&mut self, path: &str, hash: PathHash) {
        let key = self.key(path);
        if self.hashes.insert(key.clone(), hash).is_none() {
            self.order.push(key);
        }
    }

    /// Hash for a path listed in the manifest
    pub fn get(&self, path: &str) -> Option<PathHash> {
        self.hashes.get(&self.key(path)).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.hashes.contains_key(&self.key(path))
    }

    /// Hash for a path, falling back to hashing the literal path on a miss
    pub fn hash_path(&self, path: &str) -> PathHash {
        self.get(path)
            .unwrap_or_else(|| PathHash::from_path(path, self.case_insensitive))
    }

    /// Paths in manifest order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Invert the mapping into hash -> path
    ///
    /// Built fresh on every call.
    pub fn reverse_paths(&self) -> HashMap<PathHash, String> {
        self.hashes
            .iter()
            .map(|(path, hash)| (*hash, path.clone()))
            .collect()
    }
}
