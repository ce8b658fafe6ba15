//! Integration tests for psarc-rs library

use psarc_rs::{ArchiveBuilder, ArchiveReader, BuildOptions, PathHash};
use std::fs::File;
use std::io::Cursor;
use tempfile::NamedTempFile;

fn build_to_vec(builder: &ArchiveBuilder) -> Vec<u8> {
    let mut out = Vec::new();
    builder.build(&mut out, &BuildOptions::default()).unwrap();
    out
}

#[test]
fn test_basic_archive_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let archive_path = temp_file.path();

    // Create archive
    {
        let mut builder = ArchiveBuilder::new();
        builder.add_file("test.txt", b"Hello, World!");
        builder.add_file("data/nested.txt", b"Nested content");
        let file = File::create(archive_path).unwrap();
        builder.build(file, &BuildOptions::default()).unwrap();
    }

    // Read archive
    {
        let mut reader = ArchiveReader::open(archive_path).unwrap();

        // Manifest entry plus two files
        assert_eq!(reader.entry_count(), 3);

        assert!(reader.contains("test.txt"));
        assert!(reader.contains("data/nested.txt"));

        let content1 = reader.open_path("test.txt").unwrap().unwrap();
        assert_eq!(content1, b"Hello, World!");

        let content2 = reader.open_path("data/nested.txt").unwrap().unwrap();
        assert_eq!(content2, b"Nested content");
    }
}

#[test]
fn test_path_listing_and_case_folding() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file("songs/arr/lead.json", b"{\"part\": \"lead\"}");
    builder.add_file("songs\\bin\\generic\\lead.sng", &[0x11; 64]);

    let mut reader = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();
    assert!(reader.is_case_insensitive());

    let paths: Vec<&str> = reader.paths().collect();
    assert_eq!(paths, vec!["SONGS/ARR/LEAD.JSON", "SONGS/BIN/GENERIC/LEAD.SNG"]);

    // Any casing and either slash resolve to the same entry
    let expected = Some(vec![0x11; 64]);
    assert_eq!(reader.open_path("songs/bin/generic/lead.sng").unwrap(), expected);
    assert_eq!(reader.open_path("SONGS\\BIN\\GENERIC\\LEAD.SNG").unwrap(), expected);
}

#[test]
fn test_open_by_hash() {
    let mut builder = ArchiveBuilder::new();
    let hash = builder.add_file("gfxassets/cover.dds", b"DDS image bytes");

    let mut reader = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();
    assert_eq!(hash, reader.hash_path("gfxassets/cover.dds"));
    assert_eq!(reader.open_hash(&hash).unwrap(), Some(b"DDS image bytes".to_vec()));

    let entry = *reader.entry(&hash).unwrap();
    assert_eq!(entry.decompressed_size, 15);
    assert_eq!(reader.open_entry(&entry).unwrap(), b"DDS image bytes");
}

#[test]
fn test_unknown_lookups_return_none() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file("present.txt", b"here");

    let mut reader = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();
    assert!(!reader.contains("absent.txt"));
    assert_eq!(reader.open_path("absent.txt").unwrap(), None);
    assert_eq!(reader.open_hash(&PathHash::from_data(b"nothing")).unwrap(), None);
}

#[test]
fn test_hash_only_files() {
    let mut builder = ArchiveBuilder::new();
    let raw = PathHash::from_hex("00112233445566778899aabbccddeeff").unwrap();
    builder.add_file_with_hash(raw, None, b"anonymous content");
    builder.add_file("named.txt", b"named content");

    let mut reader = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();
    assert_eq!(reader.paths().collect::<Vec<_>>(), vec!["NAMED.TXT"]);
    assert_eq!(reader.open_hash(&raw).unwrap(), Some(b"anonymous content".to_vec()));
    assert!(!reader.reverse_paths().contains_key(&raw));

    // Hash-only entries precede named ones
    let order: Vec<PathHash> = reader.entries().iter().map(|e| e.hash).collect();
    assert_eq!(order[0], PathHash::MANIFEST);
    assert_eq!(order[1], raw);
}

#[test]
fn test_explicit_hash_with_path_survives_build() {
    let mut builder = ArchiveBuilder::new();
    let custom = PathHash::from_data(b"custom-hash");
    builder.add_file_with_hash(custom, Some("x.txt"), b"payload");
    builder.add_file("y.txt", b"derived");

    let mut reader = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();
    assert_eq!(reader.open_hash(&custom).unwrap(), Some(b"payload".to_vec()));
    assert!(!reader.contains_hash(&PathHash::from_data(b"X.TXT")));
    assert_eq!(reader.paths().collect::<Vec<_>>(), vec!["X.TXT", "Y.TXT"]);
    assert_eq!(reader.open_path("y.txt").unwrap(), Some(b"derived".to_vec()));
}

#[test]
fn test_empty_archive() {
    let builder = ArchiveBuilder::new();
    let mut reader = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();

    assert_eq!(reader.entry_count(), 1);
    assert!(reader.manifest().is_empty());
    assert_eq!(reader.open_hash(&PathHash::MANIFEST).unwrap(), Some(Vec::new()));
}

#[test]
fn test_empty_file() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file("empty.txt", b"");
    builder.add_file("full.txt", b"full");

    let mut reader = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();
    assert_eq!(reader.open_path("empty.txt").unwrap(), Some(Vec::new()));
    assert_eq!(reader.open_path("full.txt").unwrap(), Some(b"full".to_vec()));
}

#[test]
fn test_seeded_rebuild() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file("keep.txt", b"kept");
    builder.add_file("replace.txt", b"old");
    builder.add_file("remove.txt", b"gone");
    let raw = PathHash::from_data(b"raw");
    builder.add_file_with_hash(raw, None, b"hash only");

    let mut original = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();
    let mut seeded = ArchiveBuilder::from_archive(&mut original).unwrap();

    assert_eq!(seeded.len(), 4);
    assert!(seeded.contains_hash(&raw));
    let seeded_raw = seeded.files().iter().find(|f| f.hash == raw).unwrap();
    assert_eq!(seeded_raw.path, None);

    seeded.add_file("replace.txt", b"new");
    seeded.add_file("added/file.txt", b"added");
    assert!(seeded.delete_file("remove.txt"));

    let mut rebuilt = ArchiveReader::from_reader(Cursor::new(build_to_vec(&seeded))).unwrap();
    assert_eq!(rebuilt.entry_count(), 5);
    assert_eq!(rebuilt.open_path("keep.txt").unwrap(), Some(b"kept".to_vec()));
    assert_eq!(rebuilt.open_path("replace.txt").unwrap(), Some(b"new".to_vec()));
    assert_eq!(rebuilt.open_path("added/file.txt").unwrap(), Some(b"added".to_vec()));
    assert_eq!(rebuilt.open_path("remove.txt").unwrap(), None);
    assert_eq!(rebuilt.open_hash(&raw).unwrap(), Some(b"hash only".to_vec()));
}

#[test]
fn test_multi_block_file() {
    // Larger than the biggest block size, so it spans two blocks
    let mut data = Vec::with_capacity(17 * 1024 * 1024);
    for i in 0..17 * 1024 * 1024u32 {
        data.push((i % 251) as u8);
    }

    let mut builder = ArchiveBuilder::new();
    builder.add_file("big.bin", &data);

    let mut reader = ArchiveReader::from_reader(Cursor::new(build_to_vec(&builder))).unwrap();
    assert_eq!(reader.block_size(), 16_777_216);
    assert_eq!(reader.block_table().width(), 3);
    // One block for the manifest, two for the file
    assert_eq!(reader.block_table().len(), 3);
    assert_eq!(reader.open_path("big.bin").unwrap(), Some(data));
}

#[test]
fn test_readers_are_independent() {
    let mut builder = ArchiveBuilder::new();
    for i in 0..8 {
        builder.add_file(&format!("file{}.txt", i), format!("content {}", i).as_bytes());
    }
    let bytes = build_to_vec(&builder);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bytes = bytes.clone();
            std::thread::spawn(move || {
                let mut reader = ArchiveReader::from_reader(Cursor::new(bytes)).unwrap();
                for i in 0..8 {
                    let data = reader.open_path(&format!("file{}.txt", i)).unwrap().unwrap();
                    assert_eq!(data, format!("content {}", i).as_bytes());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
