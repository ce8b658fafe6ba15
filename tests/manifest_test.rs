//! Manifest and path hashing tests

use psarc_rs::{ArchiveBuilder, ArchiveFlags, ArchiveReader, BuildOptions, Manifest, PathHash};
use std::io::Cursor;

fn build_with(builder: &ArchiveBuilder, flags: ArchiveFlags) -> ArchiveReader<Cursor<Vec<u8>>> {
    let options = BuildOptions {
        flags,
        ..BuildOptions::default()
    };
    let mut out = Vec::new();
    builder.build(&mut out, &options).unwrap();
    ArchiveReader::from_reader(Cursor::new(out)).unwrap()
}

#[test]
fn test_hash_stability() {
    // Case-insensitive hashing folds to upper case first
    assert_eq!(
        PathHash::from_path("A/B.txt", true),
        PathHash::from_path("a/b.txt", true)
    );
    assert_eq!(PathHash::from_path("a/b.txt", true), PathHash::from_data(b"A/B.TXT"));

    // Case-sensitive hashing does not
    assert_ne!(
        PathHash::from_path("A/B.txt", false),
        PathHash::from_path("a/b.txt", false)
    );

    // MD5 of the empty string, not the manifest hash
    let empty = PathHash::from_path("", false);
    assert_eq!(empty.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    assert!(!empty.is_manifest());
}

#[test]
fn test_manifest_roundtrip() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file("a.txt", b"first");
    builder.add_file("sub/b.txt", b"second");

    let mut reader = build_with(&builder, ArchiveFlags::empty());
    let manifest_blob = reader.open_hash(&PathHash::MANIFEST).unwrap().unwrap();
    assert_eq!(manifest_blob, b"a.txt\nsub/b.txt");

    let reverse = reader.reverse_paths();
    assert_eq!(reverse.len(), 2);
    assert_eq!(reverse[&PathHash::from_data(b"a.txt")], "a.txt");
    assert_eq!(reverse[&PathHash::from_data(b"sub/b.txt")], "sub/b.txt");
}

#[test]
fn test_case_insensitive_manifest_is_upper_case() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file("a.txt", b"first");
    builder.add_file("sub/b.txt", b"second");

    let mut reader = build_with(&builder, ArchiveFlags::CASE_INSENSITIVE_PATHS);
    let manifest_blob = reader.open_hash(&PathHash::MANIFEST).unwrap().unwrap();
    assert_eq!(manifest_blob, b"A.TXT\nSUB/B.TXT");

    let reverse = reader.reverse_paths();
    assert_eq!(reverse[&PathHash::from_data(b"SUB/B.TXT")], "SUB/B.TXT");
    assert_eq!(reader.open_path("Sub/B.Txt").unwrap(), Some(b"second".to_vec()));
}

#[test]
fn test_case_sensitive_lookup_misses_other_casing() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file("Songs/Lead.json", b"{}");

    let mut reader = build_with(&builder, ArchiveFlags::empty());
    assert!(!reader.is_case_insensitive());
    assert_eq!(reader.open_path("Songs/Lead.json").unwrap(), Some(b"{}".to_vec()));
    assert_eq!(reader.open_path("songs/lead.json").unwrap(), None);
}

#[test]
fn test_manifest_parse_matches_reader() {
    let mut builder = ArchiveBuilder::new();
    for path in ["gfx/one.dds", "gfx/two.dds", "audio/three.wem"] {
        builder.add_file(path, path.as_bytes());
    }
    let mut reader = build_with(&builder, ArchiveFlags::CASE_INSENSITIVE_PATHS);

    let blob = reader.open_hash(&PathHash::MANIFEST).unwrap().unwrap();
    let parsed = Manifest::parse(&blob, true);
    assert_eq!(parsed.reverse_paths(), reader.reverse_paths());

    for path in reader.paths().map(str::to_string).collect::<Vec<_>>() {
        let hash = reader.hash_path(&path);
        assert!(reader.entry(&hash).is_some(), "{} has no entry", path);
    }
}

#[test]
fn test_hex_roundtrip() {
    let hash = PathHash::from_path("songs/arr/lead.json", true);
    let hex = hash.to_hex();
    assert_eq!(hex.len(), 32);
    assert_eq!(PathHash::from_hex(&hex).unwrap(), hash);
    assert_eq!(hash.to_string(), hex);
    assert!(PathHash::from_hex("not hex").is_err());
}
