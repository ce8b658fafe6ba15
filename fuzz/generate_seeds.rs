//! Generate seed corpus for fuzzing

use psarc_rs::{ArchiveBuilder, BuildOptions, PathHash};
use std::fs::{self, File};

fn write_seed(dir: &str, name: &str, builder: &ArchiveBuilder) -> Result<(), Box<dyn std::error::Error>> {
    let path = format!("{}/{}.psarc", dir, name);
    builder.build(File::create(&path)?, &BuildOptions::default())?;
    println!("✓ Generated: {}", path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_archive_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    // Seed 1: Empty archive (manifest only)
    write_seed(corpus_dir, "seed_empty", &ArchiveBuilder::new())?;

    // Seed 2: Single small file
    {
        let mut builder = ArchiveBuilder::new();
        builder.add_file("test.txt", b"Hello, World!");
        write_seed(corpus_dir, "seed_single_small", &builder)?;
    }

    // Seed 3: Multiple files with directories
    {
        let mut builder = ArchiveBuilder::new();
        builder.add_file("songs/arr/lead.json", b"{\"part\": \"lead\"}");
        builder.add_file("songs/arr/bass.json", b"{\"part\": \"bass\"}");
        builder.add_file("gfxassets/album_art/cover_64.dds", &[0x44; 300]);
        write_seed(corpus_dir, "seed_multi", &builder)?;
    }

    // Seed 4: Compressible data with a 64 KiB block size
    {
        let mut builder = ArchiveBuilder::new();
        builder.add_file("large.txt", &b"This is test data for compression. ".repeat(1000));
        write_seed(corpus_dir, "seed_large", &builder)?;
    }

    // Seed 5: Incompressible data stored as literal blocks
    {
        let mut builder = ArchiveBuilder::new();
        let mut state = 0x9E37_79B9u32;
        let binary: Vec<u8> = (0..256)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect();
        builder.add_file("binary.dat", &binary);
        write_seed(corpus_dir, "seed_binary", &builder)?;
    }

    // Seed 6: Entry without a manifest path
    {
        let mut builder = ArchiveBuilder::new();
        builder.add_file_with_hash(PathHash::from_data(b"anonymous"), None, b"hash only");
        write_seed(corpus_dir, "seed_hash_only", &builder)?;
    }

    println!("\nSeed corpus generated successfully!");
    Ok(())
}
