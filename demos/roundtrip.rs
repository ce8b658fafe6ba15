/// Build an archive, read it back, then rebuild it from the opened copy
///
/// Run with: cargo run --example roundtrip [existing.psarc]
/// Set RUST_LOG=psarc_rs=debug to see the parse and build steps.
use anyhow::{Context, Result};
use psarc_rs::{ArchiveBuilder, ArchiveReader, BuildOptions};
use std::fs::File;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== psarc-rs Roundtrip Example ===\n");

    let source = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            println!("1. Creating archive...");
            create_archive("example_roundtrip.psarc")?;
            "example_roundtrip.psarc".to_string()
        }
    };

    println!("\n2. Reading {}...", source);
    let mut reader =
        ArchiveReader::open(&source).with_context(|| format!("failed to open {}", source))?;
    println!(
        "   Version {}, {} compression, block size {}, {} entries",
        reader.header().version,
        reader.compression(),
        reader.block_size(),
        reader.entry_count()
    );

    let paths: Vec<String> = reader.paths().map(str::to_string).collect();
    for path in &paths {
        let data = reader
            .open_path(path)?
            .with_context(|| format!("{} is listed but has no entry", path))?;
        println!("     - {} ({} bytes)", path, data.len());
    }

    println!("\n3. Rebuilding...");
    let mut builder = ArchiveBuilder::from_archive(&mut reader)?;
    builder.add_file("roundtrip/added.txt", b"Added by the roundtrip example.");
    builder.build(
        File::create("example_rebuilt.psarc")?,
        &BuildOptions::default(),
    )?;

    let rebuilt = ArchiveReader::open("example_rebuilt.psarc")?;
    println!(
        "   ✓ example_rebuilt.psarc: {} entries, {} paths",
        rebuilt.entry_count(),
        rebuilt.manifest().len()
    );

    println!("\n✓ Example complete!");
    Ok(())
}

fn create_archive(path: &str) -> Result<()> {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(
        "songs/arr/lead.json",
        br#"{"arrangement": "Lead", "tuning": [0, 0, 0, 0, 0, 0]}"#,
    );
    builder.add_file("songs/bin/generic/lead.sng", &[0x5A; 2048]);
    builder.add_file("gfxassets/album_art/cover_64.dds", b"DDS placeholder");

    builder.build(File::create(path)?, &BuildOptions::default())?;
    println!("   ✓ Archive created: {}", path);
    Ok(())
}
