#![no_main]

use libfuzzer_sys::fuzz_target;
use psarc_rs::ArchiveReader;
use std::io::Cursor;

/// Entries claiming more than this are skipped to stay inside the fuzzer's memory limit
const MAX_FUZZ_ENTRY_SIZE: u64 = 64 * 1024 * 1024;

fuzz_target!(|data: &[u8]| {
    // Try to parse - should never panic
    let mut reader = match ArchiveReader::from_reader(Cursor::new(data)) {
        Ok(r) => r,
        Err(_) => return, // Expected for invalid data
    };

    // Try to read each entry - should never panic
    let entries = reader.entries().to_vec();
    for entry in &entries {
        if entry.decompressed_size > MAX_FUZZ_ENTRY_SIZE {
            continue;
        }
        let _ = reader.open_entry(entry);
    }

    // Path resolution - should never panic
    let paths: Vec<String> = reader.paths().map(str::to_string).collect();
    for path in &paths {
        let hash = reader.hash_path(path);
        if reader
            .entry(&hash)
            .is_some_and(|entry| entry.decompressed_size <= MAX_FUZZ_ENTRY_SIZE)
        {
            let _ = reader.open_path(path);
        }
    }

    let _ = reader.entry_count();
    let _ = reader.reverse_paths();
    let _ = reader.contains("");
    let _ = reader.contains("songs/arr/lead.json");
    let _ = reader.contains("..\\..\\etc\\passwd");
});
