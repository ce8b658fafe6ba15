use super::BlockDecoder;
use crate::error::{PsarcError, Result};
use libloading::Library;
use std::ffi::{c_void, OsString};
use std::ptr;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Environment variable overriding the Oodle shared library location
pub const OODLE_LIBRARY_ENV: &str = "PSARC_OODLE_LIB";

// OodleLZ_Compressor_Invalid, OodleLZ_Verbosity_Minimal, OodleLZ_Decode_Unthreaded
const COMPRESSOR_INVALID: i32 = -1;
const VERBOSITY_MINIMAL: i32 = 1;
const THREAD_PHASE_UNTHREADED: i32 = 3;

type DecompressFn = unsafe extern "C" fn(
    src: *const u8,
    src_len: isize,
    raw: *mut u8,
    raw_len: isize,
    fuzz_safe: i32,
    check_crc: i32,
    verbosity: i32,
    dec_buf_base: *mut u8,
    dec_buf_size: isize,
    callback: *mut c_void,
    callback_data: *mut c_void,
    decoder_memory: *mut u8,
    decoder_memory_size: isize,
    thread_phase: i32,
) -> isize;

type MemorySizeNeededFn = unsafe extern "C" fn(compressor: i32, raw_len: isize) -> i32;

struct OodleLibrary {
    // Keeps the function pointers below valid.
    _library: Library,
    decompress: DecompressFn,
    decoder_memory_size: usize,
}

static LIBRARY: OnceLock<std::result::Result<OodleLibrary, String>> = OnceLock::new();

fn library_path() -> OsString {
    std::env::var_os(OODLE_LIBRARY_ENV).unwrap_or_else(|| libloading::library_filename("oo2core"))
}

fn load_library() -> std::result::Result<OodleLibrary, String> {
    let path = library_path();
    debug!("Loading Oodle from {:?}", path);

    // SAFETY: loading a foreign library runs its initialisers; the symbols
    // are only called with the signatures declared above.
    unsafe {
        let library = Library::new(&path).map_err(|e| format!("{:?}: {}", path, e))?;
        let decompress = *library
            .get::<DecompressFn>(b"OodleLZ_Decompress\0")
            .map_err(|e| e.to_string())?;
        let memory_size_needed = *library
            .get::<MemorySizeNeededFn>(b"OodleLZDecoder_MemorySizeNeeded\0")
            .map_err(|e| e.to_string())?;
        let decoder_memory_size = memory_size_needed(COMPRESSOR_INVALID, -1).max(0) as usize;

        Ok(OodleLibrary {
            _library: library,
            decompress,
            decoder_memory_size,
        })
    }
}

fn library() -> Result<&'static OodleLibrary> {
    LIBRARY
        .get_or_init(|| {
            let loaded = load_library();
            if let Err(e) = &loaded {
                warn!("Oodle is not available: {}", e);
            }
            loaded
        })
        .as_ref()
        .map_err(|e| PsarcError::CodecUnavailable(format!("oodle: {}", e)))
}

/// Oodle blocks, decoded by the `oo2core` shared library
///
/// The library is loaded on first use. Each codec owns the decoder scratch
/// memory the library asks for.
pub struct OodleCodec {
    library: &'static OodleLibrary,
    workspace: Vec<u8>,
}

impl OodleCodec {
    pub fn new() -> Result<Self> {
        let library = library()?;
        Ok(Self {
            library,
            workspace: vec![0u8; library.decoder_memory_size],
        })
    }
}

impl BlockDecoder for OodleCodec {
    fn decode_block(&mut self, block: &[u8], output: &mut [u8]) -> Result<usize> {
        // SAFETY: every pointer/length pair comes from a live slice.
        let produced = unsafe {
            (self.library.decompress)(
                block.as_ptr(),
                block.len() as isize,
                output.as_mut_ptr(),
                output.len() as isize,
                1,
                0,
                VERBOSITY_MINIMAL,
                ptr::null_mut(),
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                self.workspace.as_mut_ptr(),
                self.workspace.len() as isize,
                THREAD_PHASE_UNTHREADED,
            )
        };

        if produced <= 0 {
            return Err(PsarcError::DecompressionFailed(format!(
                "Oodle decompression of {} bytes failed",
                block.len()
            )));
        }
        Ok(produced as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_path_override() {
        std::env::set_var(OODLE_LIBRARY_ENV, "/nonexistent/liboo2core.so");
        assert_eq!(library_path(), OsString::from("/nonexistent/liboo2core.so"));
        std::env::remove_var(OODLE_LIBRARY_ENV);
        assert_eq!(library_path(), libloading::library_filename("oo2core"));
    }
}
