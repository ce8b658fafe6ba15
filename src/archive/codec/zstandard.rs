use super::BlockDecoder;
use crate::error::{PsarcError, Result};
use zstd::bulk::Decompressor;

/// Zstandard blocks, one frame per block
///
/// Owns a decompression context for its lifetime; an optional dictionary is
/// loaded into the context once.
pub struct ZstdCodec {
    context: Decompressor<'static>,
}

impl ZstdCodec {
    pub fn new() -> Result<Self> {
        let context = Decompressor::new().map_err(|e| {
            PsarcError::CodecUnavailable(format!("zstd: failed to create context: {}", e))
        })?;
        Ok(Self { context })
    }

    /// Create a context with a preloaded dictionary
    ///
    /// Standalone codec API for callers decoding blocks themselves: the
    /// archive reader always resolves a plain context through
    /// [`decoder_for`](super::decoder_for), and PSARC headers carry no
    /// dictionary.
    pub fn with_dictionary(dictionary: &[u8]) -> Result<Self> {
        let context = Decompressor::with_dictionary(dictionary).map_err(|e| {
            PsarcError::DecompressionFailed(format!("zstd: failed to load dictionary: {}", e))
        })?;
        Ok(Self { context })
    }
}

impl BlockDecoder for ZstdCodec {
    fn decode_block(&mut self, block: &[u8], output: &mut [u8]) -> Result<usize> {
        self.context
            .decompress_to_buffer(block, output)
            .map_err(|e| PsarcError::DecompressionFailed(format!("Zstd decompression failed: {}", e)))
    }

    fn decoded_len_bound(&self, block: &[u8]) -> Option<usize> {
        zstd::zstd_safe::get_frame_content_size(block)
            .ok()
            .flatten()
            .and_then(|size| usize::try_from(size).ok())
    }
}
