//! Block codecs
//!
//! Every codec decodes exactly one block. `output` is sized by the caller to
//! the number of bytes the block is expected to produce (the smaller of the
//! block size and what is left of the file).

mod lzma;
#[cfg(feature = "oodle")]
mod oodle;
#[cfg(feature = "zstd")]
mod zstandard;

use crate::archive::format::CompressionType;
use crate::error::{PsarcError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::trace;

pub use lzma::LzmaCodec;
#[cfg(feature = "oodle")]
pub use oodle::{OodleCodec, OODLE_LIBRARY_ENV};
#[cfg(feature = "zstd")]
pub use zstandard::ZstdCodec;

/// Worst-case deflate expansion: a 258-byte match in under two bits
const DEFLATE_MAX_RATIO: usize = 1032;

/// Decoder for a single compressed block
pub trait BlockDecoder {
    /// Decode `block` into `output`, returning the number of bytes produced
    fn decode_block(&mut self, block: &[u8], output: &mut [u8]) -> Result<usize>;

    /// Most bytes `block` can decode to, if the codec can tell without decoding
    fn decoded_len_bound(&self, _block: &[u8]) -> Option<usize> {
        None
    }
}

/// Blocks stored without compression
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreCodec;

impl BlockDecoder for StoreCodec {
    fn decode_block(&mut self, block: &[u8], output: &mut [u8]) -> Result<usize> {
        let n = block.len().min(output.len());
        output[..n].copy_from_slice(&block[..n]);
        Ok(n)
    }

    fn decoded_len_bound(&self, block: &[u8]) -> Option<usize> {
        Some(block.len())
    }
}

/// Zlib-wrapped deflate blocks
#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibCodec;

impl ZlibCodec {
    /// Compress one block
    pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
        encoder
            .write_all(data)
            .map_err(|e| PsarcError::CompressionFailed(format!("Zlib compression failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| PsarcError::CompressionFailed(format!("Zlib compression failed: {}", e)))
    }
}

impl BlockDecoder for ZlibCodec {
    fn decode_block(&mut self, block: &[u8], output: &mut [u8]) -> Result<usize> {
        let mut decoder = ZlibDecoder::new(block);
        decoder
            .read_exact(output)
            .map_err(|e| PsarcError::DecompressionFailed(format!("Zlib decompression failed: {}", e)))?;
        Ok(output.len())
    }

    fn decoded_len_bound(&self, block: &[u8]) -> Option<usize> {
        Some(block.len().saturating_mul(DEFLATE_MAX_RATIO))
    }
}

/// Resolve the decoder for an archive's compression tag
///
/// External codecs that are missing fail with `CodecUnavailable`; the
/// archive itself stays usable for any block that does not need them.
pub fn decoder_for(compression: CompressionType) -> Result<Box<dyn BlockDecoder>> {
    trace!("Resolving block decoder for {}", compression);

    match compression {
        CompressionType::Invalid | CompressionType::None => Ok(Box::new(StoreCodec)),
        CompressionType::Zlib => Ok(Box::new(ZlibCodec)),
        CompressionType::Lzma => Ok(Box::new(LzmaCodec)),
        CompressionType::Zstd => zstd_decoder(),
        CompressionType::Oodle => oodle_decoder(),
        CompressionType::Unknown(tag) => Err(PsarcError::Unsupported(format!(
            "Unknown compression method {:#010x}",
            tag
        ))),
    }
}

#[cfg(feature = "zstd")]
fn zstd_decoder() -> Result<Box<dyn BlockDecoder>> {
    Ok(Box::new(ZstdCodec::new()?))
}

#[cfg(not(feature = "zstd"))]
fn zstd_decoder() -> Result<Box<dyn BlockDecoder>> {
    Err(PsarcError::CodecUnavailable(
        "zstd: built without the `zstd` feature".to_string(),
    ))
}

#[cfg(feature = "oodle")]
fn oodle_decoder() -> Result<Box<dyn BlockDecoder>> {
    Ok(Box::new(OodleCodec::new()?))
}

#[cfg(not(feature = "oodle"))]
fn oodle_decoder() -> Result<Box<dyn BlockDecoder>> {
    Err(PsarcError::CodecUnavailable(
        "oodle: built without the `oodle` feature".to_string(),
    ))
}

/// Fail fast if blocks of this type cannot be produced by the builder
pub fn ensure_buildable(compression: CompressionType) -> Result<()> {
    match compression {
        CompressionType::Zlib => Ok(()),
        CompressionType::Invalid | CompressionType::None => Err(PsarcError::Unsupported(
            "Archives without compression cannot be built".to_string(),
        )),
        other => Err(PsarcError::Unsupported(format!(
            "Building {} archives is not implemented",
            other
        ))),
    }
}

/// Compress one block for the builder
pub fn compress_block(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    ensure_buildable(compression)?;
    ZlibCodec::compress(data)
}
