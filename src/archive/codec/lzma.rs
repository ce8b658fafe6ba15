use super::BlockDecoder;
use crate::error::{PsarcError, Result};
use byteorder::{ByteOrder, LittleEndian};
use lzma_rs::decompress::{Options, UnpackedSize};
use std::io::Cursor;
use tracing::trace;

/// Properties (5) + little-endian unpacked size (8)
const LZMA_HEADER_SIZE: usize = 13;

/// LZMA "alone" blocks: 5 property bytes, 8-byte size, then the stream
#[derive(Debug, Default, Clone, Copy)]
pub struct LzmaCodec;

impl BlockDecoder for LzmaCodec {
    fn decode_block(&mut self, block: &[u8], output: &mut [u8]) -> Result<usize> {
        if block.len() < LZMA_HEADER_SIZE {
            return Err(PsarcError::DecompressionFailed(format!(
                "LZMA block of {} bytes is shorter than its header",
                block.len()
            )));
        }

        let advertised = LittleEndian::read_u64(&block[5..LZMA_HEADER_SIZE]);
        trace!(
            "LZMA block: {} bytes in, {} advertised, {} expected",
            block.len(),
            advertised,
            output.len()
        );

        let options = Options {
            unpacked_size: UnpackedSize::ReadFromHeader,
            memlimit: None,
            allow_incomplete: false,
        };

        let mut input = block;
        let mut cursor = Cursor::new(&mut *output);
        lzma_rs::lzma_decompress_with_options(&mut input, &mut cursor, &options)?;

        let produced = cursor.position() as usize;
        Ok(produced.min(usize::try_from(advertised).unwrap_or(usize::MAX)))
    }

    fn decoded_len_bound(&self, block: &[u8]) -> Option<usize> {
        // All ones marks a stream without a declared size
        block
            .get(5..LZMA_HEADER_SIZE)
            .map(LittleEndian::read_u64)
            .filter(|&advertised| advertised != u64::MAX)
            .and_then(|advertised| usize::try_from(advertised).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lzma_block(data: &[u8]) -> Vec<u8> {
        let options = lzma_rs::compress::Options {
            unpacked_size: lzma_rs::compress::UnpackedSize::WriteToHeader(Some(data.len() as u64)),
        };
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress_with_options(&mut &data[..], &mut compressed, &options).unwrap();
        compressed
    }

    #[test]
    fn test_lzma_block() {
        let data = b"lzma payload, lzma payload, lzma payload".repeat(10);
        let block = lzma_block(&data);
        assert_eq!(LittleEndian::read_u64(&block[5..13]), data.len() as u64);

        let mut out = vec![0u8; data.len()];
        let n = LzmaCodec.decode_block(&block, &mut out).unwrap();
        assert_eq!(n, data.len());
        assert_eq!(out, data);
    }

    #[test]
    fn test_lzma_bound_from_header() {
        let block = lzma_block(&[9u8; 300]);
        assert_eq!(LzmaCodec.decoded_len_bound(&block), Some(300));
        assert_eq!(LzmaCodec.decoded_len_bound(&block[..4]), None);

        let mut unknown = block;
        unknown[5..13].copy_from_slice(&[0xFF; 8]);
        assert_eq!(LzmaCodec.decoded_len_bound(&unknown), None);
    }

    #[test]
    fn test_lzma_truncated_header() {
        let mut out = vec![0u8; 8];
        let err = LzmaCodec.decode_block(&[0x5D, 0, 0], &mut out).unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_lzma_overflowing_output_fails() {
        let data = vec![7u8; 512];
        let block = lzma_block(&data);

        let mut out = vec![0u8; 100];
        let err = LzmaCodec.decode_block(&block, &mut out).unwrap_err();
        assert!(err.is_decode_failure());
    }
}
