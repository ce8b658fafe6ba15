use std::io;
use thiserror::Error;

/// Result type for psarc operations
pub type Result<T> = std::result::Result<T, PsarcError>;

/// Coarse classification of [`PsarcError`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The byte stream is not a well-formed archive
    Format,
    /// The archive is valid but uses something this crate does not handle
    Unsupported,
    /// A codec or cipher step failed on one file
    Decode,
    /// The underlying stream failed
    Io,
}

/// Unified error type for all psarc operations
#[derive(Debug, Error)]
pub enum PsarcError {
    // Format errors
    #[error("Invalid magic number in archive header: {0:#010x}")]
    InvalidMagic(u32),

    #[error("Unsupported archive version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    // Feature errors
    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Codec not available: {0}")]
    CodecUnavailable(String),

    // Codec errors
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PsarcError {
    /// Map this error onto the format/unsupported/decode taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            PsarcError::InvalidMagic(_)
            | PsarcError::UnsupportedVersion { .. }
            | PsarcError::InvalidFormat(_) => ErrorCategory::Format,
            PsarcError::Unsupported(_) | PsarcError::CodecUnavailable(_) => {
                ErrorCategory::Unsupported
            }
            PsarcError::CompressionFailed(_)
            | PsarcError::DecompressionFailed(_)
            | PsarcError::DecryptionFailed(_) => ErrorCategory::Decode,
            PsarcError::Io(_) => ErrorCategory::Io,
        }
    }

    pub fn is_format_error(&self) -> bool {
        self.category() == ErrorCategory::Format
    }

    pub fn is_unsupported(&self) -> bool {
        self.category() == ErrorCategory::Unsupported
    }

    pub fn is_decode_failure(&self) -> bool {
        self.category() == ErrorCategory::Decode
    }
}

impl From<lzma_rs::error::Error> for PsarcError {
    fn from(err: lzma_rs::error::Error) -> Self {
        PsarcError::DecompressionFailed(format!("LZMA decompression failed: {}", err))
    }
}
