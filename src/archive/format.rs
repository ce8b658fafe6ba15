use crate::archive::hash::{PathHash, HASH_SIZE};
use crate::error::{PsarcError, Result};
use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Read, Write};

/// Magic number: "PSAR"
pub const MAGIC_NUMBER: u32 = 0x5053_4152;

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// File entry size in bytes
pub const ENTRY_SIZE: usize = 30;

/// Smallest block size a reader accepts
pub const MIN_BLOCK_SIZE: u32 = 256;

/// Largest decompressed size a single file may have (31-bit buffer)
pub const MAX_FILE_SIZE: u64 = i32::MAX as u64;

/// Version written by the builder unless told otherwise
pub const DEFAULT_VERSION: Version = Version { major: 1, minor: 4 };

/// Archive format version
///
/// Ordered by major, then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Whether a reader can parse archives of this version
    pub fn is_supported(&self) -> bool {
        (1..=2).contains(&self.major)
    }
}

impl Default for Version {
    fn default() -> Self {
        DEFAULT_VERSION
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Compression tag stored in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionType {
    /// All-zero tag; read back as stored data
    Invalid,
    /// "none", never produced by real tools
    None,
    /// "zlib"
    Zlib,
    /// "lzma"
    Lzma,
    /// "oodl"
    Oodle,
    /// "zstd"
    Zstd,
    /// Anything else, kept so the header still parses
    Unknown(u32),
}

impl CompressionType {
    const TAG_NONE: u32 = u32::from_be_bytes(*b"none");
    const TAG_ZLIB: u32 = u32::from_be_bytes(*b"zlib");
    const TAG_LZMA: u32 = u32::from_be_bytes(*b"lzma");
    const TAG_OODLE: u32 = u32::from_be_bytes(*b"oodl");
    const TAG_ZSTD: u32 = u32::from_be_bytes(*b"zstd");

    pub fn from_tag(tag: u32) -> Self {
        match tag {
            0 => Self::Invalid,
            Self::TAG_NONE => Self::None,
            Self::TAG_ZLIB => Self::Zlib,
            Self::TAG_LZMA => Self::Lzma,
            Self::TAG_OODLE => Self::Oodle,
            Self::TAG_ZSTD => Self::Zstd,
            other => Self::Unknown(other),
        }
    }

    pub fn tag(self) -> u32 {
        match self {
            Self::Invalid => 0,
            Self::None => Self::TAG_NONE,
            Self::Zlib => Self::TAG_ZLIB,
            Self::Lzma => Self::TAG_LZMA,
            Self::Oodle => Self::TAG_OODLE,
            Self::Zstd => Self::TAG_ZSTD,
            Self::Unknown(tag) => tag,
        }
    }

    /// Whether blocks of this type are stored without compression
    pub fn is_store(self) -> bool {
        matches!(self, Self::Invalid | Self::None)
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("invalid"),
            Self::Unknown(tag) => write!(f, "unknown({:#010x})", tag),
            known => f.write_str(&String::from_utf8_lossy(&known.tag().to_be_bytes())),
        }
    }
}

bitflags! {
    /// Archive-wide flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ArchiveFlags: u32 {
        const CASE_INSENSITIVE_PATHS = 1 << 0;
        const ABSOLUTE_PATHS = 1 << 1;
        const ENCRYPTED_FILES = 1 << 2;
    }
}

/// Byte width of one block-size table entry for a given block size
///
/// floor(log256(block_size - 1)) + 1: 1 byte up to 256, 2 up to 65536,
/// 3 up to 16777216, 4 above.
pub fn block_size_width(block_size: u32) -> usize {
    match block_size.saturating_sub(1) {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

/// Table of contents header embedded in the archive header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TocHeader {
    /// Bytes of header + entries + block-size table
    pub size: u32,
    /// Bytes per file entry
    pub entry_size: u32,
    /// Number of file entries
    pub entry_count: u32,
}

/// File header at the beginning of the archive
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version: Version,
    pub compression: CompressionType,
    pub toc: TocHeader,
    pub block_size: u32,
    pub flags: ArchiveFlags,
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            version: DEFAULT_VERSION,
            compression: CompressionType::Zlib,
            toc: TocHeader {
                size: HEADER_SIZE as u32,
                entry_size: ENTRY_SIZE as u32,
                entry_count: 0,
            },
            block_size: 0x1_0000,
            flags: ArchiveFlags::empty(),
        }
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.flags.contains(ArchiveFlags::CASE_INSENSITIVE_PATHS)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(ArchiveFlags::ENCRYPTED_FILES)
    }

    /// Byte width of one block-size table entry
    pub fn block_size_width(&self) -> usize {
        block_size_width(self.block_size)
    }

    /// Bytes of the block-size table implied by the TOC header
    pub fn block_table_len(&self) -> Result<usize> {
        let entries = self.toc.entry_size as u64 * self.toc.entry_count as u64;
        (self.toc.size as u64)
            .checked_sub(HEADER_SIZE as u64 + entries)
            .map(|len| len as usize)
            .ok_or_else(|| {
                PsarcError::InvalidFormat(format!(
                    "Table of contents size {} is smaller than {} entries of {} bytes",
                    self.toc.size, self.toc.entry_count, self.toc.entry_size
                ))
            })
    }

    /// Write header to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_u32::<BigEndian>(MAGIC_NUMBER)?;
        writer.write_u16::<BigEndian>(self.version.major)?;
        writer.write_u16::<BigEndian>(self.version.minor)?;
        writer.write_u32::<BigEndian>(self.compression.tag())?;
        writer.write_u32::<BigEndian>(self.toc.size)?;
        writer.write_u32::<BigEndian>(self.toc.entry_size)?;
        writer.write_u32::<BigEndian>(self.toc.entry_count)?;
        writer.write_u32::<BigEndian>(self.block_size)?;
        writer.write_u32::<BigEndian>(self.flags.bits())?;
        Ok(())
    }

    /// Read header from a reader
    ///
    /// Only the magic is checked here; call [`FileHeader::validate`] before
    /// trusting the rest.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let magic = reader.read_u32::<BigEndian>()?;
        if magic != MAGIC_NUMBER {
            return Err(PsarcError::InvalidMagic(magic));
        }

        let major = reader.read_u16::<BigEndian>()?;
        let minor = reader.read_u16::<BigEndian>()?;
        let compression = CompressionType::from_tag(reader.read_u32::<BigEndian>()?);
        let toc = TocHeader {
            size: reader.read_u32::<BigEndian>()?,
            entry_size: reader.read_u32::<BigEndian>()?,
            entry_count: reader.read_u32::<BigEndian>()?,
        };
        let block_size = reader.read_u32::<BigEndian>()?;
        let flags = ArchiveFlags::from_bits_retain(reader.read_u32::<BigEndian>()?);

        Ok(Self {
            version: Version::new(major, minor),
            compression,
            toc,
            block_size,
            flags,
        })
    }

    /// Validate version and table sizes
    pub fn validate(&self) -> Result<()> {
        if !self.version.is_supported() {
            return Err(PsarcError::UnsupportedVersion {
                major: self.version.major,
                minor: self.version.minor,
            });
        }

        if (self.toc.entry_size as usize) < ENTRY_SIZE {
            return Err(PsarcError::InvalidFormat(format!(
                "Entry size {} is smaller than {}",
                self.toc.entry_size, ENTRY_SIZE
            )));
        }

        if self.block_size < MIN_BLOCK_SIZE {
            return Err(PsarcError::InvalidFormat(format!(
                "Block size {} is smaller than {}",
                self.block_size, MIN_BLOCK_SIZE
            )));
        }

        self.block_table_len()?;
        Ok(())
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Unsigned 40-bit big-endian integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U40([u8; 5]);

impl U40 {
    pub const MAX: u64 = (1 << 40) - 1;

    /// Encode a value, failing if it does not fit 40 bits
    pub fn from_u64(value: u64) -> Result<Self> {
        if value > Self::MAX {
            return Err(PsarcError::InvalidFormat(format!(
                "Value {} does not fit in 40 bits",
                value
            )));
        }
        let mut bytes = [0u8; 5];
        BigEndian::write_uint(&mut bytes, value, 5);
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; 5]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 5] {
        &self.0
    }

    pub fn to_u64(self) -> u64 {
        BigEndian::read_uint(&self.0, 5)
    }
}

/// File entry in the table of contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub hash: PathHash,
    /// Index of the first block in the shared block-size table
    pub block_index: u32,
    pub decompressed_size: u64,
    /// Absolute byte offset of the first block
    pub offset: u64,
}

impl FileEntry {
    /// Write entry to the table of contents
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.hash.as_bytes())?;
        writer.write_u32::<BigEndian>(self.block_index)?;
        writer.write_all(U40::from_u64(self.decompressed_size)?.as_bytes())?;
        writer.write_all(U40::from_u64(self.offset)?.as_bytes())?;
        Ok(())
    }

    /// Read entry from the table of contents
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut hash = [0u8; HASH_SIZE];
        reader.read_exact(&mut hash)?;
        let block_index = reader.read_u32::<BigEndian>()?;

        let mut size = [0u8; 5];
        reader.read_exact(&mut size)?;
        let mut offset = [0u8; 5];
        reader.read_exact(&mut offset)?;

        Ok(Self {
            hash: PathHash::from_bytes(hash),
            block_index,
            decompressed_size: U40::from_bytes(size).to_u64(),
            offset: U40::from_bytes(offset).to_u64(),
        })
    }

    pub fn is_manifest(&self) -> bool {
        self.hash.is_manifest()
    }
}
