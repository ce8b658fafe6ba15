mod block_table;
mod builder;
pub mod cipher;
pub mod codec;
mod format;
pub(crate) mod hash;
mod reader;

pub use block_table::{BlockSizeTable, CIPHER_MATERIAL_SIZE};
pub use builder::{ArchiveBuilder, BuildOptions, BuilderFile};
pub use codec::BlockDecoder;
pub use format::{
    block_size_width, ArchiveFlags, CompressionType, FileEntry, FileHeader, TocHeader, Version,
    DEFAULT_VERSION, ENTRY_SIZE, HEADER_SIZE, MAGIC_NUMBER, MAX_FILE_SIZE, MIN_BLOCK_SIZE, U40,
};
pub use hash::{normalize_path, PathHash, HASH_SIZE};
pub use reader::ArchiveReader;
