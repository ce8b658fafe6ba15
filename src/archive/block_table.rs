use crate::archive::format::block_size_width;
use crate::error::{PsarcError, Result};
use byteorder::{BigEndian, ByteOrder};

/// Bytes at the end of the table used by the block cipher (key + IV)
pub const CIPHER_MATERIAL_SIZE: usize = 20;

/// Shared block-size table
///
/// One big-endian entry per block across the whole archive. An entry of 0
/// means the block fills the block size and is stored as-is.
#[derive(Debug, Clone, Default)]
pub struct BlockSizeTable {
    data: Vec<u8>,
    width: usize,
}

impl BlockSizeTable {
    /// Create an empty table for the given block size
    pub fn new(block_size: u32) -> Self {
        Self {
            data: Vec::new(),
            width: block_size_width(block_size),
        }
    }

    /// Wrap raw table bytes read from an archive
    pub fn from_bytes(data: Vec<u8>, block_size: u32) -> Self {
        Self {
            data,
            width: block_size_width(block_size),
        }
    }

    /// Bytes per entry
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        if self.width == 0 {
            return 0;
        }
        self.data.len() / self.width
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Declared size of a block (0 is the full-block sentinel)
    pub fn get(&self, index: u32) -> Result<u32> {
        let start = (index as usize).saturating_mul(self.width);
        let bytes = self
            .data
            .get(start..start.saturating_add(self.width))
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| {
                PsarcError::InvalidFormat(format!(
                    "Block index {} is outside the block size table ({} entries)",
                    index,
                    self.len()
                ))
            })?;
        Ok(BigEndian::read_uint(bytes, self.width) as u32)
    }

    /// Append an entry, failing if it does not fit the entry width
    pub fn push(&mut self, size: u32) -> Result<()> {
        let max = if self.width >= 4 {
            u32::MAX as u64
        } else {
            (1u64 << (self.width * 8)) - 1
        };
        if self.width == 0 || size as u64 > max {
            return Err(PsarcError::InvalidFormat(format!(
                "Block size {} does not fit in {} bytes",
                size, self.width
            )));
        }

        let mut buf = [0u8; 4];
        BigEndian::write_uint(&mut buf, size as u64, self.width);
        self.data.extend_from_slice(&buf[..self.width]);
        Ok(())
    }

    /// Trailing bytes handed to the block cipher, if the table is long enough
    pub fn cipher_material(&self) -> Option<&[u8]> {
        self.data
            .len()
            .checked_sub(CIPHER_MATERIAL_SIZE)
            .map(|start| &self.data[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_follows_block_size() {
        assert_eq!(BlockSizeTable::new(256).width(), 1);
        assert_eq!(BlockSizeTable::new(65536).width(), 2);
        assert_eq!(BlockSizeTable::new(16_777_216).width(), 3);
        assert_eq!(BlockSizeTable::new(33_554_432).width(), 4);
    }

    #[test]
    fn test_push_and_get() {
        let mut table = BlockSizeTable::new(65536);
        table.push(0).unwrap();
        table.push(1234).unwrap();
        table.push(65535).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.as_bytes(), &[0, 0, 0x04, 0xD2, 0xFF, 0xFF]);
        assert_eq!(table.get(0).unwrap(), 0);
        assert_eq!(table.get(1).unwrap(), 1234);
        assert_eq!(table.get(2).unwrap(), 65535);
        assert!(table.get(3).unwrap_err().is_format_error());
    }

    #[test]
    fn test_empty_table() {
        let table = BlockSizeTable::default();
        assert!(table.is_empty());
        assert!(table.get(0).unwrap_err().is_format_error());
    }

    #[test]
    fn test_three_byte_entries() {
        let table = BlockSizeTable::from_bytes(vec![0x01, 0x02, 0x03], 16_777_216);
        assert_eq!(table.get(0).unwrap(), 0x01_0203);
    }

    #[test]
    fn test_push_rejects_wide_values() {
        let mut table = BlockSizeTable::new(256);
        assert!(table.push(255).is_ok());
        assert!(table.push(256).is_err());
    }

    #[test]
    fn test_cipher_material() {
        let table = BlockSizeTable::from_bytes((0..24).collect(), 256);
        assert_eq!(table.cipher_material().unwrap(), &(4..24).collect::<Vec<u8>>()[..]);

        let short = BlockSizeTable::from_bytes(vec![0; 10], 256);
        assert!(short.cipher_material().is_none());
    }
}
