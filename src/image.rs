use std::fs::File;
use std::path::Path;

use positioned_io2::ReadAt;

use crate::error::{FsError, Result};

/// The whole image, loaded once and never written.
#[derive(Debug)]
pub struct RawImage {
    bytes: Vec<u8>,
    block_size: usize,
}

impl RawImage {
    pub fn open<P: AsRef<Path>>(path: P, block_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Self::read_from(&file, len, block_size)
    }

    /// Reads `len` bytes starting at offset 0 of `reader`.
    pub fn read_from<R: ReadAt>(reader: &R, len: u64, block_size: usize) -> Result<Self> {
        if len % block_size as u64 != 0 {
            return Err(FsError::ImageLength { len, block_size });
        }

        let mut bytes = vec![0u8; len as usize];
        reader.read_exact_at(0, &mut bytes)?;
        Self::from_bytes(bytes, block_size)
    }

    pub fn from_bytes(bytes: Vec<u8>, block_size: usize) -> Result<Self> {
        if block_size == 0 || bytes.len() % block_size != 0 {
            return Err(FsError::ImageLength {
                len: bytes.len() as u64,
                block_size,
            });
        }

        Ok(Self { bytes, block_size })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> u64 {
        (self.bytes.len() / self.block_size) as u64
    }

    pub fn contains(&self, block: u32) -> bool {
        u64::from(block) < self.block_count()
    }

    pub fn block(&self, block: u32) -> Result<&[u8]> {
        if !self.contains(block) {
            return Err(self.out_of_range(block.into()));
        }

        let start = block as usize * self.block_size;
        Ok(&self.bytes[start..start + self.block_size])
    }

    pub fn blocks(&self, start: u32, count: u32) -> Result<Vec<&[u8]>> {
        let end = u64::from(start) + u64::from(count);
        if end > self.block_count() {
            return Err(self.out_of_range(end.saturating_sub(1)));
        }

        let from = start as usize * self.block_size;
        let to = end as usize * self.block_size;
        Ok(self.bytes[from..to].chunks_exact(self.block_size).collect())
    }

    fn out_of_range(&self, block: u64) -> FsError {
        FsError::OutOfRange {
            block,
            blocks: self.block_count(),
        }
    }
}
