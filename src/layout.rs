use crate::dir::DIRENT_SIZE;
use crate::error::{FsError, Result};
use crate::image::RawImage;
use crate::inode::INODE_SIZE;
use crate::superblock::SUPERBLOCK_SIZE;

/// First log block: block 0 is the boot block, block 1 the superblock.
pub const LOG_START: u32 = 2;

/// Geometry of an image.
///
/// Every derived position (inode region, bitmap block, metadata extent) is
/// computed from these three values, never from the on-disk superblock, so a
/// builder that writes inconsistent fields is caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub block_size: usize,
    pub ninodes: u32,
    pub nlog: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self::XV6
    }
}

impl Layout {
    pub const XV6: Layout = Layout {
        block_size: 1024,
        ninodes: 600,
        nlog: 30,
    };

    pub fn new(block_size: usize, ninodes: u32, nlog: u32) -> Result<Self> {
        let layout = Layout {
            block_size,
            ninodes,
            nlog,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Rejects geometry whose derived block numbers or bitmap width would not
    /// fit in a `u32`. Every accessor below assumes this passed.
    pub fn validate(&self) -> Result<()> {
        let block_size = self.block_size;
        if block_size < SUPERBLOCK_SIZE {
            return Err(FsError::InvalidLayout("block size cannot hold the superblock"));
        }
        if block_size % INODE_SIZE != 0 || block_size % DIRENT_SIZE != 0 {
            return Err(FsError::InvalidLayout(
                "block size must be a multiple of the inode and directory entry sizes",
            ));
        }
        if block_size
            .checked_mul(8)
            .and_then(|bits| u32::try_from(bits).ok())
            .is_none()
        {
            return Err(FsError::InvalidLayout("bitmap block has more bits than a u32 can count"));
        }
        if self.ninodes < 2 {
            return Err(FsError::InvalidLayout("need room for the reserved inode and the root"));
        }

        let ipb = self.inodes_per_block();
        LOG_START
            .checked_add(self.nlog)
            .and_then(|start| (self.ninodes / ipb).checked_add(1)?.checked_add(start))
            .and_then(|bitmap| bitmap.checked_add(1))
            .ok_or(FsError::InvalidLayout("metadata region extends past block u32::MAX"))?;

        Ok(())
    }

    /// Checks the layout and that `image` was cut into blocks of the same size.
    pub fn check_image(&self, image: &RawImage) -> Result<()> {
        self.validate()?;
        if image.block_size() != self.block_size {
            return Err(FsError::InvalidLayout(
                "image was loaded with a different block size than the layout",
            ));
        }
        Ok(())
    }

    pub fn inodes_per_block(&self) -> u32 {
        (self.block_size / INODE_SIZE) as u32
    }

    /// Matches the builder's `ninodes / IPB + 1`, which over-allocates one
    /// block when `ninodes` is an exact multiple.
    pub fn inode_blocks(&self) -> u32 {
        self.ninodes / self.inodes_per_block() + 1
    }

    pub fn inode_start(&self) -> u32 {
        LOG_START + self.nlog
    }

    pub fn bitmap_start(&self) -> u32 {
        self.inode_start() + self.inode_blocks()
    }

    /// Last block of the metadata region (boot, superblock, log, inodes, bitmap).
    pub fn metadata_end(&self) -> u32 {
        self.bitmap_start()
    }

    pub fn metadata_blocks(&self) -> u32 {
        self.metadata_end() + 1
    }

    /// Block holding inode `inum` and the byte offset of its record.
    pub fn inode_position(&self, inum: u32) -> (u32, usize) {
        let ipb = self.inodes_per_block();
        let block = inum / ipb + self.inode_start();
        let offset = (inum % ipb) as usize * INODE_SIZE;
        (block, offset)
    }

    pub fn indirect_entries(&self) -> usize {
        self.block_size / 4
    }

    pub fn bitmap_bits(&self) -> u32 {
        (self.block_size * 8) as u32
    }
}
