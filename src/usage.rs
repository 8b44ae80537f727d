use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use tracing::{debug, trace};

use crate::error::{FsError, Result};
use crate::image::RawImage;
use crate::inode::{Inode, InodeTable};
use crate::layout::Layout;
use crate::util::le_words;

/// Who claimed a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Metadata,
    Direct { inode: u32, slot: usize },
    IndirectBlock { inode: u32 },
    Indirect { inode: u32, index: usize },
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Metadata => write!(f, "the metadata region"),
            Owner::Direct { inode, slot } => write!(f, "inode {inode} (direct slot {slot})"),
            Owner::IndirectBlock { inode } => write!(f, "inode {inode} (indirect block)"),
            Owner::Indirect { inode, index } => {
                write!(f, "inode {inode} (indirect entry {index})")
            }
        }
    }
}

/// Every block some inode owns, plus the reserved metadata region.
#[derive(Debug, Clone)]
pub struct UsedBlocks {
    owners: BTreeMap<u32, Owner>,
    reserved: RangeInclusive<u32>,
    limit: u32,
}

impl UsedBlocks {
    /// `limit` is the number of blocks in the image; claims at or past it are rejected.
    pub fn new(layout: &Layout, limit: u32) -> Self {
        UsedBlocks {
            owners: BTreeMap::new(),
            reserved: 0..=layout.metadata_end(),
            limit,
        }
    }

    /// Walks every live inode's direct and indirect pointers.
    pub fn scan(image: &RawImage, layout: &Layout, table: &InodeTable) -> Result<Self> {
        layout.check_image(image)?;
        let limit = u32::try_from(image.block_count()).unwrap_or(u32::MAX);
        let mut used = Self::new(layout, limit);

        for inode in table.iter() {
            used.claim_inode(image, inode)?;
        }

        debug!(
            claimed = used.owners.len(),
            reserved = used.reserved.end() + 1,
            "block usage collected"
        );
        Ok(used)
    }

    fn claim_inode(&mut self, image: &RawImage, inode: &Inode) -> Result<()> {
        for (slot, &block) in inode.direct().iter().enumerate() {
            self.claim(
                block,
                Owner::Direct {
                    inode: inode.inum,
                    slot,
                },
            )?;
        }

        if inode.uses_indirect() {
            self.claim(inode.indirect, Owner::IndirectBlock { inode: inode.inum })?;
            let entries = read_indirect(image.block(inode.indirect)?, inode.inum, inode.indirect)?;

            for (index, block) in entries.into_iter().enumerate() {
                self.claim(
                    block,
                    Owner::Indirect {
                        inode: inode.inum,
                        index,
                    },
                )?;
            }
        }

        Ok(())
    }

    pub fn claim(&mut self, block: u32, owner: Owner) -> Result<()> {
        if block >= self.limit {
            return Err(FsError::OutOfRange {
                block: block.into(),
                blocks: self.limit.into(),
            });
        }

        if self.reserved.contains(&block) {
            return Err(FsError::DoubleAllocation {
                block,
                first: Owner::Metadata,
                second: owner,
            });
        }

        if let Some(&first) = self.owners.get(&block) {
            return Err(FsError::DoubleAllocation {
                block,
                first,
                second: owner,
            });
        }

        trace!(block, %owner, "claimed");
        self.owners.insert(block, owner);
        Ok(())
    }

    pub fn contains(&self, block: u32) -> bool {
        self.reserved.contains(&block) || self.owners.contains_key(&block)
    }

    pub fn owner(&self, block: u32) -> Option<Owner> {
        if self.reserved.contains(&block) {
            return Some(Owner::Metadata);
        }
        self.owners.get(&block).copied()
    }

    pub fn reserved(&self) -> RangeInclusive<u32> {
        self.reserved.clone()
    }

    /// Blocks claimed by inodes, in ascending order.
    pub fn claimed(&self) -> impl Iterator<Item = (u32, Owner)> + '_ {
        self.owners.iter().map(|(&block, &owner)| (block, owner))
    }

    /// Claimed plus reserved blocks.
    pub fn len(&self) -> usize {
        self.owners.len() + self.reserved.clone().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes an indirect block: addresses up to the first zero, nothing after it.
pub fn read_indirect(block: &[u8], inode: u32, block_no: u32) -> Result<Vec<u32>> {
    let mut entries = Vec::new();
    let mut terminated = false;

    for (index, value) in le_words(block).enumerate() {
        if value == 0 {
            terminated = true;
        } else if terminated {
            return Err(FsError::IndirectGarbage {
                inode,
                block: block_no,
                offset: index * 4,
                value,
            });
        } else {
            entries.push(value);
        }
    }

    Ok(entries)
}
