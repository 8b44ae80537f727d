use tracing::{debug, info, warn};

use crate::bitmap::{self, BitmapMismatch, BitmapMode};
use crate::dir::DirectoryTree;
use crate::error::{FsError, Result};
use crate::image::RawImage;
use crate::inode::InodeTable;
use crate::layout::Layout;
use crate::superblock::Superblock;
use crate::usage::UsedBlocks;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    pub layout: Layout,
    pub bitmap: BitmapMode,
}

/// Everything a successful pass learned about the image.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub superblock: Superblock,
    pub inodes: InodeTable,
    pub used: UsedBlocks,
    pub mismatches: Vec<BitmapMismatch>,
    pub tree: DirectoryTree,
}

impl Inspection {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Runs every stage in order. Structural defects stop the pass at the first
/// one found; bitmap mismatches only do so in [`BitmapMode::Strict`], and even
/// then only after the whole bitmap was compared.
pub fn inspect(image: &RawImage, options: &CheckOptions) -> Result<Inspection> {
    let layout = &options.layout;
    let superblock = Superblock::read(image, layout)?;
    let inodes = InodeTable::read(image, layout, &superblock)?;
    debug!(live = inodes.len(), boundary = inodes.boundary(), "inode table ok");

    let used = UsedBlocks::scan(image, layout, &inodes)?;

    let mismatches = bitmap::verify(image, layout, &used)?;
    if !mismatches.is_empty() {
        warn!(count = mismatches.len(), "bitmap disagrees with the used block set");
        if options.bitmap == BitmapMode::Strict {
            return Err(FsError::BitmapMismatch(mismatches));
        }
    }

    let tree = DirectoryTree::walk(image, &inodes)?;

    info!(
        blocks = superblock.size,
        inodes = inodes.len(),
        used = used.len(),
        entries = tree.len(),
        mismatches = mismatches.len(),
        "image checked"
    );

    Ok(Inspection {
        superblock,
        inodes,
        used,
        mismatches,
        tree,
    })
}
