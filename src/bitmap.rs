use tracing::debug;

use crate::error::Result;
use crate::image::RawImage;
use crate::layout::Layout;
use crate::usage::UsedBlocks;

/// What to do once the bitmap disagrees with the computed used set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BitmapMode {
    /// Collect every mismatch and keep going.
    #[default]
    Report,
    /// Collect every mismatch, then fail the pass.
    Strict,
}

/// A bitmap bit whose stored value disagrees with the used set. `bit` is also
/// the block number the bit describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapMismatch {
    pub bit: u32,
    pub expected: bool,
    pub actual: bool,
}

pub fn bit(bitmap: &[u8], index: u32) -> bool {
    (bitmap[(index / 8) as usize] >> (index % 8)) & 1 == 1
}

/// Compares every bit of the bitmap block against `used`; never stops early.
pub fn verify(image: &RawImage, layout: &Layout, used: &UsedBlocks) -> Result<Vec<BitmapMismatch>> {
    layout.check_image(image)?;
    let bitmap = image.block(layout.bitmap_start())?;
    let mut mismatches = Vec::new();

    for index in 0..layout.bitmap_bits() {
        let expected = used.contains(index);
        let actual = bit(bitmap, index);
        if expected != actual {
            debug!(bit = index, expected, actual, "bitmap mismatch");
            mismatches.push(BitmapMismatch {
                bit: index,
                expected,
                actual,
            });
        }
    }

    Ok(mismatches)
}
