use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::error::{FsError, Result};
use crate::image::RawImage;
use crate::layout::{LOG_START, Layout};
use crate::util::decode_pod;

pub const SUPERBLOCK_BLOCK: u32 = 1;
pub const SUPERBLOCK_SIZE: usize = std::mem::size_of::<Superblock>();

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Superblock {
    pub size: u32,       // total blocks in the image
    pub nblocks: u32,    // data blocks
    pub nlog: u32,       // log blocks
    pub logstart: u32,   // first log block
    pub inodestart: u32, // first inode block
    pub bmapstart: u32,  // bitmap block
    pub ninodes: u32,
}

impl Superblock {
    /// Reads block 1 and checks every field against `layout` and the image size.
    pub fn read(image: &RawImage, layout: &Layout) -> Result<Self> {
        layout.check_image(image)?;
        let block = image.block(SUPERBLOCK_BLOCK)?;
        let sb = Self::decode(&block[..SUPERBLOCK_SIZE])?;

        if let Some(offset) = block[SUPERBLOCK_SIZE..].iter().position(|&b| b != 0) {
            return Err(FsError::SuperblockPadding {
                offset: SUPERBLOCK_SIZE + offset,
                value: block[SUPERBLOCK_SIZE + offset],
            });
        }

        sb.validate(layout, image.block_count())?;
        debug!(?sb, "superblock ok");
        Ok(sb)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_pod(bytes, "superblock")
    }

    pub fn encode(&self) -> [u8; SUPERBLOCK_SIZE] {
        bytemuck::cast(*self)
    }

    /// The superblock an honest builder would write for an image of `size` blocks.
    pub fn expected(layout: &Layout, size: u32) -> Self {
        Superblock {
            size,
            nblocks: size.saturating_sub(layout.metadata_blocks()),
            nlog: layout.nlog,
            logstart: LOG_START,
            inodestart: layout.inode_start(),
            bmapstart: layout.bitmap_start(),
            ninodes: layout.ninodes,
        }
    }

    pub fn validate(&self, layout: &Layout, image_blocks: u64) -> Result<()> {
        let size = u32::try_from(image_blocks).unwrap_or(u32::MAX);
        let expected = Self::expected(layout, size);

        for ((field, actual), (_, want)) in self.fields().into_iter().zip(expected.fields()) {
            if actual != want {
                return Err(FsError::SuperblockField {
                    field,
                    expected: want,
                    actual,
                });
            }
        }

        Ok(())
    }

    /// Field names and values in on-disk order.
    pub fn fields(&self) -> [(&'static str, u32); 7] {
        [
            ("size", self.size),
            ("nblocks", self.nblocks),
            ("nlog", self.nlog),
            ("logstart", self.logstart),
            ("inodestart", self.inodestart),
            ("bmapstart", self.bmapstart),
            ("ninodes", self.ninodes),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn image_with(sb: Superblock, blocks: usize) -> RawImage {
        let mut bytes = vec![0u8; blocks * 1024];
        bytes[1024..1024 + SUPERBLOCK_SIZE].copy_from_slice(&sb.encode());
        RawImage::from_bytes(bytes, 1024).unwrap()
    }

    #[test]
    fn accepts_the_expected_geometry() {
        let layout = Layout::XV6;
        let sb = Superblock::expected(&layout, 100);
        assert_eq!(sb.nblocks, 29);
        assert_eq!(sb.bmapstart, 70);

        let read = Superblock::read(&image_with(sb, 100), &layout).unwrap();
        assert_eq!(read, sb);
    }

    #[test]
    fn rejects_wrong_log_size() {
        let layout = Layout::XV6;
        let mut sb = Superblock::expected(&layout, 100);
        sb.nlog = 31;

        let err = Superblock::read(&image_with(sb, 100), &layout).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(
            err,
            FsError::SuperblockField {
                field: "nlog",
                expected: 30,
                actual: 31
            }
        ));
    }

    #[test]
    fn each_field_is_checked_against_the_layout() {
        let layout = Layout::XV6;
        let honest = Superblock::expected(&layout, 100);
        let corruptions: [(&str, u32, fn(&mut Superblock)); 5] = [
            ("nblocks", 29, |sb| sb.nblocks = 30),
            ("logstart", 2, |sb| sb.logstart = 3),
            ("inodestart", 32, |sb| sb.inodestart = 31),
            ("bmapstart", 70, |sb| sb.bmapstart = 69),
            ("ninodes", 600, |sb| sb.ninodes = 200),
        ];

        for (name, want, corrupt) in corruptions {
            let mut sb = honest;
            corrupt(&mut sb);
            let got = sb.fields().into_iter().find(|&(f, _)| f == name).unwrap().1;

            let err = Superblock::read(&image_with(sb, 100), &layout).unwrap_err();
            match err {
                FsError::SuperblockField {
                    field,
                    expected,
                    actual,
                } => {
                    assert_eq!(field, name);
                    assert_eq!(expected, want, "{name}");
                    assert_eq!(actual, got, "{name}");
                }
                other => panic!("{name}: unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn first_bad_field_wins() {
        let layout = Layout::XV6;
        let mut sb = Superblock::expected(&layout, 100);
        sb.ninodes = 1;
        sb.logstart = 0;

        let err = Superblock::read(&image_with(sb, 100), &layout).unwrap_err();
        assert!(matches!(
            err,
            FsError::SuperblockField {
                field: "logstart",
                ..
            }
        ));
    }

    #[test]
    fn refuses_an_image_cut_into_other_block_sizes() {
        let image = RawImage::from_bytes(vec![0u8; 64], 16).unwrap();
        let err = Superblock::read(&image, &Layout::XV6).unwrap_err();
        assert!(matches!(err, FsError::InvalidLayout(_)));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn rejects_size_that_disagrees_with_the_file() {
        let layout = Layout::XV6;
        let sb = Superblock::expected(&layout, 120);
        let err = Superblock::read(&image_with(sb, 100), &layout).unwrap_err();
        assert!(matches!(err, FsError::SuperblockField { field: "size", .. }));
    }

    #[test]
    fn rejects_dirty_padding() {
        let layout = Layout::XV6;
        let mut image = vec![0u8; 100 * 1024];
        let sb = Superblock::expected(&layout, 100);
        image[1024..1024 + SUPERBLOCK_SIZE].copy_from_slice(&sb.encode());
        image[1024 + 500] = 0xAA;

        let image = RawImage::from_bytes(image, 1024).unwrap();
        let err = Superblock::read(&image, &layout).unwrap_err();
        assert!(matches!(
            err,
            FsError::SuperblockPadding {
                offset: 500,
                value: 0xAA
            }
        ));
    }

    #[test]
    fn decode_checks_length() {
        let err = Superblock::decode(&[0u8; 27]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    }
}
