use std::fmt;

use thiserror::Error;

use crate::bitmap::BitmapMismatch;
use crate::usage::Owner;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Block {block} is out of range (image has {blocks} blocks)")]
    OutOfRange { block: u64, blocks: u64 },
    #[error("{what} must be exactly {expected} bytes, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Image length {len} is not a multiple of the block size {block_size}")]
    ImageLength { len: u64, block_size: usize },
    #[error("Invalid layout: {0}")]
    InvalidLayout(&'static str),
    #[error("Superblock field `{field}` is {actual}, expected {expected}")]
    SuperblockField {
        field: &'static str,
        expected: u32,
        actual: u32,
    },
    #[error("Superblock padding is not zero (byte {offset} is {value:#04x})")]
    SuperblockPadding { offset: usize, value: u8 },
    #[error("Inode {inode} has unknown type {value}")]
    UnknownType { inode: u32, value: u16 },
    #[error(
        "Indirect block {block} of inode {inode} has garbage after its terminator (offset {offset}, value {value})"
    )]
    IndirectGarbage {
        inode: u32,
        block: u32,
        offset: usize,
        value: u32,
    },
    #[error("Inode {inode} is corrupted: {reason}")]
    Corruption { inode: u32, reason: Corruption },
    #[error("Dangling inode {inode} after the end of the allocated range at {boundary}")]
    DanglingInode { inode: u32, boundary: u32 },
    #[error("Block {block} is already used by {first}, claimed again by {second}")]
    DoubleAllocation {
        block: u32,
        first: Owner,
        second: Owner,
    },
    #[error("{} bitmap bit(s) disagree with the used block set", .0.len())]
    BitmapMismatch(Vec<BitmapMismatch>),
}

pub type Result<T> = std::result::Result<T, FsError>;

/// What an individual inode (or directory) got wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    DeviceNumbers { major: u16, minor: u16 },
    PrematureIndirect { direct: usize },
    NoLinks,
    DirectGap { slot: usize },
    RootNotDirectory,
    MissingEntryTarget { name: String, target: u16 },
    DirectoryLoop { name: String, target: u16 },
    BadDotEntry { name: String, target: u16, expected: u32 },
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::DeviceNumbers { major, minor } => {
                write!(f, "major/minor garbage ({major}/{minor}) on a non-device inode")
            }
            Corruption::PrematureIndirect { direct } => write!(
                f,
                "uses its indirect block with only {direct} direct blocks"
            ),
            Corruption::NoLinks => write!(f, "no links"),
            Corruption::DirectGap { slot } => {
                write!(f, "direct slot {slot} is set after the terminator")
            }
            Corruption::RootNotDirectory => write!(f, "root inode is not a directory"),
            Corruption::MissingEntryTarget { name, target } => {
                write!(f, "entry {name:?} points at unallocated inode {target}")
            }
            Corruption::DirectoryLoop { name, target } => {
                write!(f, "entry {name:?} re-enters ancestor directory {target}")
            }
            Corruption::BadDotEntry {
                name,
                target,
                expected,
            } => write!(f, "entry {name:?} points at {target}, expected {expected}"),
        }
    }
}

/// Coarse classification of [`FsError`], one class per kind of image defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    OutOfRange,
    SizeMismatch,
    Format,
    Corruption,
    DanglingInode,
    DoubleAllocation,
    BitmapMismatch,
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::Io(_) => ErrorKind::Io,
            FsError::OutOfRange { .. } => ErrorKind::OutOfRange,
            FsError::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            FsError::ImageLength { .. }
            | FsError::InvalidLayout(_)
            | FsError::SuperblockField { .. }
            | FsError::SuperblockPadding { .. }
            | FsError::UnknownType { .. }
            | FsError::IndirectGarbage { .. } => ErrorKind::Format,
            FsError::Corruption { .. } => ErrorKind::Corruption,
            FsError::DanglingInode { .. } => ErrorKind::DanglingInode,
            FsError::DoubleAllocation { .. } => ErrorKind::DoubleAllocation,
            FsError::BitmapMismatch(_) => ErrorKind::BitmapMismatch,
        }
    }
}
