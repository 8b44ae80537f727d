//! Offline checker for xv6-style filesystem images.
//!
//! An image is a flat run of fixed-size blocks: boot block, superblock, log,
//! inode table, a single free-block bitmap, then data. [`inspect`] decodes
//! each region in that order and cross-checks it against [`Layout`], failing
//! on the first structural defect. Bitmap disagreements are collected instead,
//! see [`BitmapMode`].

pub mod bitmap;
pub mod check;
pub mod dir;
pub mod error;
pub mod image;
pub mod inode;
pub mod layout;
pub mod superblock;
pub mod usage;
mod util;

pub use bitmap::{BitmapMismatch, BitmapMode};
pub use check::{CheckOptions, Inspection, inspect};
pub use dir::{DirEntry, DirectoryTree, TreeNode};
pub use error::{Corruption, ErrorKind, FsError, Result};
pub use image::RawImage;
pub use inode::{DiskInode, Inode, InodeTable, InodeType};
pub use layout::Layout;
pub use superblock::Superblock;
pub use usage::{Owner, UsedBlocks};
