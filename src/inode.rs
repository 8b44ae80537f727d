use std::fmt;

use bytemuck::{Pod, Zeroable};
use tracing::{debug, trace};

use crate::error::{Corruption, FsError, Result};
use crate::image::RawImage;
use crate::layout::Layout;
use crate::superblock::Superblock;
use crate::util::decode_pod;

pub const INODE_SIZE: usize = std::mem::size_of::<DiskInode>();
pub const NDIRECT: usize = 12;
pub const ROOT_INUM: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InodeType {
    Directory,
    File,
    Device,
    CgroupFile,
    CgroupDirectory,
    ProcFile,
    ProcDirectory,
}

impl InodeType {
    pub fn from_raw(value: u16) -> Option<Self> {
        Some(match value {
            1 => InodeType::Directory,
            2 => InodeType::File,
            3 => InodeType::Device,
            4 => InodeType::CgroupFile,
            5 => InodeType::CgroupDirectory,
            6 => InodeType::ProcFile,
            7 => InodeType::ProcDirectory,
            _ => return None,
        })
    }

    pub fn raw(self) -> u16 {
        match self {
            InodeType::Directory => 1,
            InodeType::File => 2,
            InodeType::Device => 3,
            InodeType::CgroupFile => 4,
            InodeType::CgroupDirectory => 5,
            InodeType::ProcFile => 6,
            InodeType::ProcDirectory => 7,
        }
    }
}

impl fmt::Display for InodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InodeType::Directory => "DIR",
            InodeType::File => "FILE",
            InodeType::Device => "DEV",
            InodeType::CgroupFile => "CGFILE",
            InodeType::CgroupDirectory => "CGDIR",
            InodeType::ProcFile => "PROCFILE",
            InodeType::ProcDirectory => "PROCDIR",
        })
    }
}

/// One 64-byte record of the inode table, exactly as stored.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DiskInode {
    pub kind: u16,
    pub major: u16,
    pub minor: u16,
    pub nlink: u16,
    pub size: u32,
    pub addrs: [u32; NDIRECT],
    pub indirect: u32,
}

impl DiskInode {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_pod(bytes, "inode record")
    }

    pub fn encode(&self) -> [u8; INODE_SIZE] {
        bytemuck::cast(*self)
    }

    pub fn is_blank(&self) -> bool {
        bytemuck::bytes_of(self).iter().all(|&b| b == 0)
    }
}

/// A live inode: known type, passed the per-inode checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub inum: u32,
    pub kind: InodeType,
    pub major: u16,
    pub minor: u16,
    pub nlink: u16,
    pub size: u32,
    pub addrs: [u32; NDIRECT],
    pub indirect: u32,
}

impl Inode {
    pub fn from_disk(inum: u32, disk: &DiskInode) -> Result<Self> {
        let kind = InodeType::from_raw(disk.kind).ok_or(FsError::UnknownType {
            inode: inum,
            value: disk.kind,
        })?;

        let inode = Inode {
            inum,
            kind,
            major: disk.major,
            minor: disk.minor,
            nlink: disk.nlink,
            size: disk.size,
            addrs: disk.addrs,
            indirect: disk.indirect,
        };
        inode.check()?;
        Ok(inode)
    }

    fn check(&self) -> Result<()> {
        let corrupt = |reason| FsError::Corruption {
            inode: self.inum,
            reason,
        };

        if self.kind != InodeType::Device && (self.major != 0 || self.minor != 0) {
            return Err(corrupt(Corruption::DeviceNumbers {
                major: self.major,
                minor: self.minor,
            }));
        }

        let direct = self.direct().len();
        if let Some(slot) = self.addrs[direct..].iter().position(|&a| a != 0) {
            return Err(corrupt(Corruption::DirectGap {
                slot: direct + slot,
            }));
        }

        if self.uses_indirect() && direct != NDIRECT {
            return Err(corrupt(Corruption::PrematureIndirect { direct }));
        }

        if self.nlink == 0 {
            return Err(corrupt(Corruption::NoLinks));
        }

        Ok(())
    }

    /// Direct addresses up to the first zero slot.
    pub fn direct(&self) -> &[u32] {
        let end = self.addrs.iter().position(|&a| a == 0).unwrap_or(NDIRECT);
        &self.addrs[..end]
    }

    pub fn uses_indirect(&self) -> bool {
        self.indirect != 0
    }

    pub fn is_dir(&self) -> bool {
        self.kind == InodeType::Directory
    }
}

impl fmt::Display for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == InodeType::Device {
            write!(
                f,
                "inode {} ({}, {}/{}, links: {}, size: {})",
                self.inum, self.kind, self.major, self.minor, self.nlink, self.size
            )
        } else {
            write!(
                f,
                "inode {} ({}, links: {}, size: {})",
                self.inum, self.kind, self.nlink, self.size
            )
        }
    }
}

/// Live inodes `1..boundary`, indexed by inode number.
#[derive(Debug, Clone)]
pub struct InodeTable {
    inodes: Vec<Inode>,
    boundary: u32,
}

impl InodeTable {
    pub fn read(image: &RawImage, layout: &Layout, sb: &Superblock) -> Result<Self> {
        layout.check_image(image)?;
        let mut inodes = Vec::new();
        let mut boundary = None;

        for inum in 0..sb.ninodes {
            let (block, offset) = layout.inode_position(inum);
            let block = image.block(block)?;
            let disk = DiskInode::decode(&block[offset..offset + INODE_SIZE])?;

            if let Some(end) = boundary {
                if !disk.is_blank() {
                    return Err(FsError::DanglingInode {
                        inode: inum,
                        boundary: end,
                    });
                }
                continue;
            }

            if inum == 0 {
                continue;
            }

            if disk.kind == 0 {
                debug!(boundary = inum, "end of allocated inodes");
                boundary = Some(inum);
                continue;
            }

            let inode = Inode::from_disk(inum, &disk)?;
            trace!(%inode, "decoded");
            inodes.push(inode);
        }

        let table = InodeTable {
            inodes,
            boundary: boundary.unwrap_or(sb.ninodes),
        };

        if !table.get(ROOT_INUM).is_some_and(Inode::is_dir) {
            return Err(FsError::Corruption {
                inode: ROOT_INUM,
                reason: Corruption::RootNotDirectory,
            });
        }

        Ok(table)
    }

    pub fn get(&self, inum: u32) -> Option<&Inode> {
        let index = inum.checked_sub(1)?;
        self.inodes.get(index as usize)
    }

    pub fn root(&self) -> &Inode {
        &self.inodes[0]
    }

    /// First unallocated inode number.
    pub fn boundary(&self) -> u32 {
        self.boundary
    }

    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Inode> {
        self.inodes.iter()
    }
}
