#![allow(dead_code)]

use xv6fs::dir::DIRENT_SIZE;
use xv6fs::inode::{INODE_SIZE, NDIRECT};
use xv6fs::superblock::SUPERBLOCK_BLOCK;
use xv6fs::{DirEntry, DiskInode, InodeType, Layout, Superblock};

/// Writes well-formed images the way the xv6 `mkfs` lays them out: inodes
/// numbered from 1, data blocks handed out in order after the bitmap block.
pub struct ImageBuilder {
    pub layout: Layout,
    bytes: Vec<u8>,
    next_block: u32,
    next_inum: u32,
}

pub const ROOT: u32 = 1;

impl ImageBuilder {
    pub fn new(layout: Layout, size: u32) -> Self {
        let mut builder = ImageBuilder {
            layout,
            bytes: vec![0u8; size as usize * layout.block_size],
            next_block: layout.metadata_blocks(),
            next_inum: ROOT,
        };

        let sb = Superblock::expected(&layout, size).encode();
        builder.block_mut(SUPERBLOCK_BLOCK)[..sb.len()].copy_from_slice(&sb);

        let root = builder.new_dir();
        assert_eq!(root, ROOT);
        builder.link(root, ".", root);
        builder.link(root, "..", root);
        builder
    }

    pub fn next_block(&self) -> u32 {
        self.next_block
    }

    pub fn block_mut(&mut self, block: u32) -> &mut [u8] {
        let start = block as usize * self.layout.block_size;
        &mut self.bytes[start..start + self.layout.block_size]
    }

    pub fn alloc(&mut self) -> u32 {
        let block = self.next_block;
        self.next_block += 1;
        block
    }

    pub fn inode(&self, inum: u32) -> DiskInode {
        let (block, offset) = self.layout.inode_position(inum);
        let start = block as usize * self.layout.block_size + offset;
        DiskInode::decode(&self.bytes[start..start + INODE_SIZE]).unwrap()
    }

    pub fn set_inode(&mut self, inum: u32, disk: &DiskInode) {
        let (block, offset) = self.layout.inode_position(inum);
        self.block_mut(block)[offset..offset + INODE_SIZE].copy_from_slice(&disk.encode());
    }

    pub fn update_inode(&mut self, inum: u32, f: impl FnOnce(&mut DiskInode)) {
        let mut disk = self.inode(inum);
        f(&mut disk);
        self.set_inode(inum, &disk);
    }

    fn new_inode(&mut self, disk: DiskInode) -> u32 {
        let inum = self.next_inum;
        self.next_inum += 1;
        self.set_inode(inum, &disk);
        inum
    }

    fn new_dir(&mut self) -> u32 {
        let block = self.alloc();
        let mut disk = DiskInode {
            kind: InodeType::Directory.raw(),
            nlink: 1,
            ..DiskInode::default()
        };
        disk.addrs[0] = block;
        self.new_inode(disk)
    }

    /// Appends an entry to the directory's single data block.
    pub fn link(&mut self, dir: u32, name: &str, inum: u32) {
        let mut disk = self.inode(dir);
        let slot = disk.size as usize / DIRENT_SIZE;
        disk.size += DIRENT_SIZE as u32;
        self.set_inode(dir, &disk);

        let entry = DirEntry::new(inum as u16, name).encode();
        let block = self.block_mut(disk.addrs[0]);
        block[slot * DIRENT_SIZE..(slot + 1) * DIRENT_SIZE].copy_from_slice(&entry);
    }

    pub fn dir(&mut self, parent: u32, name: &str) -> u32 {
        let inum = self.new_dir();
        self.link(inum, ".", inum);
        self.link(inum, "..", parent);
        self.link(parent, name, inum);
        inum
    }

    /// A regular file spanning `blocks` data blocks; past the direct slots
    /// they go through an indirect block.
    pub fn file(&mut self, parent: u32, name: &str, blocks: usize) -> u32 {
        let mut disk = DiskInode {
            kind: InodeType::File.raw(),
            nlink: 1,
            size: (blocks * self.layout.block_size) as u32,
            ..DiskInode::default()
        };

        for slot in 0..blocks.min(NDIRECT) {
            disk.addrs[slot] = self.alloc();
            let fill = name.as_bytes()[0];
            self.block_mut(disk.addrs[slot]).fill(fill);
        }

        if blocks > NDIRECT {
            disk.indirect = self.alloc();
            let rest: Vec<u32> = (NDIRECT..blocks).map(|_| self.alloc()).collect();
            let indirect = self.block_mut(disk.indirect);
            for (i, block) in rest.iter().enumerate() {
                indirect[i * 4..i * 4 + 4].copy_from_slice(&block.to_le_bytes());
            }
        }

        let inum = self.new_inode(disk);
        self.link(parent, name, inum);
        inum
    }

    pub fn device(&mut self, parent: u32, name: &str, major: u16, minor: u16) -> u32 {
        let inum = self.new_inode(DiskInode {
            kind: InodeType::Device.raw(),
            major,
            minor,
            nlink: 1,
            ..DiskInode::default()
        });
        self.link(parent, name, inum);
        inum
    }

    /// Marks the metadata region and every allocated block in the bitmap.
    pub fn finish(mut self) -> Vec<u8> {
        let used = self.next_block;
        let bitmap = self.block_mut(self.layout.bitmap_start());
        for b in 0..used {
            bitmap[(b / 8) as usize] |= 1 << (b % 8);
        }
        self.bytes
    }
}

pub fn flip_bit(bytes: &mut [u8], layout: &Layout, bit: u32) {
    let start = layout.bitmap_start() as usize * layout.block_size;
    bytes[start + (bit / 8) as usize] ^= 1 << (bit % 8);
}

pub fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
