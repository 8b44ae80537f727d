use bytemuck::{Pod, Zeroable};
use tracing::trace;
use unix_path::{Path, PathBuf};

use crate::error::{Corruption, FsError, Result};
use crate::image::RawImage;
use crate::inode::{Inode, InodeTable};
use crate::util::{decode_pod, trim_nul};

pub const DIRSIZ: usize = 14;
pub const DIRENT_SIZE: usize = std::mem::size_of::<DiskDirent>();

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DiskDirent {
    pub inum: u16,
    pub name: [u8; DIRSIZ],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inum: u16,
    pub name: String,
}

impl DirEntry {
    pub fn new(inum: u16, name: impl Into<String>) -> Self {
        DirEntry {
            inum,
            name: name.into(),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let raw: DiskDirent = decode_pod(bytes, "directory entry")?;
        Ok(DirEntry {
            inum: raw.inum,
            name: trim_nul(&raw.name),
        })
    }

    /// Names longer than [`DIRSIZ`] bytes are truncated.
    pub fn encode(&self) -> [u8; DIRENT_SIZE] {
        let mut raw = DiskDirent {
            inum: self.inum,
            name: [0; DIRSIZ],
        };
        let name = self.name.as_bytes();
        let len = name.len().min(DIRSIZ);
        raw.name[..len].copy_from_slice(&name[..len]);
        bytemuck::cast(raw)
    }

    pub fn is_dot(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Entries of one directory block, up to the first entry with inode number zero.
pub fn read_dir_block(block: &[u8]) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for chunk in block.chunks_exact(DIRENT_SIZE) {
        let entry = DirEntry::decode(chunk)?;
        if entry.inum == 0 {
            break;
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Leaf {
        entry: DirEntry,
        path: PathBuf,
    },
    Directory {
        entry: DirEntry,
        path: PathBuf,
        children: Vec<TreeNode>,
    },
}

impl TreeNode {
    pub fn entry(&self) -> &DirEntry {
        match self {
            TreeNode::Leaf { entry, .. } | TreeNode::Directory { entry, .. } => entry,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            TreeNode::Leaf { path, .. } | TreeNode::Directory { path, .. } => path,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Leaf { .. } => &[],
            TreeNode::Directory { children, .. } => children,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, TreeNode::Directory { .. })
    }

    /// Depth-first, parents before children, with the depth below this node.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(usize, &'a TreeNode)) {
        self.visit_at(0, f);
    }

    fn visit_at<'a>(&'a self, depth: usize, f: &mut impl FnMut(usize, &'a TreeNode)) {
        f(depth, self);
        for child in self.children() {
            child.visit_at(depth + 1, f);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTree {
    pub root: TreeNode,
}

impl DirectoryTree {
    /// Walks from the root inode. The table guarantees the root is a directory.
    pub fn walk(image: &RawImage, table: &InodeTable) -> Result<Self> {
        let root = table.root();
        let path = Path::new("/").to_path_buf();
        let mut ancestors = vec![root.inum];
        let children = walk_dir(image, table, root, root.inum, &path, &mut ancestors)?;

        Ok(DirectoryTree {
            root: TreeNode::Directory {
                entry: DirEntry::new(root.inum as u16, "/"),
                path,
                children,
            },
        })
    }

    /// Number of nodes below the root.
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.root.visit(&mut |_, _| count += 1);
        count - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.children().is_empty()
    }
}

fn walk_dir(
    image: &RawImage,
    table: &InodeTable,
    dir: &Inode,
    parent: u32,
    path: &Path,
    ancestors: &mut Vec<u32>,
) -> Result<Vec<TreeNode>> {
    assert!(dir.is_dir(), "walking non-directory {dir}");

    let corrupt = |reason| FsError::Corruption {
        inode: dir.inum,
        reason,
    };

    let mut nodes = Vec::new();
    for &block in dir.direct() {
        for entry in read_dir_block(image.block(block)?)? {
            trace!(dir = dir.inum, inum = entry.inum, name = %entry.name, "entry");

            if entry.is_dot() {
                let expected = if entry.name == "." { dir.inum } else { parent };
                if u32::from(entry.inum) != expected {
                    return Err(corrupt(Corruption::BadDotEntry {
                        name: entry.name,
                        target: entry.inum,
                        expected,
                    }));
                }
                continue;
            }

            let Some(target) = table.get(entry.inum.into()) else {
                return Err(corrupt(Corruption::MissingEntryTarget {
                    name: entry.name,
                    target: entry.inum,
                }));
            };

            let child_path = path.join(&entry.name);
            if !target.is_dir() {
                nodes.push(TreeNode::Leaf {
                    entry,
                    path: child_path,
                });
                continue;
            }

            if ancestors.contains(&target.inum) {
                return Err(corrupt(Corruption::DirectoryLoop {
                    name: entry.name,
                    target: entry.inum,
                }));
            }

            ancestors.push(target.inum);
            let children = walk_dir(image, table, target, dir.inum, &child_path, ancestors)?;
            ancestors.pop();

            nodes.push(TreeNode::Directory {
                entry,
                path: child_path,
                children,
            });
        }
    }

    Ok(nodes)
}
