//! # 磁盘数据结构层
//!
//! sfs 的磁盘布局：
//! 超级块 | 位图 | 索引节点表 | 数据块区域
//!
//! 所有结构都以小端序、`#[repr(C)]`布局存放，
//! 通过`as_bytes`/`as_bytes_mut`与块缓冲交换数据。

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{DiskInode, DiskInodeKind, INODE_SIZE, INODES_PER_BLOCK, perm};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::{DIRENTS_PER_BLOCK, DirEntry};
