#![no_std]

extern crate alloc;

/* sfs 的整体架构，自上而下 */

// VFS 接口层：文件系统类型、挂载实例
mod fs_type;

// 索引节点层：内存中的索引节点句柄
mod inode;

// 路径操作层：创建、删除、改名
mod ops;

// 目录项与文件内容的读写
mod dir;
mod file;

// 磁盘块管理器层：格式化、挂载、块与索引节点的分配
mod sfs;

// 分配器接口
mod allocator;

// 磁盘数据结构层：表示磁盘文件系统的数据结构
pub mod layout;

pub use self::{
    allocator::BlockAllocator,
    fs_type::{SfsMount, SfsType},
    inode::SfsInode,
    layout::{DirEntry, DiskInode, DiskInodeKind, SuperBlock},
    sfs::SimpleFileSystem,
};

/// "SFS\0"
pub const MAGIC: u32 = 0x5346_5300;
pub const VERSION: u32 = 1;
pub const BLOCK_SIZE: usize = 4096;
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;
/// 直接索引块个数
pub const DIRECT_COUNT: usize = 12;
/// 文件名缓冲区长度，名称须短于它
pub const NAME_CAP: usize = 255;
pub const ROOT_INODE: u32 = 1;
/// 每8个块配1个索引节点块
pub const INODE_RATIO: u32 = 8;
pub const DEFAULT_LABEL: &str = "SFS";
/// 单个文件的最大字节数
pub const MAX_FILE_SIZE: usize = DIRECT_COUNT * BLOCK_SIZE;

type DataBlock = [u8; BLOCK_SIZE];
