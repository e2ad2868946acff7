//! 磁盘上的索引节点
//!
//! 只使用 [`DIRECT_COUNT`] 个直接索引块，
//! 间接索引块的字段仅占位，从不分配。

use core::mem;
use core::{ptr, slice};

use crate::{BLOCK_SIZE, DIRECT_COUNT};

pub const INODE_SIZE: usize = mem::size_of::<DiskInode>();
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

/// 类型位所在的掩码
const TYPE_MASK: u32 = 0xF000;

/// 权限位
pub mod perm {
    pub const READ: u32 = 0o4;
    pub const WRITE: u32 = 0o2;
    pub const EXEC: u32 = 0o1;
    pub const MASK: u32 = 0o7777;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct DiskInode {
    /// 类型与权限，为0表示槽位空闲
    pub mode: u32,
    // 不用usize是为了严控布局
    pub size: u32,
    /// 已分配的数据块数
    pub blocks: u32,
    /// 直接索引块，存储容量：DIRECT_COUNT * BLOCK_SIZE 字节
    pub direct: [u32; DIRECT_COUNT],
    /// 一级索引块，尚未支持
    pub indirect: u32,
    pub created_time: u32,
    pub modified_time: u32,
    pub accessed_time: u32,
    /// 硬链接个数
    pub links: u32,
    pub flags: u32,
    /// 槽位每分配一次加一，释放时保留，
    /// 用来识别指向已被重新分配的槽位的句柄
    pub generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DiskInodeKind {
    File = 0x1000,
    Directory = 0x4000,
    SymLink = 0x8000,
}

impl DiskInodeKind {
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & TYPE_MASK {
            0x1000 => Some(Self::File),
            0x4000 => Some(Self::Directory),
            0x8000 => Some(Self::SymLink),
            _ => None,
        }
    }
}

impl From<DiskInodeKind> for vfs::DirEntryType {
    fn from(kind: DiskInodeKind) -> Self {
        match kind {
            DiskInodeKind::File => Self::Regular,
            DiskInodeKind::Directory => Self::Directory,
            DiskInodeKind::SymLink => Self::SymLink,
        }
    }
}

impl DiskInode {
    #[inline]
    pub fn new(kind: DiskInodeKind, perm: u32) -> Self {
        Self {
            mode: kind as u32 | (perm & perm::MASK),
            links: 1,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.mode == 0
    }

    #[inline]
    pub fn kind(&self) -> Option<DiskInodeKind> {
        DiskInodeKind::from_mode(self.mode)
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind() == Some(DiskInodeKind::Directory)
    }

    #[inline]
    pub fn perm(&self) -> u32 {
        self.mode & perm::MASK
    }

    /// 第`block_index`个数据块的块号，未分配时为0
    #[inline]
    pub fn block_id(&self, block_index: usize) -> u32 {
        self.direct.get(block_index).copied().unwrap_or(0)
    }

    /// 已分配的数据块
    pub fn data_blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct.iter().copied().filter(|&id| id != 0)
    }

    /// 容纳`size`字节需要的数据块数
    #[inline]
    pub fn count_data_block(size: u32) -> usize {
        (size as usize).div_ceil(BLOCK_SIZE)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), INODE_SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), INODE_SIZE) }
    }
}
