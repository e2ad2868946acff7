use crate::DirEntryType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    /// Inode number
    pub ino: u64,
    pub mode: DirEntryType,
    /// 权限位
    pub perm: u32,
    /// File size
    pub size: u64,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks
    pub blocks: u64,
    /// 硬链接个数
    pub links: u32,
    pub created: u32,
    pub modified: u32,
    pub accessed: u32,
}

impl Stat {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }
}
