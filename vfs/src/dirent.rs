use alloc::string::String;

/// 目录读取返回的目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Inode number
    pub inode: u64,
    pub ty: DirEntryType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Block,
    Char,
    Directory,
    Fifo,
    SymLink,
    #[default]
    Regular,
}

impl DirEntryType {
    #[inline]
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}
