use alloc::borrow::Cow;
use alloc::string::String;
use core::{ptr, slice};

use crate::{BLOCK_SIZE, NAME_CAP};

pub const DIRENTS_PER_BLOCK: usize = BLOCK_SIZE / DirEntry::SIZE;

/// 目录项，把名称映射到索引节点号
#[derive(Clone)]
#[repr(C)]
pub struct DirEntry {
    /// 为0表示空槽位或已删除
    inode: u32,
    rec_len: u16,
    name_len: u16,
    // 最后一字节留给 \0
    name: [u8; NAME_CAP],
    _pad: u8,
}

impl DirEntry {
    /// 目录项大小恒为264字节
    pub const SIZE: usize = 264;

    /// 名称为空、含`/`或不短于[`NAME_CAP`]时返回`None`
    pub fn new(name: &str, inode: u32) -> Option<Self> {
        if !Self::is_valid_name(name) {
            return None;
        }

        let bytes = name.as_bytes();
        let mut entry = Self::default();
        entry.inode = inode;
        entry.rec_len = Self::SIZE as u16;
        entry.name_len = bytes.len() as u16;
        entry.name[..bytes.len()].copy_from_slice(bytes);

        Some(entry)
    }

    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && name.len() < NAME_CAP && !name.contains('/')
    }

    #[inline]
    pub fn inode(&self) -> u32 {
        self.inode
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inode == 0
    }

    /// 删除后只清空索引节点号，名称保留
    #[inline]
    pub fn clear(&mut self) {
        self.inode = 0;
    }

    pub fn name_bytes(&self) -> &[u8] {
        let len = (self.name_len as usize).min(NAME_CAP);
        &self.name[..len]
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), Self::SIZE) }
    }
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            inode: 0,
            rec_len: 0,
            name_len: 0,
            name: [0; NAME_CAP],
            _pad: 0,
        }
    }
}

impl core::fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirEntry")
            .field("inode", &self.inode)
            .field("name", &self.name())
            .finish()
    }
}
