//! 目录项的查找、插入、删除与遍历
//!
//! 目录项紧密排列在目录的直接块中，槽位`inode == 0`表示空闲。
//! 目录的`size`只随插入、删除增减，不代表实际存在的目录项数。

use alloc::sync::Arc;
use alloc::vec::Vec;

use vfs::path::Path;
use vfs::{DirEntryType, Error, Result};

use crate::layout::{DIRENTS_PER_BLOCK, DirEntry};
use crate::sfs::Volume;
use crate::{DIRECT_COUNT, NAME_CAP, ROOT_INODE, SfsInode, SimpleFileSystem};

/// 目录项的位置
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirentPos {
    pub ino: u32,
    pub block_id: u32,
    pub slot: usize,
}

#[inline]
fn dirent_at(data: &[u8], slot: usize) -> DirEntry {
    let mut entry = DirEntry::default();
    let offset = slot * DirEntry::SIZE;
    entry
        .as_bytes_mut()
        .copy_from_slice(&data[offset..offset + DirEntry::SIZE]);
    entry
}

impl SimpleFileSystem {
    /// 在目录`dir`中查找`name`
    pub fn lookup(&self, dir: &mut SfsInode, name: &str) -> Result<SfsInode> {
        let _volume = self.volume.lock();
        self.lookup_in(dir, name)
    }

    /// 插入目录项，同名项已存在时失败
    pub fn add_dirent(&self, dir: &mut SfsInode, name: &str, ino: u32) -> Result<()> {
        self.add_dirent_in(&mut self.volume.lock(), dir, name, ino)
    }

    /// 删除目录项，返回它指向的索引节点号
    pub fn remove_dirent(&self, dir: &mut SfsInode, name: &str) -> Result<u32> {
        let _volume = self.volume.lock();
        self.remove_dirent_in(dir, name)
    }

    /// 从第`*offset`个槽位开始，读取至多`max`个目录项
    pub fn readdir(
        &self,
        dir: &mut SfsInode,
        offset: &mut usize,
        max: usize,
    ) -> Result<Vec<vfs::DirEntry>> {
        let _volume = self.volume.lock();
        self.readdir_in(dir, offset, max)
    }

    /// 从根目录出发逐级查找
    pub fn resolve_path(fs: &Arc<Self>, path: &str) -> Result<SfsInode> {
        let _volume = fs.volume.lock();
        Self::resolve_in(fs, path)
    }
}

impl SimpleFileSystem {
    pub(crate) fn resolve_in(fs: &Arc<Self>, path: &str) -> Result<SfsInode> {
        let mut inode = SfsInode::load(fs, ROOT_INODE)?;
        for name in path.components() {
            if name.len() >= NAME_CAP {
                return Err(Error::NotFound);
            }
            inode = fs.lookup_in(&mut inode, name)?;
        }
        Ok(inode)
    }

    pub(crate) fn lookup_in(&self, dir: &mut SfsInode, name: &str) -> Result<SfsInode> {
        let pos = self.find_dirent(dir, name)?.ok_or(Error::NotFound)?;
        SfsInode::load(dir.fs(), pos.ino)
    }

    pub(crate) fn find_dirent(&self, dir: &mut SfsInode, name: &str) -> Result<Option<DirentPos>> {
        dir.refresh()?;
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }
        if !DirEntry::is_valid_name(name) {
            return Ok(None);
        }

        for block_id in dir.disk().data_blocks() {
            let found = self.cache.get(&self.device, block_id as usize)?.map(|data| {
                (0..DIRENTS_PER_BLOCK).find_map(|slot| {
                    let entry = dirent_at(data, slot);
                    (!entry.is_empty() && entry.name_bytes() == name.as_bytes())
                        .then_some((entry.inode(), slot))
                })
            });

            if let Some((ino, slot)) = found {
                return Ok(Some(DirentPos {
                    ino,
                    block_id,
                    slot,
                }));
            }
        }

        Ok(None)
    }

    pub(crate) fn add_dirent_in(
        &self,
        volume: &mut Volume,
        dir: &mut SfsInode,
        name: &str,
        ino: u32,
    ) -> Result<()> {
        dir.refresh()?;
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }
        let entry = DirEntry::new(name, ino).ok_or(Error::InvalidArgument)?;

        // 扫描全部已分配的块：既要排除重名，也要找到第一个空槽位
        let mut vacant = None;
        let mut unallocated = None;
        for block_index in 0..DIRECT_COUNT {
            let block_id = dir.disk().block_id(block_index);
            if block_id == 0 {
                unallocated.get_or_insert(block_index);
                continue;
            }

            let (duplicate, empty) =
                self.cache.get(&self.device, block_id as usize)?.map(|data| {
                    let mut duplicate = false;
                    let mut empty = None;
                    for slot in 0..DIRENTS_PER_BLOCK {
                        let entry = dirent_at(data, slot);
                        if entry.is_empty() {
                            empty.get_or_insert(slot);
                        } else if entry.name_bytes() == name.as_bytes() {
                            duplicate = true;
                            break;
                        }
                    }
                    (duplicate, empty)
                });

            if duplicate {
                return Err(Error::AlreadyExists);
            }
            if vacant.is_none() {
                vacant = empty.map(|slot| (block_id, slot));
            }
        }

        let (block_id, slot) = match (vacant, unallocated) {
            (Some(pos), _) => pos,
            (None, Some(block_index)) => {
                let block_id = volume.alloc_block(&self.device)?;
                let disk = dir.disk_mut();
                disk.direct[block_index] = block_id;
                disk.blocks += 1;
                (block_id, 0)
            }
            (None, None) => {
                log::debug!("directory {} is full", dir.ino());
                return Err(Error::OutOfSpace);
            }
        };

        let buffer = self.cache.get(&self.device, block_id as usize)?;
        buffer.write_at(slot * DirEntry::SIZE, entry.as_bytes())?;
        buffer.release()?;

        dir.disk_mut().size += DirEntry::SIZE as u32;
        dir.sync()
    }

    pub(crate) fn remove_dirent_in(&self, dir: &mut SfsInode, name: &str) -> Result<u32> {
        let pos = self.find_dirent(dir, name)?.ok_or(Error::NotFound)?;

        let buffer = self.cache.get(&self.device, pos.block_id as usize)?;
        buffer.map_mut(|data| {
            let offset = pos.slot * DirEntry::SIZE;
            let mut entry = dirent_at(data, pos.slot);
            entry.clear();
            data[offset..offset + DirEntry::SIZE].copy_from_slice(entry.as_bytes());
        });
        buffer.release()?;

        let disk = dir.disk_mut();
        disk.size = disk.size.saturating_sub(DirEntry::SIZE as u32);
        dir.sync()?;

        Ok(pos.ino)
    }

    /// 目录中是否没有任何目录项
    pub(crate) fn is_empty_dir(&self, dir: &mut SfsInode) -> Result<bool> {
        dir.refresh()?;
        for block_id in dir.disk().data_blocks() {
            let occupied = self
                .cache
                .get(&self.device, block_id as usize)?
                .map(|data| (0..DIRENTS_PER_BLOCK).any(|slot| !dirent_at(data, slot).is_empty()));
            if occupied {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn readdir_in(
        &self,
        dir: &mut SfsInode,
        offset: &mut usize,
        max: usize,
    ) -> Result<Vec<vfs::DirEntry>> {
        dir.refresh()?;
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }

        let mut entries = Vec::new();
        while *offset < DIRECT_COUNT * DIRENTS_PER_BLOCK && entries.len() < max {
            let block_index = *offset / DIRENTS_PER_BLOCK;
            let block_id = dir.disk().block_id(block_index);
            if block_id == 0 {
                *offset = (block_index + 1) * DIRENTS_PER_BLOCK;
                continue;
            }

            let buffer = self.cache.get(&self.device, block_id as usize)?;
            let mut slot = *offset % DIRENTS_PER_BLOCK;
            while slot < DIRENTS_PER_BLOCK && entries.len() < max {
                let entry = buffer.map(|data| dirent_at(data, slot));
                slot += 1;
                *offset += 1;
                if entry.is_empty() {
                    continue;
                }

                let ty = self
                    .read_disk_inode(entry.inode())
                    .ok()
                    .and_then(|disk| disk.kind())
                    .map(DirEntryType::from)
                    .unwrap_or_default();
                entries.push(vfs::DirEntry {
                    inode: entry.inode() as u64,
                    ty,
                    name: entry.name().into_owned(),
                });
            }
        }

        Ok(entries)
    }
}
