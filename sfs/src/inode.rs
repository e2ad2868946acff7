//! # 索引节点层
//!
//! [`SfsInode`]持有磁盘索引节点的内存副本，
//! 修改后标记为脏，析构或显式同步时写回。
//! 未修改的副本在每次操作前重新读盘，
//! 因此同一索引节点的多个句柄可以交替使用。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use vfs::{DirEntry, DirEntryType, Error, Inode, Result, Stat};

use crate::{BLOCK_SIZE, DiskInode, SimpleFileSystem};

pub struct SfsInode {
    fs: Arc<SimpleFileSystem>,
    ino: u32,
    disk: DiskInode,
    /// 内存副本是否有未写回的修改
    dirty: bool,
}

impl SfsInode {
    pub(crate) fn load(fs: &Arc<SimpleFileSystem>, ino: u32) -> Result<Self> {
        let disk = fs.read_disk_inode(ino)?;
        if disk.is_free() {
            return Err(Error::NotFound);
        }

        Ok(Self {
            fs: fs.clone(),
            ino,
            disk,
            dirty: false,
        })
    }

    #[inline]
    pub fn ino(&self) -> u32 {
        self.ino
    }

    #[inline]
    pub fn fs(&self) -> &Arc<SimpleFileSystem> {
        &self.fs
    }

    #[inline]
    pub fn disk(&self) -> &DiskInode {
        &self.disk
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.disk.is_dir()
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.disk.size
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 取得可修改的副本，并标记为脏
    #[inline]
    pub(crate) fn disk_mut(&mut self) -> &mut DiskInode {
        self.dirty = true;
        &mut self.disk
    }

    /// 槽位仍属于本句柄时，读出磁盘上的副本
    fn reload(&self) -> Result<DiskInode> {
        let disk = self.fs.read_disk_inode(self.ino)?;
        if disk.is_free() || disk.generation != self.disk.generation {
            return Err(Error::NotFound);
        }
        Ok(disk)
    }

    /// 副本未被修改时重新读盘，
    /// 索引节点已被释放(或释放后又分配给别的文件)时返回[`Error::NotFound`]
    pub(crate) fn refresh(&mut self) -> Result<()> {
        if !self.dirty {
            self.disk = self.reload()?;
        }
        Ok(())
    }

    /// 丢弃未写回的修改，用于索引节点被释放之后
    #[inline]
    pub(crate) fn discard(&mut self) {
        self.dirty = false;
    }

    pub fn sync(&mut self) -> Result<()> {
        if self.dirty {
            self.fs.write_disk_inode(self.ino, &self.disk)?;
            self.dirty = false;
        }
        Ok(())
    }

    fn to_stat(&self, disk: &DiskInode) -> Stat {
        Stat {
            ino: self.ino as u64,
            mode: disk.kind().map(DirEntryType::from).unwrap_or_default(),
            perm: disk.perm(),
            size: disk.size as u64,
            block_size: BLOCK_SIZE as u64,
            blocks: disk.blocks as u64,
            links: disk.links,
            created: disk.created_time,
            modified: disk.modified_time,
            accessed: disk.accessed_time,
        }
    }
}

impl Drop for SfsInode {
    fn drop(&mut self) {
        if let Err(err) = self.sync() {
            log::error!("write back inode {} failed: {err}", self.ino);
        }
    }
}

impl fmt::Debug for SfsInode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SfsInode")
            .field("ino", &self.ino)
            .field("disk", &self.disk)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Inode for SfsInode {
    #[inline]
    fn ino(&self) -> u64 {
        self.ino as u64
    }

    fn kind(&self) -> DirEntryType {
        self.disk.kind().map(DirEntryType::from).unwrap_or_default()
    }

    fn stat(&self) -> Result<Stat> {
        if self.dirty {
            return Ok(self.to_stat(&self.disk));
        }
        let disk = self.reload()?;
        Ok(self.to_stat(&disk))
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let fs = self.fs.clone();
        fs.read_file(self, offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize> {
        let fs = self.fs.clone();
        fs.write_file(self, offset, buf)
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let fs = self.fs.clone();
        fs.truncate(self, size)
    }

    fn readdir(&mut self, offset: &mut usize, max: usize) -> Result<Vec<DirEntry>> {
        let fs = self.fs.clone();
        fs.readdir(self, offset, max)
    }

    fn sync(&mut self) -> Result<()> {
        SfsInode::sync(self)
    }
}
