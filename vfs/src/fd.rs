//! # 文件描述符层
//!
//! 描述符表中的项先被预留，再挂上打开的文件；
//! 预留后即视为占用，不会被再次分配。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use enumflags2::BitFlags;
use spin::Mutex;

use crate::config::{MAX_OPEN_FILES, STDIO_RESERVED};
use crate::{DirEntry, Error, FileSystem, Inode, OpenFlag, Result, Stat, Whence};

/// 打开的文件或目录
pub struct File {
    path: String,
    readable: bool,
    writable: bool,
    flags: BitFlags<OpenFlag>,
    /// **文件**内的偏移量
    offset: u64,
    /// 目录内已读取的目录项数
    dir_offset: usize,
    inode: Box<dyn Inode>,
    fs: Arc<dyn FileSystem>,
    closed: bool,
}

impl File {
    pub(crate) fn new(
        path: String,
        flags: BitFlags<OpenFlag>,
        inode: Box<dyn Inode>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let [readable, writable] = OpenFlag::access(flags);
        Self {
            path,
            readable,
            writable,
            flags,
            offset: 0,
            dir_offset: 0,
            inode,
            fs,
            closed: false,
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn readable(&self) -> bool {
        self.readable
    }

    #[inline]
    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.readable {
            return Err(Error::PermissionDenied);
        }
        if self.inode.is_dir() {
            return Err(Error::IsADirectory);
        }

        let len = self.inode.read_at(self.offset, buf)?;
        self.offset += len as u64;
        Ok(len)
    }

    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.writable {
            return Err(Error::PermissionDenied);
        }
        if self.flags.contains(OpenFlag::APPEND) {
            self.offset = self.inode.stat()?.size;
        }

        let len = self.inode.write_at(self.offset, buf)?;
        self.offset += len as u64;
        Ok(len)
    }

    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => self.offset,
            Whence::End => self.inode.stat()?.size,
        };
        let pos = i64::try_from(base)
            .ok()
            .and_then(|base| base.checked_add(offset))
            .filter(|&pos| pos >= 0)
            .ok_or(Error::InvalidArgument)?;

        self.offset = pos as u64;
        Ok(self.offset)
    }

    pub fn readdir(&mut self, max: usize) -> Result<Vec<DirEntry>> {
        if !self.inode.is_dir() {
            return Err(Error::NotADirectory);
        }
        self.inode.readdir(&mut self.dir_offset, max)
    }

    pub fn stat(&self) -> Result<Stat> {
        self.inode.stat()
    }

    pub fn sync(&mut self) -> Result<()> {
        self.inode.sync()?;
        self.fs.sync()
    }

    pub(crate) fn close(mut self) -> Result<()> {
        self.closed = true;
        self.inode.close()
    }
}

impl Drop for File {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.inode.close() {
            log::error!("close {:?} failed: {err}", self.path);
        }
    }
}

enum FdSlot {
    Free,
    /// 已分配但尚未挂上文件
    Reserved,
    Open(Arc<Mutex<File>>),
}

pub(crate) struct FdTable {
    slots: [FdSlot; MAX_OPEN_FILES],
}

impl FdTable {
    pub const fn new() -> Self {
        Self {
            slots: [const { FdSlot::Free }; MAX_OPEN_FILES],
        }
    }

    /// 预留最小的空闲描述符
    pub fn allocate(&mut self) -> Result<usize> {
        let fd = (STDIO_RESERVED..MAX_OPEN_FILES)
            .find(|&fd| matches!(self.slots[fd], FdSlot::Free))
            .ok_or(Error::OutOfMemory)?;
        self.slots[fd] = FdSlot::Reserved;
        Ok(fd)
    }

    /// 把文件挂到已预留的描述符上
    pub fn assign(&mut self, fd: usize, file: File) -> Result<()> {
        let slot = self.slot_mut(fd)?;
        if !matches!(slot, FdSlot::Reserved) {
            return Err(Error::InvalidArgument);
        }
        *slot = FdSlot::Open(Arc::new(Mutex::new(file)));
        Ok(())
    }

    pub fn get(&self, fd: usize) -> Result<Arc<Mutex<File>>> {
        match self.slots.get(fd) {
            Some(FdSlot::Open(file)) if fd >= STDIO_RESERVED => Ok(file.clone()),
            _ => Err(Error::InvalidArgument),
        }
    }

    /// 释放描述符，返回其上的文件(若有)
    pub fn free(&mut self, fd: usize) -> Result<Option<Arc<Mutex<File>>>> {
        let slot = self.slot_mut(fd)?;
        match core::mem::replace(slot, FdSlot::Free) {
            FdSlot::Free => Err(Error::InvalidArgument),
            FdSlot::Reserved => Ok(None),
            FdSlot::Open(file) => Ok(Some(file)),
        }
    }

    /// 正在使用的描述符
    pub fn used(&self) -> Vec<usize> {
        (STDIO_RESERVED..MAX_OPEN_FILES)
            .filter(|&fd| !matches!(self.slots[fd], FdSlot::Free))
            .collect()
    }

    fn slot_mut(&mut self, fd: usize) -> Result<&mut FdSlot> {
        if fd < STDIO_RESERVED {
            return Err(Error::InvalidArgument);
        }
        self.slots.get_mut(fd).ok_or(Error::InvalidArgument)
    }
}
