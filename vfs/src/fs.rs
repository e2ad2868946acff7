//! 文件系统需要实现的接口
//!
//! - [`FileSystemType`]：文件系统类型，负责格式化与挂载
//! - [`FileSystem`]：已挂载的文件系统实例，提供按路径的操作
//! - [`Inode`]：打开的文件或目录，提供按偏移的读写与目录遍历
//!
//! 路径参数均为挂载点内、以`/`开头的规范化路径。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::Device;
use enumflags2::BitFlags;

use crate::{DirEntry, DirEntryType, Error, MountFlag, Result, Stat};

pub trait FileSystemType: Send + Sync {
    /// 类型名，如`"sfs"`
    fn name(&self) -> &'static str;

    /// 在`device`上建立空的文件系统
    fn format(&self, device: Option<&Arc<Device>>) -> Result<()>;

    fn mount(
        &self,
        device: Option<Arc<Device>>,
        flags: BitFlags<MountFlag>,
    ) -> Result<Arc<dyn FileSystem>>;
}

pub trait FileSystem: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// 底层块设备，内存文件系统为空
    fn device(&self) -> Option<&Arc<Device>> {
        None
    }

    /// 找到路径对应的节点
    fn lookup(&self, path: &str) -> Result<Box<dyn Inode>>;

    /// 创建普通文件，`perm`为权限位
    fn create(&self, path: &str, perm: u32) -> Result<()>;

    fn mkdir(&self, path: &str, perm: u32) -> Result<()>;

    fn rmdir(&self, path: &str) -> Result<()>;

    fn unlink(&self, path: &str) -> Result<()>;

    fn rename(&self, old: &str, new: &str) -> Result<()>;

    fn stat(&self, path: &str) -> Result<Stat> {
        self.lookup(path)?.stat()
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    /// 卸载前调用，写回所有缓存
    fn unmount(&self) -> Result<()> {
        self.sync()
    }
}

/// 文件系统中的节点
///
/// 文件相关的操作默认返回[`Error::Unsupported`]，
/// 目录相关的操作默认返回[`Error::NotADirectory`]。
pub trait Inode: Send + Sync {
    fn ino(&self) -> u64;

    fn kind(&self) -> DirEntryType;

    fn stat(&self) -> Result<Stat>;

    #[allow(unused_variables)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Err(Error::Unsupported)
    }

    #[allow(unused_variables)]
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize> {
        Err(Error::Unsupported)
    }

    #[allow(unused_variables)]
    fn truncate(&mut self, size: u64) -> Result<()> {
        Err(Error::Unsupported)
    }

    /// 从第`*offset`个目录项开始读取至多`max`项，并推进`offset`
    #[allow(unused_variables)]
    fn readdir(&mut self, offset: &mut usize, max: usize) -> Result<Vec<DirEntry>> {
        Err(Error::NotADirectory)
    }

    /// 写回内存中的修改
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    /// 关闭时调用
    fn close(&mut self) -> Result<()> {
        self.sync()
    }

    fn is_dir(&self) -> bool {
        self.kind().is_dir()
    }
}
