//! # VFS 接口层
//!
//! 把[`SimpleFileSystem`]接入虚拟文件系统。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;

use block_dev::Device;
use enumflags2::BitFlags;
use vfs::{Error, FileSystem, FileSystemType, Inode, MountFlag, Result, Stat};

use crate::{DEFAULT_LABEL, SimpleFileSystem};

/// 文件系统类型`"sfs"`，格式化时使用`label`作为卷标
pub struct SfsType {
    label: String,
}

impl SfsType {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for SfsType {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL)
    }
}

impl FileSystemType for SfsType {
    fn name(&self) -> &'static str {
        "sfs"
    }

    fn format(&self, device: Option<&Arc<Device>>) -> Result<()> {
        let device = device.ok_or(Error::InvalidArgument)?;
        SimpleFileSystem::format(device, &self.label)
    }

    fn mount(
        &self,
        device: Option<Arc<Device>>,
        _flags: BitFlags<MountFlag>,
    ) -> Result<Arc<dyn FileSystem>> {
        let device = device.ok_or(Error::InvalidArgument)?;
        let fs = SimpleFileSystem::mount(device)?;
        Ok(Arc::new(SfsMount { fs }))
    }
}

/// 已挂载的 sfs 实例
pub struct SfsMount {
    fs: Arc<SimpleFileSystem>,
}

impl SfsMount {
    pub fn new(fs: Arc<SimpleFileSystem>) -> Self {
        Self { fs }
    }

    #[inline]
    pub fn fs(&self) -> &Arc<SimpleFileSystem> {
        &self.fs
    }
}

impl FileSystem for SfsMount {
    fn type_name(&self) -> &'static str {
        "sfs"
    }

    fn device(&self) -> Option<&Arc<Device>> {
        Some(self.fs.device())
    }

    fn lookup(&self, path: &str) -> Result<Box<dyn Inode>> {
        let inode = SimpleFileSystem::resolve_path(&self.fs, path)?;
        Ok(Box::new(inode))
    }

    fn create(&self, path: &str, perm: u32) -> Result<()> {
        SimpleFileSystem::create_file(&self.fs, path, perm).map(drop)
    }

    fn mkdir(&self, path: &str, perm: u32) -> Result<()> {
        SimpleFileSystem::create_directory(&self.fs, path, perm).map(drop)
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        SimpleFileSystem::delete_directory(&self.fs, path)
    }

    fn unlink(&self, path: &str) -> Result<()> {
        SimpleFileSystem::delete_file(&self.fs, path)
    }

    fn rename(&self, old: &str, new: &str) -> Result<()> {
        SimpleFileSystem::rename(&self.fs, old, new)
    }

    fn stat(&self, path: &str) -> Result<Stat> {
        SimpleFileSystem::stat(&self.fs, path)
    }

    fn sync(&self) -> Result<()> {
        self.fs.sync()
    }

    fn unmount(&self) -> Result<()> {
        self.fs.unmount()
    }
}
