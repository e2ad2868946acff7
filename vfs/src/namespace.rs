//! # 统一命名空间
//!
//! 所有路径都交给根挂载点上的文件系统处理，
//! 尚不支持挂载点嵌套：挂在其它路径上的文件系统只登记在挂载表中。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use block_dev::{Device, DeviceRegistry};
use enumflags2::BitFlags;
use spin::Mutex;

use crate::config::{MAX_FS_TYPES, MAX_PATH};
use crate::fd::FdTable;
use crate::mount::{Mount, MountTable};
use crate::path::Path;
use crate::{
    DirEntry, Error, File, FileSystem, FileSystemType, MountFlag, MountInfo, OpenFlag, Result,
    Stat, Whence,
};

pub struct Vfs {
    devices: Arc<DeviceRegistry>,
    fs_types: Mutex<Vec<Arc<dyn FileSystemType>>>,
    mounts: Mutex<MountTable>,
    files: Mutex<FdTable>,
    files_opened: AtomicUsize,
    files_closed: AtomicUsize,
}

/// 运行统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VfsStats {
    pub fs_types: usize,
    pub mounts: usize,
    pub open_files: usize,
    pub files_opened: usize,
    pub files_closed: usize,
}

/// 路径解析的结果
struct Resolved {
    fs: Arc<dyn FileSystem>,
    read_only: bool,
    path: String,
}

impl Vfs {
    pub fn new(devices: Arc<DeviceRegistry>) -> Self {
        Self {
            devices,
            fs_types: Mutex::new(Vec::new()),
            mounts: Mutex::new(MountTable::new()),
            files: Mutex::new(FdTable::new()),
            files_opened: AtomicUsize::new(0),
            files_closed: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn devices(&self) -> &Arc<DeviceRegistry> {
        &self.devices
    }

    /* 文件系统类型 */

    pub fn register_filesystem(&self, fs_type: Arc<dyn FileSystemType>) -> Result<()> {
        let mut fs_types = self.fs_types.lock();
        if fs_types.iter().any(|ty| ty.name() == fs_type.name()) {
            return Err(Error::AlreadyExists);
        }
        if fs_types.len() == MAX_FS_TYPES {
            return Err(Error::OutOfMemory);
        }

        log::info!("register filesystem type {:?}", fs_type.name());
        fs_types.push(fs_type);
        Ok(())
    }

    /// 注销文件系统类型，仍有挂载实例时拒绝
    pub fn unregister_filesystem(&self, name: &str) -> Result<()> {
        if self.mounts.lock().iter().any(|mount| mount.fs_type == name) {
            return Err(Error::PermissionDenied);
        }

        let mut fs_types = self.fs_types.lock();
        let index = fs_types
            .iter()
            .position(|ty| ty.name() == name)
            .ok_or(Error::NotFound)?;
        fs_types.remove(index);
        Ok(())
    }

    pub fn filesystem_types(&self) -> Vec<&'static str> {
        self.fs_types.lock().iter().map(|ty| ty.name()).collect()
    }

    fn find_type(&self, name: &str) -> Result<Arc<dyn FileSystemType>> {
        self.fs_types
            .lock()
            .iter()
            .find(|ty| ty.name() == name)
            .cloned()
            .ok_or(Error::NotFound)
    }

    /// `"none"`或空名表示不需要设备
    fn find_device(&self, name: &str) -> Result<Option<Arc<Device>>> {
        if name.is_empty() || name == "none" {
            return Ok(None);
        }
        self.devices.find(name).map(Some).ok_or(Error::NotFound)
    }

    /* 挂载 */

    pub fn format(&self, device: &str, fs_type: &str) -> Result<()> {
        let fs_type = self.find_type(fs_type)?;
        let device = self.find_device(device)?;
        fs_type.format(device.as_ref())
    }

    pub fn mount(
        &self,
        device: &str,
        mountpoint: &str,
        fs_type: &str,
        flags: BitFlags<MountFlag>,
    ) -> Result<()> {
        let path = canonicalize(mountpoint)?;
        let ty = self.find_type(fs_type)?;
        let device = self.find_device(device)?;

        // 先检查挂载表，以免挂载回调产生副作用
        self.mounts.lock().check_vacant(&path)?;
        let fs = ty.mount(device, flags)?;

        log::info!("mount {fs_type} on {path}");
        self.mounts.lock().insert(Mount {
            path,
            fs_type: ty.name(),
            fs,
            flags,
        })
    }

    pub fn unmount(&self, mountpoint: &str) -> Result<()> {
        let path = canonicalize(mountpoint)?;
        let fs = self
            .mounts
            .lock()
            .find(&path)
            .map(|mount| mount.fs.clone())
            .ok_or(Error::NotFound)?;

        fs.unmount()?;
        self.mounts.lock().remove(&path);
        log::info!("unmount {path}");

        Ok(())
    }

    pub fn mounts(&self) -> Vec<MountInfo> {
        self.mounts.lock().iter().map(Mount::info).collect()
    }

    /// 路径所在的文件系统，目前总是根文件系统
    pub fn get_filesystem(&self, path: &str) -> Result<Arc<dyn FileSystem>> {
        self.resolve(path).map(|resolved| resolved.fs)
    }

    /* 文件描述符 */

    pub fn open(&self, path: &str, flags: BitFlags<OpenFlag>, perm: u32) -> Result<usize> {
        let Resolved {
            fs,
            read_only,
            path,
        } = self.resolve(path)?;
        let [_, writable] = OpenFlag::access(flags);
        let create = flags.contains(OpenFlag::CREAT);
        let trunc = flags.contains(OpenFlag::TRUNC);
        if read_only && (writable || trunc) {
            return Err(Error::PermissionDenied);
        }

        let mut inode = match fs.lookup(&path) {
            Ok(_) if create && flags.contains(OpenFlag::EXCL) => {
                return Err(Error::AlreadyExists);
            }
            Ok(inode) => inode,
            Err(Error::NotFound) if create => {
                if read_only {
                    return Err(Error::PermissionDenied);
                }
                fs.create(&path, perm)?;
                fs.lookup(&path)?
            }
            Err(err) => return Err(err),
        };

        if inode.is_dir() && (writable || trunc) {
            return Err(Error::IsADirectory);
        }
        if trunc {
            inode.truncate(0)?;
        }

        let mut files = self.files.lock();
        let fd = files.allocate()?;
        files.assign(fd, File::new(path, flags, inode, fs))?;
        drop(files);

        self.files_opened.fetch_add(1, Ordering::Relaxed);
        log::debug!("open fd={fd}");
        Ok(fd)
    }

    pub fn read(&self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        self.file(fd)?.lock().read(buf)
    }

    pub fn write(&self, fd: usize, buf: &[u8]) -> Result<usize> {
        self.file(fd)?.lock().write(buf)
    }

    pub fn seek(&self, fd: usize, offset: i64, whence: Whence) -> Result<u64> {
        self.file(fd)?.lock().seek(offset, whence)
    }

    pub fn close(&self, fd: usize) -> Result<()> {
        let file = self.files.lock().free(fd)?;
        self.files_closed.fetch_add(1, Ordering::Relaxed);
        log::debug!("close fd={fd}");

        // 其它持有者(如正在进行的读写)释放后再关闭
        match file.map(Arc::try_unwrap) {
            Some(Ok(file)) => file.into_inner().close(),
            _ => Ok(()),
        }
    }

    pub fn sync(&self, fd: usize) -> Result<()> {
        self.file(fd)?.lock().sync()
    }

    pub fn fstat(&self, fd: usize) -> Result<Stat> {
        self.file(fd)?.lock().stat()
    }

    pub fn readdir(&self, fd: usize, max: usize) -> Result<Vec<DirEntry>> {
        self.file(fd)?.lock().readdir(max)
    }

    fn file(&self, fd: usize) -> Result<Arc<Mutex<File>>> {
        self.files.lock().get(fd)
    }

    /* 按路径的操作 */

    pub fn mkdir(&self, path: &str, perm: u32) -> Result<()> {
        let resolved = self.resolve_mut(path)?;
        resolved.fs.mkdir(&resolved.path, perm)
    }

    pub fn rmdir(&self, path: &str) -> Result<()> {
        let resolved = self.resolve_mut(path)?;
        resolved.fs.rmdir(&resolved.path)
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        let resolved = self.resolve_mut(path)?;
        resolved.fs.unlink(&resolved.path)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let old = self.resolve_mut(old)?;
        let new = canonicalize(new)?;
        old.fs.rename(&old.path, &new)
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        let resolved = self.resolve(path)?;
        resolved.fs.stat(&resolved.path)
    }

    /* 整体 */

    /// 关闭所有文件并卸载所有文件系统，根文件系统最后卸载
    pub fn shutdown(&self) -> Result<()> {
        let mut res = Ok(());

        let fds = self.files.lock().used();
        for fd in fds {
            if let Err(err) = self.close(fd) {
                log::error!("shutdown: close fd={fd} failed: {err}");
                res = Err(err);
            }
        }

        let mut paths: Vec<String> = self
            .mounts
            .lock()
            .iter()
            .map(|mount| mount.path.clone())
            .collect();
        paths.sort_by_key(|path| path == "/");
        for path in paths {
            if let Err(err) = self.unmount(&path) {
                log::error!("shutdown: unmount {path} failed: {err}");
                res = Err(err);
            }
        }

        res
    }

    pub fn stats(&self) -> VfsStats {
        VfsStats {
            fs_types: self.fs_types.lock().len(),
            mounts: self.mounts.lock().len(),
            open_files: self.files.lock().used().len(),
            files_opened: self.files_opened.load(Ordering::Relaxed),
            files_closed: self.files_closed.load(Ordering::Relaxed),
        }
    }
}

impl Vfs {
    fn resolve(&self, path: &str) -> Result<Resolved> {
        let path = canonicalize(path)?;
        let mounts = self.mounts.lock();
        let root = mounts.root().ok_or(Error::NotFound)?;

        Ok(Resolved {
            fs: root.fs.clone(),
            read_only: root.is_read_only(),
            path,
        })
    }

    /// 解析将要修改的路径，只读挂载时拒绝
    fn resolve_mut(&self, path: &str) -> Result<Resolved> {
        let resolved = self.resolve(path)?;
        if resolved.read_only {
            return Err(Error::PermissionDenied);
        }
        Ok(resolved)
    }
}

/// 相对路径视作相对于根目录
fn canonicalize(path: &str) -> Result<String> {
    if path.is_empty() || path.len() > MAX_PATH {
        return Err(Error::InvalidArgument);
    }
    path.canonicalize("/").ok_or(Error::InvalidArgument)
}
