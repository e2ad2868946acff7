//! 挂载表

use alloc::string::String;
use alloc::sync::Arc;

use enumflags2::BitFlags;

use crate::config::MAX_MOUNTS;
use crate::{Error, FileSystem, MountFlag, Result};

pub(crate) struct Mount {
    pub path: String,
    pub fs_type: &'static str,
    pub fs: Arc<dyn FileSystem>,
    pub flags: BitFlags<MountFlag>,
}

/// 挂载点的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub path: String,
    pub fs_type: &'static str,
    /// 底层设备名，内存文件系统为空
    pub device: Option<String>,
    pub flags: BitFlags<MountFlag>,
}

/// 固定容量的挂载表，挂载在`/`上的项为根
pub(crate) struct MountTable {
    slots: [Option<Mount>; MAX_MOUNTS],
}

impl MountTable {
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; MAX_MOUNTS],
        }
    }

    /// 检查能否在`path`上挂载
    pub fn check_vacant(&self, path: &str) -> Result<()> {
        if self.find(path).is_some() {
            return Err(Error::AlreadyExists);
        }
        if self.slots.iter().all(Option::is_some) {
            return Err(Error::OutOfMemory);
        }
        Ok(())
    }

    pub fn insert(&mut self, mount: Mount) -> Result<()> {
        self.check_vacant(&mount.path)?;
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(Error::OutOfMemory)?;
        *slot = Some(mount);
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Option<Mount> {
        self.slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|mount| mount.path == path))?
            .take()
    }

    pub fn find(&self, path: &str) -> Option<&Mount> {
        self.iter().find(|mount| mount.path == path)
    }

    #[inline]
    pub fn root(&self) -> Option<&Mount> {
        self.find("/")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mount> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

impl Mount {
    pub fn info(&self) -> MountInfo {
        MountInfo {
            path: self.path.clone(),
            fs_type: self.fs_type,
            device: self.fs.device().map(|dev| String::from(dev.name())),
            flags: self.flags,
        }
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.flags.contains(MountFlag::ReadOnly)
    }
}
