use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::Device;
use enumflags2::BitFlags;
use spin::RwLock;
use vfs::{FileSystem, FileSystemType, Inode, MountFlag, Result};

use crate::RamInode;
use crate::tree::{NodeData, Tree};

const WELCOME: &str = "\
Welcome!

This is an in-memory file system, its content is lost on unmount.
Try these commands:
  ls
  cat welcome.txt
  mkdir test
";

/// 文件系统类型`"ramfs"`
#[derive(Debug, Clone, Copy, Default)]
pub struct RamFsType {
    populate: bool,
}

impl RamFsType {
    /// 挂载时建立默认的目录结构
    pub fn populated() -> Self {
        Self { populate: true }
    }
}

impl FileSystemType for RamFsType {
    fn name(&self) -> &'static str {
        "ramfs"
    }

    /// 没有需要写入的介质
    fn format(&self, _device: Option<&Arc<Device>>) -> Result<()> {
        Ok(())
    }

    fn mount(
        &self,
        device: Option<Arc<Device>>,
        _flags: BitFlags<MountFlag>,
    ) -> Result<Arc<dyn FileSystem>> {
        if let Some(device) = device {
            log::warn!("ramfs: ignore device {}", device.name());
        }

        let fs = RamFs::new();
        if self.populate {
            fs.populate()?;
        }
        Ok(Arc::new(fs))
    }
}

pub struct RamFs {
    tree: Arc<RwLock<Tree>>,
}

impl RamFs {
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::new())),
        }
    }

    /// 节点总数，含根目录
    pub fn node_count(&self) -> usize {
        self.tree.read().len()
    }

    /// 建立`/bin`、`/etc`、`/tmp`、`/home`、`/dev`与`/welcome.txt`
    pub fn populate(&self) -> Result<()> {
        let mut tree = self.tree.write();
        for (path, perm) in [
            ("/bin", 0o755),
            ("/etc", 0o755),
            ("/tmp", 0o777),
            ("/home", 0o755),
            ("/dev", 0o755),
        ] {
            tree.create(path, perm, NodeData::Directory(BTreeMap::new()))?;
        }
        tree.create(
            "/welcome.txt",
            0o644,
            NodeData::File(Vec::from(WELCOME.as_bytes())),
        )?;

        log::info!("ramfs: initial files created");
        Ok(())
    }
}

impl Default for RamFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for RamFs {
    fn type_name(&self) -> &'static str {
        "ramfs"
    }

    fn lookup(&self, path: &str) -> Result<Box<dyn Inode>> {
        let key = self.tree.read().resolve(path)?;
        Ok(Box::new(RamInode::new(self.tree.clone(), key)?))
    }

    fn create(&self, path: &str, perm: u32) -> Result<()> {
        self.tree
            .write()
            .create(path, perm, NodeData::File(Vec::new()))
            .map(drop)
    }

    fn mkdir(&self, path: &str, perm: u32) -> Result<()> {
        self.tree
            .write()
            .create(path, perm, NodeData::Directory(BTreeMap::new()))
            .map(drop)
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        self.tree.write().remove(path, true)
    }

    fn unlink(&self, path: &str) -> Result<()> {
        self.tree.write().remove(path, false)
    }

    fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.tree.write().rename(old, new)
    }
}
