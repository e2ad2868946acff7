use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::RwLock;
use vfs::{DirEntry, DirEntryType, Inode, Result, Stat};

use crate::tree::{NodeKey, Tree};

/// 指向树中某个节点的句柄
pub struct RamInode {
    tree: Arc<RwLock<Tree>>,
    key: NodeKey,
    ino: u64,
    kind: DirEntryType,
}

impl RamInode {
    pub(crate) fn new(tree: Arc<RwLock<Tree>>, key: NodeKey) -> Result<Self> {
        let stat = tree.read().get(key)?.stat();
        Ok(Self {
            tree,
            key,
            ino: stat.ino,
            kind: stat.mode,
        })
    }
}

impl Inode for RamInode {
    #[inline]
    fn ino(&self) -> u64 {
        self.ino
    }

    #[inline]
    fn kind(&self) -> DirEntryType {
        self.kind
    }

    fn stat(&self) -> Result<Stat> {
        Ok(self.tree.read().get(self.key)?.stat())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.tree.read().read(self.key, offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize> {
        self.tree.write().write(self.key, offset, buf)
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        self.tree.write().truncate(self.key, size)
    }

    fn readdir(&mut self, offset: &mut usize, max: usize) -> Result<Vec<DirEntry>> {
        let tree = self.tree.read();
        let entries: Vec<DirEntry> = tree
            .get(self.key)?
            .children()?
            .iter()
            .skip(*offset)
            .take(max)
            .filter_map(|(name, &key)| {
                let stat = tree.get(key).ok()?.stat();
                Some(DirEntry {
                    inode: stat.ino,
                    ty: stat.mode,
                    name: name.clone(),
                })
            })
            .collect();

        *offset += entries.len();
        Ok(entries)
    }
}
