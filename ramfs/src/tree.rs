use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use slotmap::SlotMap;
use vfs::path::Path;
use vfs::{DirEntryType, Error, Result, Stat};

use crate::{MAX_FILE_SIZE, MAX_NODES, NAME_CAP, ROOT_INODE};

slotmap::new_key_type! { pub(crate) struct NodeKey; }

pub(crate) enum NodeData {
    File(Vec<u8>),
    /// 子节点按名称排序
    Directory(BTreeMap<String, NodeKey>),
}

pub(crate) struct Node {
    pub ino: u64,
    pub perm: u32,
    pub data: NodeData,
}

impl Node {
    fn kind(&self) -> DirEntryType {
        match self.data {
            NodeData::File(_) => DirEntryType::Regular,
            NodeData::Directory(_) => DirEntryType::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.data, NodeData::Directory(_))
    }

    pub fn stat(&self) -> Stat {
        let (size, links) = match &self.data {
            NodeData::File(bytes) => (bytes.len() as u64, 1),
            NodeData::Directory(children) => (children.len() as u64, 2),
        };
        Stat {
            ino: self.ino,
            mode: self.kind(),
            perm: self.perm,
            size,
            block_size: 0,
            blocks: 0,
            links,
            ..Default::default()
        }
    }

    pub fn children(&self) -> Result<&BTreeMap<String, NodeKey>> {
        match &self.data {
            NodeData::Directory(children) => Ok(children),
            NodeData::File(_) => Err(Error::NotADirectory),
        }
    }

    fn children_mut(&mut self) -> Result<&mut BTreeMap<String, NodeKey>> {
        match &mut self.data {
            NodeData::Directory(children) => Ok(children),
            NodeData::File(_) => Err(Error::NotADirectory),
        }
    }

    pub fn bytes(&self) -> Result<&Vec<u8>> {
        match &self.data {
            NodeData::File(bytes) => Ok(bytes),
            NodeData::Directory(_) => Err(Error::IsADirectory),
        }
    }

    pub fn bytes_mut(&mut self) -> Result<&mut Vec<u8>> {
        match &mut self.data {
            NodeData::File(bytes) => Ok(bytes),
            NodeData::Directory(_) => Err(Error::IsADirectory),
        }
    }
}

pub(crate) struct Tree {
    nodes: SlotMap<NodeKey, Node>,
    root: NodeKey,
    next_ino: u64,
}

impl Tree {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            ino: ROOT_INODE,
            perm: 0o755,
            data: NodeData::Directory(BTreeMap::new()),
        });

        Self {
            nodes,
            root,
            next_ino: ROOT_INODE + 1,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 节点已被删除时返回[`Error::NotFound`]
    pub fn get(&self, key: NodeKey) -> Result<&Node> {
        self.nodes.get(key).ok_or(Error::NotFound)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Result<&mut Node> {
        self.nodes.get_mut(key).ok_or(Error::NotFound)
    }

    pub fn resolve(&self, path: &str) -> Result<NodeKey> {
        path.components().try_fold(self.root, |dir, name| {
            self.get(dir)?
                .children()?
                .get(name)
                .copied()
                .ok_or(Error::NotFound)
        })
    }

    /// 解析父目录，返回`(父目录, 文件名)`
    fn resolve_parent<'a>(&self, path: &'a str) -> Result<(NodeKey, &'a str)> {
        let (parent, name) = path.parent_file().ok_or(Error::InvalidArgument)?;
        let dir = self.resolve(parent)?;
        if !self.get(dir)?.is_dir() {
            return Err(Error::NotADirectory);
        }
        Ok((dir, name))
    }

    pub fn create(&mut self, path: &str, perm: u32, data: NodeData) -> Result<NodeKey> {
        if path.parent_file().is_none() {
            return Err(Error::AlreadyExists);
        }
        let (dir, name) = self.resolve_parent(path)?;
        if name.is_empty() || name.len() >= NAME_CAP {
            return Err(Error::InvalidArgument);
        }
        if self.get(dir)?.children()?.contains_key(name) {
            return Err(Error::AlreadyExists);
        }
        if self.nodes.len() >= MAX_NODES {
            log::warn!("ramfs: node limit reached");
            return Err(Error::OutOfSpace);
        }

        let ino = self.next_ino;
        self.next_ino += 1;
        let key = self.nodes.insert(Node { ino, perm, data });
        self.get_mut(dir)?.children_mut()?.insert(name.into(), key);

        log::debug!("ramfs: create {path} ino={ino}");
        Ok(key)
    }

    /// 删除节点，`dir`指明期望删除的是否为目录
    pub fn remove(&mut self, path: &str, dir: bool) -> Result<()> {
        let Some((parent, name)) = path.parent_file() else {
            return Err(if dir {
                Error::PermissionDenied
            } else {
                Error::IsADirectory
            });
        };
        let parent = self.resolve(parent)?;
        let key = self
            .get(parent)?
            .children()?
            .get(name)
            .copied()
            .ok_or(Error::NotFound)?;

        let node = self.get(key)?;
        match (dir, node.is_dir()) {
            (true, false) => return Err(Error::NotADirectory),
            (false, true) => return Err(Error::IsADirectory),
            (true, true) if !node.children()?.is_empty() => {
                return Err(Error::DirectoryNotEmpty);
            }
            _ => (),
        }

        self.get_mut(parent)?.children_mut()?.remove(name);
        self.nodes.remove(key);
        log::debug!("ramfs: remove {path}");
        Ok(())
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let (old_parent, old_name) = old.parent_file().ok_or(Error::InvalidArgument)?;
        let old_parent = self.resolve(old_parent)?;
        let key = self
            .get(old_parent)?
            .children()?
            .get(old_name)
            .copied()
            .ok_or(Error::NotFound)?;
        if old == new {
            return Ok(());
        }
        if new.starts_with_path(old) {
            return Err(Error::InvalidArgument);
        }

        let (new_parent, new_name) = match new.parent_file() {
            Some(_) => self.resolve_parent(new)?,
            None => return Err(Error::AlreadyExists),
        };
        if new_name.len() >= NAME_CAP {
            return Err(Error::InvalidArgument);
        }
        if self.get(new_parent)?.children()?.contains_key(new_name) {
            return Err(Error::AlreadyExists);
        }

        self.get_mut(old_parent)?.children_mut()?.remove(old_name);
        self.get_mut(new_parent)?
            .children_mut()?
            .insert(new_name.into(), key);
        Ok(())
    }

    /// 从`offset`起写入，中间的空洞补0
    pub fn write(&mut self, key: NodeKey, offset: u64, buf: &[u8]) -> Result<usize> {
        let bytes = self.get_mut(key)?.bytes_mut()?;
        let end = offset
            .checked_add(buf.len() as u64)
            .filter(|&end| end <= MAX_FILE_SIZE as u64)
            .ok_or(Error::OutOfSpace)? as usize;

        if end > bytes.len() {
            bytes.resize(end, 0);
        }
        bytes[offset as usize..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    pub fn read(&self, key: NodeKey, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let bytes = self.get(key)?.bytes()?;
        let Some(rest) = bytes.get(offset as usize..) else {
            return Ok(0);
        };
        let len = rest.len().min(buf.len());
        buf[..len].copy_from_slice(&rest[..len]);
        Ok(len)
    }

    pub fn truncate(&mut self, key: NodeKey, size: u64) -> Result<()> {
        if size > MAX_FILE_SIZE as u64 {
            return Err(Error::OutOfSpace);
        }
        self.get_mut(key)?.bytes_mut()?.resize(size as usize, 0);
        Ok(())
    }
}
