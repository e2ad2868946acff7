//! # 路径操作层
//!
//! 按路径创建、删除、改名。每个操作在挂载锁下完成，
//! 中途失败时回滚已做的分配。

use alloc::sync::Arc;

use vfs::path::Path;
use vfs::{Error, Inode, Result, Stat};

use crate::layout::DirEntry;
use crate::sfs::Volume;
use crate::{DiskInodeKind, SfsInode, SimpleFileSystem};

impl SimpleFileSystem {
    pub fn create_file(fs: &Arc<Self>, path: &str, perm: u32) -> Result<SfsInode> {
        Self::create_in(fs, path, DiskInodeKind::File, perm)
    }

    /// 新目录不含`.`与`..`，数据块在插入第一个目录项时分配
    pub fn create_directory(fs: &Arc<Self>, path: &str, perm: u32) -> Result<SfsInode> {
        Self::create_in(fs, path, DiskInodeKind::Directory, perm)
    }

    /// 删除目录项并减少链接数，链接数归零时回收数据块与索引节点
    pub fn delete_file(fs: &Arc<Self>, path: &str) -> Result<()> {
        let (parent, name) = path.parent_file().ok_or(Error::IsADirectory)?;

        let mut volume = fs.volume.lock();
        let mut dir = Self::resolve_in(fs, parent)?;
        let mut inode = fs.lookup_in(&mut dir, name)?;
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }

        fs.remove_dirent_in(&mut dir, name)?;
        let disk = inode.disk_mut();
        disk.links = disk.links.saturating_sub(1);
        if disk.links > 0 {
            return inode.sync();
        }

        log::debug!("delete file {path}: ino={}", inode.ino());
        fs.release_inode_in(&mut volume, inode)
    }

    /// 只能删除空目录，根目录不可删除
    pub fn delete_directory(fs: &Arc<Self>, path: &str) -> Result<()> {
        let (parent, name) = path.parent_file().ok_or(Error::PermissionDenied)?;

        let mut volume = fs.volume.lock();
        let mut dir = Self::resolve_in(fs, parent)?;
        let mut inode = fs.lookup_in(&mut dir, name)?;
        if !inode.is_dir() {
            return Err(Error::NotADirectory);
        }
        if !fs.is_empty_dir(&mut inode)? {
            return Err(Error::DirectoryNotEmpty);
        }

        fs.remove_dirent_in(&mut dir, name)?;
        log::debug!("delete directory {path}: ino={}", inode.ino());
        fs.release_inode_in(&mut volume, inode)
    }

    /// 先插入新目录项再删除旧目录项，目标已存在时失败
    pub fn rename(fs: &Arc<Self>, old: &str, new: &str) -> Result<()> {
        let (old_parent, old_name) = old.parent_file().ok_or(Error::InvalidArgument)?;
        let (new_parent, new_name) = new.parent_file().ok_or(Error::AlreadyExists)?;

        let mut volume = fs.volume.lock();
        let mut old_dir = Self::resolve_in(fs, old_parent)?;
        let pos = fs.find_dirent(&mut old_dir, old_name)?.ok_or(Error::NotFound)?;
        if old_parent == new_parent && old_name == new_name {
            return Ok(());
        }
        // 目录不能移入自己的子树
        if new.starts_with_path(old) {
            return Err(Error::InvalidArgument);
        }

        let mut new_dir = Self::resolve_in(fs, new_parent)?;
        if !DirEntry::is_valid_name(new_name) {
            return Err(Error::InvalidArgument);
        }
        if fs.find_dirent(&mut new_dir, new_name)?.is_some() {
            return Err(Error::AlreadyExists);
        }

        fs.add_dirent_in(&mut volume, &mut new_dir, new_name, pos.ino)?;
        if let Err(err) = fs.remove_dirent_in(&mut old_dir, old_name) {
            if let Err(undo) = fs.remove_dirent_in(&mut new_dir, new_name) {
                log::error!("rename {old} -> {new}: rollback failed: {undo}");
            }
            return Err(err);
        }

        log::debug!("rename {old} -> {new}: ino={}", pos.ino);
        Ok(())
    }

    pub fn stat(fs: &Arc<Self>, path: &str) -> Result<Stat> {
        let _volume = fs.volume.lock();
        Self::resolve_in(fs, path)?.stat()
    }
}

impl SimpleFileSystem {
    fn create_in(fs: &Arc<Self>, path: &str, kind: DiskInodeKind, perm: u32) -> Result<SfsInode> {
        let (parent, name) = path.parent_file().ok_or(Error::AlreadyExists)?;

        let mut volume = fs.volume.lock();
        let mut dir = Self::resolve_in(fs, parent)?;
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }
        if !DirEntry::is_valid_name(name) {
            return Err(Error::InvalidArgument);
        }
        if fs.find_dirent(&mut dir, name)?.is_some() {
            return Err(Error::AlreadyExists);
        }

        let ino = fs.alloc_inode_in(&mut volume, kind, perm)?;
        if let Err(err) = fs.add_dirent_in(&mut volume, &mut dir, name, ino) {
            if let Err(undo) = fs.free_inode_in(&mut volume, ino) {
                log::error!("create {path}: rollback inode {ino} failed: {undo}");
            }
            return Err(err);
        }

        log::debug!("create {path}: ino={ino} kind={kind:?}");
        SfsInode::load(fs, ino)
    }

    /// 回收数据块并清空索引节点的槽位
    fn release_inode_in(&self, volume: &mut Volume, mut inode: SfsInode) -> Result<()> {
        self.release_blocks_in(volume, &mut inode)?;
        inode.discard();
        self.free_inode_in(volume, inode.ino())
    }
}
