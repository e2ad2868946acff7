//! # 虚拟文件系统
//!
//! 把按路径、按文件描述符的操作分派给挂载在根目录上的具体文件系统。
//!
//! ## 分层（自上而下）
//!
//! 1. [`Vfs`]：文件系统类型注册表、挂载表、文件描述符表
//! 2. [`FileSystem`] / [`Inode`]：具体文件系统实现的接口
//! 3. 块设备层：见`block_dev`

#![no_std]

extern crate alloc;

pub mod config;
mod dirent;
mod error;
mod fd;
mod flags;
mod fs;
mod mount;
mod namespace;
pub mod path;
mod stat;

pub use self::{
    dirent::{DirEntry, DirEntryType},
    error::{Error, Result},
    fd::File,
    flags::{MountFlag, OpenFlag, Whence},
    fs::{FileSystem, FileSystemType, Inode},
    mount::MountInfo,
    namespace::{Vfs, VfsStats},
    stat::Stat,
};
