//! # 内存文件系统
//!
//! 整棵目录树放在内存中，不需要块设备，卸载后内容随之消失。
//! 节点保存在[`slotmap::SlotMap`]中，删除后旧句柄中的键自然失效。

#![no_std]

extern crate alloc;

mod fs;
mod inode;
mod tree;

pub use self::{
    fs::{RamFs, RamFsType},
    inode::RamInode,
};

/// 最多节点数(含根目录)
pub const MAX_NODES: usize = 256;
/// 单个文件的最大字节数
pub const MAX_FILE_SIZE: usize = 64 * 1024;
/// 名称须短于它
pub const NAME_CAP: usize = 255;
pub const ROOT_INODE: u64 = 1;
