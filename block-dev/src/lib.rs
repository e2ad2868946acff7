//! # 块设备层
//!
//! 以固定大小的块为单位访问存储后端。
//!
//! - [`BlockDevice`]：驱动需要实现的读写接口
//! - [`Device`]：注册后的设备，负责边界、权限检查与统计
//! - [`DeviceRegistry`]：按名称登记、查找设备
//! - [`BufferCache`]：极简的块缓冲池，释放时写回

#![no_std]

extern crate alloc;

mod buffer;
mod device;
mod error;
pub mod ram_disk;
mod registry;

pub use self::{
    buffer::{BlockBuffer, BufferCache},
    device::{BlockDevice, Capability, Device, DeviceKind, DeviceStats},
    error::{Error, Result},
    ram_disk::RamDisk,
    registry::DeviceRegistry,
};

/// 缓冲池默认容量
pub const BUFFER_POOL_SIZE: usize = 32;
