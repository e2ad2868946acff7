//! 内存盘

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use enumflags2::make_bitflags;
use spin::Mutex;

use crate::{BlockDevice, Capability, Device, DeviceKind, DeviceRegistry, Error, Result};

pub const RAM_DISK_BLOCK_SIZE: usize = 4096;

/// 以一段连续内存充当块设备
#[derive(Debug)]
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
    block_size: usize,
}

impl RamDisk {
    /// 容量向下取整到整块
    pub fn new(size: usize, block_size: usize) -> Self {
        let block_count = size / block_size;
        Self {
            data: Mutex::new(vec![0; block_count * block_size]),
            block_size,
        }
    }

    pub fn block_count(&self) -> usize {
        self.data.lock().len() / self.block_size
    }

    #[inline]
    fn span(&self, start: usize, len: usize) -> core::ops::Range<usize> {
        let offset = start * self.block_size;
        offset..offset + len
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        let data = self.data.lock();
        let span = self.span(block_id, buf.len());
        buf.copy_from_slice(data.get(span).ok_or(Error::Io)?);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        let mut data = self.data.lock();
        let span = self.span(block_id, buf.len());
        data.get_mut(span).ok_or(Error::Io)?.copy_from_slice(buf);
        Ok(())
    }

    fn read_blocks(&self, start: usize, buf: &mut [u8]) -> Option<Result<()>> {
        Some(self.read_block(start, buf))
    }

    fn write_blocks(&self, start: usize, buf: &[u8]) -> Option<Result<()>> {
        Some(self.write_block(start, buf))
    }
}

/// 创建`size`字节的内存盘并登记到`registry`
pub fn create(registry: &DeviceRegistry, name: &str, size: usize) -> Result<Arc<Device>> {
    let block_count = size / RAM_DISK_BLOCK_SIZE;
    if block_count == 0 {
        return Err(Error::InvalidArgument);
    }

    let disk = RamDisk::new(size, RAM_DISK_BLOCK_SIZE);
    registry.register(Device::new(
        name,
        DeviceKind::Ram,
        RAM_DISK_BLOCK_SIZE,
        block_count,
        make_bitflags!(Capability::{Readable | Writable}),
        Box::new(disk),
    ))
}
