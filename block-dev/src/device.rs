//! 设备及其驱动接口

use alloc::boxed::Box;
use alloc::string::String;
use core::any::Any;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use enumflags2::{BitFlags, bitflags};

use crate::{Error, Result};

/// 块设备驱动：只负责把整块数据搬进搬出，
/// 越界与权限检查由 [`Device`] 完成。
pub trait BlockDevice: Send + Sync + Any {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()>;

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()>;

    /// 批量读取从`start`开始的连续块，`buf`长度为块大小的整数倍。
    ///
    /// 返回`None`表示驱动不支持批量读取，由调用者逐块读取。
    #[allow(unused_variables)]
    fn read_blocks(&self, start: usize, buf: &mut [u8]) -> Option<Result<()>> {
        None
    }

    /// 批量写入，约定同[`BlockDevice::read_blocks`]
    #[allow(unused_variables)]
    fn write_blocks(&self, start: usize, buf: &[u8]) -> Option<Result<()>> {
        None
    }

    /// 把驱动内部的缓冲落盘
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Readable = 0b001,
    Writable = 0b010,
    Removable = 0b100,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum DeviceKind {
    #[default]
    Ram,
    Disk,
    CdRom,
}

/// 设备读写计数
#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    writes: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
}

/// 某一时刻的读写统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStats {
    pub reads: u64,
    pub writes: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// 已注册的块设备
pub struct Device {
    name: String,
    kind: DeviceKind,
    block_size: usize,
    block_count: usize,
    caps: BitFlags<Capability>,
    driver: Box<dyn BlockDevice>,
    counters: Counters,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        kind: DeviceKind,
        block_size: usize,
        block_count: usize,
        caps: BitFlags<Capability>,
        driver: Box<dyn BlockDevice>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            block_size,
            block_count,
            caps,
            driver,
            counters: Counters::default(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// 设备容量(字节)
    #[inline]
    pub fn size(&self) -> usize {
        self.block_size * self.block_count
    }

    #[inline]
    pub fn capabilities(&self) -> BitFlags<Capability> {
        self.caps
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        self.caps.contains(Capability::Readable)
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.caps.contains(Capability::Writable)
    }

    /// 取得驱动本身，便于宿主工具做具体类型的操作
    pub fn driver(&self) -> &dyn BlockDevice {
        self.driver.as_ref()
    }

    pub fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        self.check(block_id, 1, buf.len(), Capability::Readable)?;
        self.driver.read_block(block_id, buf)?;
        self.count_read(1, buf.len());
        Ok(())
    }

    pub fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        self.check(block_id, 1, buf.len(), Capability::Writable)?;
        self.driver.write_block(block_id, buf)?;
        self.count_write(1, buf.len());
        Ok(())
    }

    /// 读取从`start`开始的`buf.len() / block_size`个块。
    ///
    /// 越界时在任何读写发生之前失败。
    pub fn read_blocks(&self, start: usize, buf: &mut [u8]) -> Result<()> {
        let count = self.range_len(buf.len())?;
        self.check(start, count, buf.len(), Capability::Readable)?;

        match self.driver.read_blocks(start, buf) {
            Some(res) => res?,
            None => {
                for (i, chunk) in buf.chunks_exact_mut(self.block_size).enumerate() {
                    self.driver.read_block(start + i, chunk)?;
                }
            }
        }
        self.count_read(count, buf.len());

        Ok(())
    }

    pub fn write_blocks(&self, start: usize, buf: &[u8]) -> Result<()> {
        let count = self.range_len(buf.len())?;
        self.check(start, count, buf.len(), Capability::Writable)?;

        match self.driver.write_blocks(start, buf) {
            Some(res) => res?,
            None => {
                for (i, chunk) in buf.chunks_exact(self.block_size).enumerate() {
                    self.driver.write_block(start + i, chunk)?;
                }
            }
        }
        self.count_write(count, buf.len());

        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.driver.sync()
    }

    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            reads: self.counters.reads.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            bytes_read: self.counters.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.counters.bytes_written.load(Ordering::Relaxed),
        }
    }

    /// 统计清零，由注册表在设备挂入链表后调用
    pub(crate) fn reset_stats(&self) {
        self.counters.reads.store(0, Ordering::Release);
        self.counters.writes.store(0, Ordering::Release);
        self.counters.bytes_read.store(0, Ordering::Release);
        self.counters.bytes_written.store(0, Ordering::Release);
    }
}

impl Device {
    fn check(&self, start: usize, count: usize, len: usize, need: Capability) -> Result<()> {
        if len != count * self.block_size || count == 0 {
            return Err(Error::InvalidArgument);
        }
        if start
            .checked_add(count)
            .is_none_or(|end| end > self.block_count)
        {
            log::debug!(
                "block out of range: device={} start={start} count={count}",
                self.name
            );
            return Err(Error::InvalidArgument);
        }
        if !self.caps.contains(need) {
            return Err(Error::PermissionDenied);
        }

        Ok(())
    }

    fn range_len(&self, len: usize) -> Result<usize> {
        if len == 0 || self.block_size == 0 || len % self.block_size != 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(len / self.block_size)
    }

    #[inline]
    fn count_read(&self, blocks: usize, bytes: usize) {
        self.counters.reads.fetch_add(blocks as u64, Ordering::Relaxed);
        self.counters
            .bytes_read
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    fn count_write(&self, blocks: usize, bytes: usize) {
        self.counters.writes.fetch_add(blocks as u64, Ordering::Relaxed);
        self.counters
            .bytes_written
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("caps", &self.caps)
            .finish_non_exhaustive()
    }
}
