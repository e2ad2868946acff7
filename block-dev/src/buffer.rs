//! # 块缓冲层
//!
//! 固定数量的缓冲组成缓冲池，每个缓冲记录自己的引用数。
//!
//! - 获取：找到第一个引用数为0的缓冲，挂到目标块上，立即读入块内容；
//! - 释放：引用数减1，减到0且为脏块时同步写回。
//!
//! 这里**不做**最近使用的记录，也不会复用已缓存同一块的缓冲，
//! 每次获取都会重新读盘。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;

use spin::Mutex;

use crate::{BUFFER_POOL_SIZE, Device, Error, Result};

/// 缓冲池
#[derive(Debug)]
pub struct BufferCache {
    slots: Vec<Arc<Mutex<Slot>>>,
}

#[derive(Debug, Default)]
struct Slot {
    /// 挂载的设备，空闲且从未使用时为空
    device: Option<Arc<Device>>,
    block_id: usize,
    data: Vec<u8>,
    /// 是否为脏块
    dirty: bool,
    /// 引用数
    refs: usize,
}

/// 指向缓冲池中某个缓冲的句柄，析构时释放引用
#[derive(Debug)]
pub struct BlockBuffer {
    slot: Arc<Mutex<Slot>>,
    released: bool,
}

impl BufferCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity)
                .map(|_| Arc::new(Mutex::new(Slot::default())))
                .collect(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 正被引用的缓冲数
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.lock().refs > 0).count()
    }

    /// 取得`device`上第`block_id`块的缓冲
    pub fn get(&self, device: &Arc<Device>, block_id: usize) -> Result<BlockBuffer> {
        for slot in &self.slots {
            let mut inner = slot.lock();
            if inner.refs != 0 {
                continue;
            }
            // 上次写回失败的缓冲，重用前再试一次
            if inner.dirty && inner.write_back().is_err() {
                continue;
            }

            inner.device = None;
            inner.data.resize(device.block_size(), 0);
            device.read_block(block_id, &mut inner.data)?;
            inner.device = Some(device.clone());
            inner.block_id = block_id;
            inner.refs = 1;

            return Ok(BlockBuffer {
                slot: slot.clone(),
                released: false,
            });
        }

        log::warn!("buffer pool exhausted: capacity={}", self.capacity());
        Err(Error::NoBuffer)
    }

    /// 写回所有脏缓冲
    pub fn sync_all(&self) -> Result<()> {
        let mut res = Ok(());
        for slot in &self.slots {
            if let Err(err) = slot.lock().write_back() {
                res = Err(err);
            }
        }
        res
    }
}

impl Default for BufferCache {
    fn default() -> Self {
        Self::new(BUFFER_POOL_SIZE)
    }
}

impl Slot {
    fn write_back(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let Some(device) = &self.device else {
            self.dirty = false;
            return Ok(());
        };

        device.write_block(self.block_id, &self.data)?;
        self.dirty = false;

        Ok(())
    }
}

impl BlockBuffer {
    pub fn block_id(&self) -> usize {
        self.slot.lock().block_id
    }

    #[inline]
    pub fn map<V>(&self, f: impl FnOnce(&[u8]) -> V) -> V {
        f(&self.slot.lock().data)
    }

    /// 修改缓冲内容，同时标记为脏块
    #[inline]
    pub fn map_mut<V>(&self, f: impl FnOnce(&mut [u8]) -> V) -> V {
        let mut inner = self.slot.lock();
        inner.dirty = true;
        f(&mut inner.data)
    }

    /// 把`offset`处的内容复制到`dest`，越出块尾时返回[`Error::InvalidArgument`]
    pub fn read_at(&self, offset: usize, dest: &mut [u8]) -> Result<()> {
        let inner = self.slot.lock();
        let src = in_block(&inner.data, offset, dest.len())?;
        dest.copy_from_slice(&inner.data[src]);
        Ok(())
    }

    /// 把`src`复制到`offset`处，越界时缓冲保持不变
    pub fn write_at(&self, offset: usize, src: &[u8]) -> Result<()> {
        let mut inner = self.slot.lock();
        let dest = in_block(&inner.data, offset, src.len())?;
        inner.data[dest].copy_from_slice(src);
        inner.dirty = true;
        Ok(())
    }

    /// 不释放引用，立即写回
    pub fn sync(&self) -> Result<()> {
        self.slot.lock().write_back()
    }

    /// 显式释放，返回写回的结果
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.put()
    }

    fn put(&self) -> Result<()> {
        let mut inner = self.slot.lock();
        inner.refs -= 1;
        if inner.refs == 0 {
            inner.write_back()?;
        }
        Ok(())
    }
}

fn in_block(data: &[u8], offset: usize, len: usize) -> Result<Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(offset..end),
        _ => Err(Error::InvalidArgument),
    }
}

impl Clone for BlockBuffer {
    fn clone(&self) -> Self {
        self.slot.lock().refs += 1;
        Self {
            slot: self.slot.clone(),
            released: false,
        }
    }
}

impl Drop for BlockBuffer {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.put() {
            log::error!("write back block {} failed: {err}", self.block_id());
        }
    }
}
