//! # 磁盘块管理器层
//!
//! 构建出磁盘的布局并使用：格式化、挂载校验、
//! 块与索引节点的分配和回收。
//!
//! 每个挂载实例持有一把锁保护超级块与位图的内存副本，
//! 对外的每个操作都在这把锁下完成。
//! 索引节点槽位的读改写另有一把锁，
//! 使得句柄析构时写回索引节点不必获取挂载锁。

use alloc::sync::Arc;
use alloc::vec;

use block_dev::{BufferCache, Device};
use spin::Mutex;
use vfs::{Error, Result};

use crate::layout::*;
use crate::{BLOCK_SIZE, BlockAllocator, DataBlock, ROOT_INODE, SfsInode};

/// 用于清零的数据块
const ZERO_BLOCK: DataBlock = [0; BLOCK_SIZE];

pub struct SimpleFileSystem {
    pub(crate) device: Arc<Device>,
    pub(crate) cache: BufferCache,
    pub(crate) volume: Mutex<Volume>,
    /// 索引节点表的读改写
    itable: Mutex<()>,
    inode_start: u32,
    inode_count: u32,
}

/// 超级块与位图在内存中的副本
pub(crate) struct Volume {
    pub super_block: SuperBlock,
    pub bitmap: Bitmap,
}

impl SimpleFileSystem {
    /// 在`device`上建立空的文件系统，根目录预先占用一个数据块
    pub fn format(device: &Arc<Device>, label: &str) -> Result<()> {
        if device.block_size() != BLOCK_SIZE {
            log::error!(
                "format sfs: device={} unsupported block size {}",
                device.name(),
                device.block_size()
            );
            return Err(Error::InvalidArgument);
        }
        let total_blocks = u32::try_from(device.block_count()).map_err(|_| Error::InvalidArgument)?;
        let Some(super_block) = SuperBlock::new(total_blocks, label) else {
            log::error!(
                "format sfs: device={} too small ({total_blocks} blocks)",
                device.name()
            );
            return Err(Error::InvalidArgument);
        };

        // 元数据区域与根目录块全部置位
        let root_block = super_block.first_data_block;
        let mut bitmap = Bitmap::new(super_block.bitmap_blocks as usize, total_blocks);
        (0..=root_block).for_each(|bit| bitmap.set(bit));

        let mut root = DiskInode::new(DiskInodeKind::Directory, 0o755);
        root.direct[0] = root_block;
        root.blocks = 1;

        Volume::write_super_block(device, &super_block)?;
        device.write_blocks(1, bitmap.as_bytes())?;

        let inode_start = super_block.inode_table_start() as usize;
        let mut block = ZERO_BLOCK;
        block[..INODE_SIZE].copy_from_slice(root.as_bytes());
        device.write_block(inode_start, &block)?;
        for block_id in inode_start + 1..root_block as usize {
            device.write_block(block_id, &ZERO_BLOCK)?;
        }
        device.write_block(root_block as usize, &ZERO_BLOCK)?;
        device.sync()?;

        log::info!(
            "format sfs: device={} blocks={} inodes={} data={}",
            device.name(),
            total_blocks,
            super_block.total_inodes(),
            super_block.data_blocks
        );

        Ok(())
    }

    /// 校验超级块，读入位图，并把挂载次数加一写回
    pub fn mount(device: Arc<Device>) -> Result<Arc<Self>> {
        if device.block_size() != BLOCK_SIZE {
            return Err(Error::InvalidArgument);
        }

        let mut block = ZERO_BLOCK;
        device.read_block(0, &mut block)?;
        let mut super_block = SuperBlock::default();
        super_block
            .as_bytes_mut()
            .copy_from_slice(&block[..SuperBlock::SIZE]);

        if let Err(reason) = super_block.validate() {
            log::error!("mount sfs: device={} {reason}", device.name());
            return Err(Error::InvalidArgument);
        }
        if super_block.total_blocks as usize > device.block_count() {
            log::error!("mount sfs: device={} truncated volume", device.name());
            return Err(Error::InvalidArgument);
        }

        let mut bits = vec![0; super_block.bitmap_blocks as usize * BLOCK_SIZE];
        device.read_blocks(1, &mut bits)?;
        let bitmap = Bitmap::from_bytes(bits, super_block.total_blocks);

        super_block.mount_count += 1;
        Volume::write_super_block(&device, &super_block)?;

        log::info!(
            "mount sfs: device={} label={:?} mount_count={}",
            device.name(),
            super_block.label(),
            super_block.mount_count
        );

        Ok(Arc::new(Self {
            device,
            cache: BufferCache::default(),
            inode_start: super_block.inode_table_start(),
            inode_count: super_block.total_inodes(),
            volume: Mutex::new(Volume {
                super_block,
                bitmap,
            }),
            itable: Mutex::new(()),
        }))
    }

    /// 写回所有缓存并刷新设备
    pub fn sync(&self) -> Result<()> {
        self.cache.sync_all()?;
        Volume::write_super_block(&self.device, &self.volume.lock().super_block)?;
        self.device.sync()?;
        Ok(())
    }

    pub fn unmount(&self) -> Result<()> {
        self.sync()?;
        log::info!("unmount sfs: device={}", self.device.name());
        Ok(())
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// 超级块的副本
    pub fn super_block(&self) -> SuperBlock {
        self.volume.lock().super_block
    }

    /// 数据区域中已分配的块数
    pub fn allocated_data_blocks(&self) -> u32 {
        let volume = self.volume.lock();
        let super_block = &volume.super_block;
        volume
            .bitmap
            .count_set(super_block.first_data_block..super_block.total_blocks)
    }

    pub fn is_block_allocated(&self, block_id: u32) -> bool {
        self.volume.lock().bitmap.is_allocated(block_id)
    }

    /// 分配一个清零的数据块
    pub fn alloc_block(&self) -> Result<u32> {
        self.volume.lock().alloc_block(&self.device)
    }

    /// 释放数据块，释放空闲块不产生效果
    pub fn free_block(&self, block_id: u32) -> Result<()> {
        self.volume.lock().free_block(&self.device, block_id)
    }

    pub fn alloc_inode(fs: &Arc<Self>, kind: DiskInodeKind, perm: u32) -> Result<SfsInode> {
        let ino = fs.alloc_inode_in(&mut fs.volume.lock(), kind, perm)?;
        SfsInode::load(fs, ino)
    }

    /// 清空索引节点的槽位，不回收它的数据块
    pub fn free_inode(&self, mut inode: SfsInode) -> Result<()> {
        inode.discard();
        self.free_inode_in(&mut self.volume.lock(), inode.ino())
    }

    pub fn get_inode(fs: &Arc<Self>, ino: u32) -> Result<SfsInode> {
        SfsInode::load(fs, ino)
    }

    pub fn root(fs: &Arc<Self>) -> Result<SfsInode> {
        SfsInode::load(fs, ROOT_INODE)
    }
}

/* 索引节点表 */
impl SimpleFileSystem {
    /// 通过编号获取 inode 在磁盘上的位置：**块ID**以及**块内偏移**
    fn inode_pos(&self, ino: u32) -> Result<(usize, usize)> {
        if ino == 0 || ino > self.inode_count {
            return Err(Error::InvalidArgument);
        }
        let index = (ino - 1) as usize;
        let block_id = self.inode_start as usize + index / INODES_PER_BLOCK;
        let block_inoffset = index % INODES_PER_BLOCK * INODE_SIZE;

        Ok((block_id, block_inoffset))
    }

    pub(crate) fn read_disk_inode(&self, ino: u32) -> Result<DiskInode> {
        let (block_id, offset) = self.inode_pos(ino)?;
        let mut disk_inode = DiskInode::default();

        let _guard = self.itable.lock();
        self.cache
            .get(&self.device, block_id)?
            .read_at(offset, disk_inode.as_bytes_mut())?;

        Ok(disk_inode)
    }

    /// 槽位已被释放或重新分配时返回[`Error::NotFound`]，不写回
    pub(crate) fn write_disk_inode(&self, ino: u32, disk_inode: &DiskInode) -> Result<()> {
        let (block_id, offset) = self.inode_pos(ino)?;

        let _guard = self.itable.lock();
        let buffer = self.cache.get(&self.device, block_id)?;
        let mut current = DiskInode::default();
        buffer.read_at(offset, current.as_bytes_mut())?;
        if current.is_free() || current.generation != disk_inode.generation {
            return Err(Error::NotFound);
        }
        buffer.write_at(offset, disk_inode.as_bytes())?;
        buffer.release()?;

        Ok(())
    }

    /// 逐块、逐槽位寻找空闲的索引节点
    pub(crate) fn alloc_inode_in(
        &self,
        volume: &mut Volume,
        kind: DiskInodeKind,
        perm: u32,
    ) -> Result<u32> {
        let inode_blocks = volume.super_block.inode_blocks as usize;

        let _guard = self.itable.lock();
        for block_index in 0..inode_blocks {
            let buffer = self
                .cache
                .get(&self.device, self.inode_start as usize + block_index)?;
            let Some(slot) = buffer.map(|data| {
                (0..INODES_PER_BLOCK).find(|slot| {
                    let offset = slot * INODE_SIZE;
                    data[offset..offset + 4] == [0; 4]
                })
            }) else {
                continue;
            };

            let offset = slot * INODE_SIZE;
            let mut stale = DiskInode::default();
            buffer.read_at(offset, stale.as_bytes_mut())?;
            let mut disk_inode = DiskInode::new(kind, perm);
            disk_inode.generation = stale.generation.wrapping_add(1);
            buffer.write_at(offset, disk_inode.as_bytes())?;
            buffer.release()?;

            volume.super_block.free_inodes = volume.super_block.free_inodes.saturating_sub(1);
            Volume::write_super_block(&self.device, &volume.super_block)?;

            let ino = (block_index * INODES_PER_BLOCK + slot + 1) as u32;
            log::debug!("alloc inode {ino}");
            return Ok(ino);
        }

        log::warn!("inode table exhausted: device={}", self.device.name());
        Err(Error::OutOfSpace)
    }

    pub(crate) fn free_inode_in(&self, volume: &mut Volume, ino: u32) -> Result<()> {
        if ino == ROOT_INODE {
            return Err(Error::InvalidArgument);
        }
        let (block_id, offset) = self.inode_pos(ino)?;

        let guard = self.itable.lock();
        let buffer = self.cache.get(&self.device, block_id)?;
        let mut disk_inode = DiskInode::default();
        buffer.read_at(offset, disk_inode.as_bytes_mut())?;
        if disk_inode.is_free() {
            log::warn!("free inode {ino}: already free");
            return Ok(());
        }
        let cleared = DiskInode {
            generation: disk_inode.generation,
            ..Default::default()
        };
        buffer.write_at(offset, cleared.as_bytes())?;
        buffer.release()?;
        drop(guard);

        volume.super_block.free_inodes += 1;
        Volume::write_super_block(&self.device, &volume.super_block)?;
        log::debug!("free inode {ino}");

        Ok(())
    }
}

impl Volume {
    fn write_super_block(device: &Device, super_block: &SuperBlock) -> Result<()> {
        let mut block = ZERO_BLOCK;
        block[..SuperBlock::SIZE].copy_from_slice(super_block.as_bytes());
        device.write_block(0, &block)?;
        Ok(())
    }

    /// 只写回`bit`所在的那个位图块
    fn write_bitmap_block(&self, device: &Device, bit: u32) -> Result<()> {
        let index = Bitmap::block_of(bit);
        device.write_block(1 + index, self.bitmap.block(index))?;
        Ok(())
    }

    pub fn alloc_block(&mut self, device: &Device) -> Result<u32> {
        let Some(block_id) = self.bitmap.alloc() else {
            log::warn!("bitmap exhausted: device={}", device.name());
            return Err(Error::OutOfSpace);
        };
        if let Err(err) = self.write_bitmap_block(device, block_id) {
            self.bitmap.dealloc(block_id);
            return Err(err);
        }
        self.super_block.free_blocks = self.super_block.free_blocks.saturating_sub(1);

        let res = Self::write_super_block(device, &self.super_block)
            .and_then(|()| device.write_block(block_id as usize, &ZERO_BLOCK).map_err(Error::from));
        if let Err(err) = res {
            // 回滚位图与计数
            self.bitmap.dealloc(block_id);
            self.super_block.free_blocks += 1;
            let _ = self.write_bitmap_block(device, block_id);
            let _ = Self::write_super_block(device, &self.super_block);
            return Err(err);
        }

        log::trace!("alloc block {block_id}");
        Ok(block_id)
    }

    pub fn free_block(&mut self, device: &Device, block_id: u32) -> Result<()> {
        let super_block = &self.super_block;
        if block_id < super_block.first_data_block || block_id >= super_block.total_blocks {
            log::warn!("free block {block_id}: outside data region");
            return Err(Error::InvalidArgument);
        }
        if !self.bitmap.dealloc(block_id) {
            log::warn!("free block {block_id}: already free");
            return Ok(());
        }
        self.super_block.free_blocks += 1;

        self.write_bitmap_block(device, block_id)?;
        Self::write_super_block(device, &self.super_block)?;
        log::trace!("free block {block_id}");

        Ok(())
    }
}
