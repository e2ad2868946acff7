//! 文件内容的读写
//!
//! 只经由直接索引块访问，文件最大为[`MAX_FILE_SIZE`]字节。
//! 写入时按需分配块，新块已由分配器清零。

use vfs::{Error, Result};

use crate::sfs::Volume;
use crate::{BLOCK_SIZE, MAX_FILE_SIZE, SfsInode, SimpleFileSystem};

impl SimpleFileSystem {
    pub fn read_file(&self, inode: &mut SfsInode, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let _volume = self.volume.lock();
        self.read_file_in(inode, offset, buf)
    }

    /// 超出[`MAX_FILE_SIZE`]的部分被截去，返回实际写入的字节数
    pub fn write_file(&self, inode: &mut SfsInode, offset: u64, buf: &[u8]) -> Result<usize> {
        self.write_file_in(&mut self.volume.lock(), inode, offset, buf)
    }

    /// 只支持截断到0字节
    pub fn truncate(&self, inode: &mut SfsInode, size: u64) -> Result<()> {
        self.truncate_in(&mut self.volume.lock(), inode, size)
    }
}

impl SimpleFileSystem {
    fn read_file_in(&self, inode: &mut SfsInode, offset: u64, buf: &mut [u8]) -> Result<usize> {
        inode.refresh()?;
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }

        let size = inode.size() as u64;
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let mut start = offset as usize;
        let end = (offset + buf.len() as u64).min(size) as usize;

        // 已读取多少字节
        let mut read_size = 0;
        while start < end {
            let block_index = start / BLOCK_SIZE;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_read_size = current_block_end - start;
            let dest = &mut buf[read_size..read_size + block_read_size];

            match inode.disk().block_id(block_index) {
                // 未分配的块视作全0
                0 => dest.fill(0),
                block_id => self
                    .cache
                    .get(&self.device, block_id as usize)?
                    .read_at(start % BLOCK_SIZE, dest)?,
            }

            read_size += block_read_size;
            start = current_block_end;
        }

        Ok(read_size)
    }

    fn write_file_in(
        &self,
        volume: &mut Volume,
        inode: &mut SfsInode,
        offset: u64,
        buf: &[u8],
    ) -> Result<usize> {
        inode.refresh()?;
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if offset >= MAX_FILE_SIZE as u64 {
            return Err(Error::OutOfSpace);
        }

        let mut start = offset as usize;
        let end = (start + buf.len()).min(MAX_FILE_SIZE);
        let mut write_size = 0;
        let mut failure = None;
        while start < end {
            let block_index = start / BLOCK_SIZE;
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_write_size = current_block_end - start;
            let src = &buf[write_size..write_size + block_write_size];

            if let Err(err) = self.write_block_in(volume, inode, block_index, start % BLOCK_SIZE, src)
            {
                failure = Some(err);
                break;
            }

            write_size += block_write_size;
            start = current_block_end;
        }

        // 只在写到原大小之后时扩大文件
        let new_end = offset as u32 + write_size as u32;
        if new_end > inode.size() {
            inode.disk_mut().size = new_end;
        }
        if write_size > 0 {
            inode.disk_mut().modified_time += 1;
        }
        inode.sync()?;

        match failure {
            Some(err) if write_size == 0 => Err(err),
            _ => Ok(write_size),
        }
    }

    /// 写入第`block_index`个数据块，块未分配时先分配
    fn write_block_in(
        &self,
        volume: &mut Volume,
        inode: &mut SfsInode,
        block_index: usize,
        inblock_offset: usize,
        src: &[u8],
    ) -> Result<()> {
        let block_id = match inode.disk().block_id(block_index) {
            0 => {
                let block_id = volume.alloc_block(&self.device)?;
                let disk = inode.disk_mut();
                disk.direct[block_index] = block_id;
                disk.blocks += 1;
                block_id
            }
            block_id => block_id,
        };

        let buffer = self.cache.get(&self.device, block_id as usize)?;
        buffer.write_at(inblock_offset, src)?;
        buffer.release()?;

        Ok(())
    }

    fn truncate_in(&self, volume: &mut Volume, inode: &mut SfsInode, size: u64) -> Result<()> {
        inode.refresh()?;
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }
        if size != 0 {
            return Err(Error::Unsupported);
        }

        self.release_blocks_in(volume, inode)?;
        let disk = inode.disk_mut();
        disk.size = 0;
        disk.modified_time += 1;
        inode.sync()
    }

    /// 回收全部直接块与间接块
    pub(crate) fn release_blocks_in(&self, volume: &mut Volume, inode: &mut SfsInode) -> Result<()> {
        for block_index in 0..inode.disk().direct.len() {
            let block_id = inode.disk().direct[block_index];
            if block_id == 0 {
                continue;
            }
            volume.free_block(&self.device, block_id)?;
            let disk = inode.disk_mut();
            disk.direct[block_index] = 0;
            disk.blocks = disk.blocks.saturating_sub(1);
        }

        let indirect = inode.disk().indirect;
        if indirect != 0 {
            volume.free_block(&self.device, indirect)?;
            inode.disk_mut().indirect = 0;
        }

        Ok(())
    }
}
