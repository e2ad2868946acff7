use core::{ptr, slice};

use crate::{BLOCK_BITS, BLOCK_SIZE, INODE_RATIO, MAGIC, ROOT_INODE, VERSION};

use super::INODES_PER_BLOCK;

const LABEL_CAP: usize = 32;

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 定位其它连续区域；
/// - 记录空闲块与空闲索引节点的个数
///
/// 位于0号块的开头，块内其余部分保持为0。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    pub magic: u32,
    pub version: u32,
    pub block_size: u32,
    /// 文件系统占据块数
    pub total_blocks: u32,
    pub inode_blocks: u32,
    pub data_blocks: u32,
    pub free_blocks: u32,
    pub free_inodes: u32,
    pub root_inode: u32,
    pub first_data_block: u32,
    pub bitmap_blocks: u32,
    pub created_time: u32,
    pub modified_time: u32,
    pub mount_count: u32,
    label: [u8; LABEL_CAP],
}

impl SuperBlock {
    pub const SIZE: usize = 88;

    /// 按块数规划布局，设备小到放不下元数据与根目录块时返回`None`
    pub fn new(total_blocks: u32, label: &str) -> Option<Self> {
        let bitmap_blocks = total_blocks.div_ceil(BLOCK_BITS as u32);
        let inode_blocks = total_blocks / INODE_RATIO;
        let first_data_block = 1 + bitmap_blocks + inode_blocks;
        if inode_blocks == 0 || total_blocks <= first_data_block {
            return None;
        }
        let data_blocks = total_blocks - first_data_block;

        let mut super_block = Self {
            magic: MAGIC,
            version: VERSION,
            block_size: BLOCK_SIZE as u32,
            total_blocks,
            inode_blocks,
            data_blocks,
            // 根目录占去一个数据块与一个索引节点
            free_blocks: data_blocks - 1,
            free_inodes: inode_blocks * INODES_PER_BLOCK as u32 - 1,
            root_inode: ROOT_INODE,
            first_data_block,
            bitmap_blocks,
            ..Default::default()
        };
        super_block.set_label(label);

        Some(super_block)
    }

    /// 魔数、版本、块大小必须与本实现一致，布局必须自洽
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.magic != MAGIC {
            return Err("bad magic");
        }
        if self.version != VERSION {
            return Err("unsupported version");
        }
        if self.block_size != BLOCK_SIZE as u32 {
            return Err("unsupported block size");
        }
        // 字段来自磁盘，任何一步溢出都视作布局损坏
        let first_data_block = self
            .bitmap_blocks
            .checked_add(self.inode_blocks)
            .and_then(|n| n.checked_add(1));
        let end = self.first_data_block.checked_add(self.data_blocks);
        let bitmap_bits = self.bitmap_blocks.checked_mul(BLOCK_BITS as u32);
        let inodes = self.inode_blocks.checked_mul(INODES_PER_BLOCK as u32);
        if first_data_block != Some(self.first_data_block)
            || end != Some(self.total_blocks)
            || bitmap_bits.is_none_or(|bits| bits < self.total_blocks)
            || inodes.is_none()
        {
            return Err("inconsistent layout");
        }
        if self.root_inode != ROOT_INODE {
            return Err("bad root inode");
        }
        Ok(())
    }

    /// 索引节点表的起始块
    #[inline]
    pub fn inode_table_start(&self) -> u32 {
        1 + self.bitmap_blocks
    }

    #[inline]
    pub fn total_inodes(&self) -> u32 {
        self.inode_blocks * INODES_PER_BLOCK as u32
    }

    pub fn label(&self) -> &str {
        let len = self.label.iter().position(|&c| c == 0).unwrap_or(LABEL_CAP);
        core::str::from_utf8(&self.label[..len]).unwrap_or_default()
    }

    /// 超出部分被截断，保留结尾的0
    pub fn set_label(&mut self, label: &str) {
        let mut len = label.len().min(LABEL_CAP - 1);
        while !label.is_char_boundary(len) {
            len -= 1;
        }
        self.label = [0; LABEL_CAP];
        self.label[..len].copy_from_slice(&label.as_bytes()[..len]);
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), Self::SIZE) }
    }
}
