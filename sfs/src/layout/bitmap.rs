use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use derive_more::{From, Into};

use crate::{BLOCK_BITS, BLOCK_SIZE, BlockAllocator};

/// 位图区域在内存中的副本，一位对应一个块，1 表示已分配。
///
/// 第`n`位位于第`n / 8`字节的第`n % 8`位。
#[derive(Debug, Clone)]
pub struct Bitmap {
    bits: Vec<u8>,
    /// 有效位数，即文件系统的总块数
    len: u32,
}

/// 位编号
#[derive(Debug, Clone, Copy, From, Into)]
struct BitPos(u32);

impl BitPos {
    /// 拆成`(字节索引, 字节内索引)`
    #[inline]
    fn decode(self) -> (usize, u32) {
        ((self.0 / 8) as usize, self.0 % 8)
    }

    #[inline]
    fn encode(byte_index: usize, inbyte_index: u32) -> Self {
        Self(byte_index as u32 * 8 + inbyte_index)
    }
}

impl Bitmap {
    /// 占`blocks`个块、全部空闲的位图
    pub fn new(blocks: usize, len: u32) -> Self {
        Self {
            bits: vec![0; blocks * BLOCK_SIZE],
            len,
        }
    }

    /// 从磁盘读出的位图
    pub fn from_bytes(bits: Vec<u8>, len: u32) -> Self {
        Self { bits, len }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn test(&self, bit: u32) -> bool {
        let (byte_index, inbyte_index) = BitPos(bit).decode();
        bit < self.len && self.bits[byte_index] & (1 << inbyte_index) != 0
    }

    pub fn set(&mut self, bit: u32) {
        let (byte_index, inbyte_index) = BitPos(bit).decode();
        self.bits[byte_index] |= 1 << inbyte_index;
    }

    pub fn clear(&mut self, bit: u32) {
        let (byte_index, inbyte_index) = BitPos(bit).decode();
        self.bits[byte_index] &= !(1 << inbyte_index);
    }

    /// 第一个为0的位
    pub fn find_free(&self) -> Option<u32> {
        self.bits
            .iter()
            .enumerate()
            .find_map(|(byte_index, &bits)| {
                (bits != u8::MAX).then(|| BitPos::encode(byte_index, bits.trailing_ones()))
            })
            .map(u32::from)
            .filter(|&bit| bit < self.len)
    }

    /// `range`内已置位的个数
    pub fn count_set(&self, range: Range<u32>) -> u32 {
        range.filter(|&bit| self.test(bit)).count() as u32
    }

    /// 位所在的位图块(相对于位图区域的起点)
    #[inline]
    pub fn block_of(bit: u32) -> usize {
        bit as usize / BLOCK_BITS
    }

    /// 第`index`个位图块的内容
    pub fn block(&self, index: usize) -> &[u8] {
        &self.bits[index * BLOCK_SIZE..(index + 1) * BLOCK_SIZE]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

impl BlockAllocator for Bitmap {
    fn alloc(&mut self) -> Option<u32> {
        let bit = self.find_free()?;
        self.set(bit);
        Some(bit)
    }

    fn dealloc(&mut self, id: u32) -> bool {
        if !self.test(id) {
            return false;
        }
        self.clear(id);
        true
    }

    #[inline]
    fn is_allocated(&self, id: u32) -> bool {
        self.test(id)
    }
}
