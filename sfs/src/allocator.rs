/// 块分配器
///
/// 目前的实现是线性扫描的位图([`Bitmap`](crate::layout::Bitmap))，
/// 换用空闲链表等结构时调用者无需改动。
pub trait BlockAllocator {
    /// 分配一个块，返回块号；用尽时返回`None`
    fn alloc(&mut self) -> Option<u32>;

    /// 释放块，块原本空闲时返回`false`
    fn dealloc(&mut self, id: u32) -> bool;

    fn is_allocated(&self, id: u32) -> bool;
}
