use std::mem;

use sfs::layout::{DIRENTS_PER_BLOCK, INODES_PER_BLOCK};
use sfs::{DirEntry, DiskInode, SuperBlock};

#[test]
fn layout() {
    assert_eq!(88, mem::size_of::<SuperBlock>());
    assert_eq!(88, mem::size_of::<DiskInode>());
    assert_eq!(264, mem::size_of::<DirEntry>());
    assert_eq!(46, INODES_PER_BLOCK);
    assert_eq!(15, DIRENTS_PER_BLOCK);
}
