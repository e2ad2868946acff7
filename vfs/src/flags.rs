use enumflags2::{BitFlags, bitflags};

#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum OpenFlag {
    /// 只写
    WRONLY = 0b0000_0000_0000_0001,
    /// 读写兼备
    RDWR   = 0b0000_0000_0000_0010,
    /// 文件不存在时创建
    CREAT  = 0b0000_0001_0000_0000,
    /// 与`CREAT`同用，文件已存在则失败
    EXCL   = 0b0000_0010_0000_0000,
    /// 先清空文件，再交给用户
    TRUNC  = 0b0001_0000_0000_0000,
    /// 每次写入都追加到末尾
    APPEND = 0b0010_0000_0000_0000,
}

impl OpenFlag {
    // enumflags2拒绝值为0的标志
    /// 只读
    pub const RDONLY: u32 = 0;

    #[inline]
    pub fn read_only() -> BitFlags<OpenFlag> {
        BitFlags::from_bits_truncate(Self::RDONLY)
    }

    /// 返回`[可读, 可写]`
    pub fn access(flags: BitFlags<OpenFlag>) -> [bool; 2] {
        if flags.contains(OpenFlag::WRONLY) {
            [false, true]
        } else if flags.contains(OpenFlag::RDWR) {
            [true, true]
        } else {
            [true, false]
        }
    }
}

#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountFlag {
    /// 只读挂载，拒绝一切修改
    ReadOnly = 0b01,
}

/// 定位的基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl TryFrom<u32> for Whence {
    type Error = crate::Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Set),
            1 => Ok(Self::Cur),
            2 => Ok(Self::End),
            _ => Err(crate::Error::InvalidArgument),
        }
    }
}
