use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("no such file or directory")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("permission denied")]
    PermissionDenied,
    /// 位图、索引节点表或目录的直接块耗尽
    #[error("no space left on device")]
    OutOfSpace,
    #[error("I/O error")]
    Io,
    #[error("out of memory")]
    OutOfMemory,
    #[error("is a directory")]
    IsADirectory,
    #[error("not a directory")]
    NotADirectory,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// 尚未实现的分支，如截断到非零长度、间接块
    #[error("operation not supported")]
    Unsupported,
}

impl Error {
    /// 系统调用层使用的负错误码
    pub fn errno(self) -> isize {
        -match self {
            Self::PermissionDenied => 1,
            Self::NotFound => 2,
            Self::Io => 5,
            Self::OutOfMemory => 12,
            Self::AlreadyExists => 17,
            Self::NotADirectory => 20,
            Self::IsADirectory => 21,
            Self::InvalidArgument => 22,
            Self::OutOfSpace => 28,
            Self::DirectoryNotEmpty => 39,
            Self::Unsupported => 95,
        }
    }
}

impl From<block_dev::Error> for Error {
    fn from(err: block_dev::Error) -> Self {
        use block_dev::Error as E;

        match err {
            E::InvalidArgument => Self::InvalidArgument,
            E::NotFound => Self::NotFound,
            E::AlreadyExists => Self::AlreadyExists,
            E::PermissionDenied => Self::PermissionDenied,
            E::Io => Self::Io,
            E::NoBuffer => Self::OutOfMemory,
        }
    }
}
