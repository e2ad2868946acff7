use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// 块号越界、缓冲区长度不符、空名称等
    #[error("invalid argument")]
    InvalidArgument,
    #[error("no such device")]
    NotFound,
    #[error("device already exists")]
    AlreadyExists,
    /// 设备不具备读或写的能力
    #[error("permission denied")]
    PermissionDenied,
    /// 后端读写失败
    #[error("I/O error")]
    Io,
    /// 缓冲池中所有缓冲都在使用
    #[error("no free buffer")]
    NoBuffer,
}
