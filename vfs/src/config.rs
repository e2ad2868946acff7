//! VFS 的各项容量

/// 可注册的文件系统类型数
pub const MAX_FS_TYPES: usize = 16;
/// 挂载表容量
pub const MAX_MOUNTS: usize = 16;
/// 文件描述符表容量，含标准输入输出
pub const MAX_OPEN_FILES: usize = 32;
/// 0、1、2 留给标准输入输出
pub const STDIO_RESERVED: usize = 3;
/// 路径的最大字节数
pub const MAX_PATH: usize = 1024;
