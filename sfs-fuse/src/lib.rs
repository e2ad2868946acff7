//! 在宿主机上制作 sfs 镜像
//!
//! [`BlockFile`]把普通文件当作块设备，镜像经由[`Vfs`]写入，
//! 与内核中的路径完全相同。

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use block_dev::{BlockDevice, Capability, Device, DeviceKind, DeviceRegistry};
use enumflags2::make_bitflags;
use sfs::BLOCK_SIZE;
use vfs::{OpenFlag, Vfs};

pub struct BlockFile(Mutex<File>);

impl BlockFile {
    pub fn new(file: File) -> Self {
        Self(Mutex::new(file))
    }

    fn with_file<T>(
        &self,
        block_id: usize,
        op: impl FnOnce(&mut File) -> io::Result<T>,
    ) -> block_dev::Result<T> {
        let mut file = self.0.lock().map_err(|_| block_dev::Error::Io)?;
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .and_then(|_| op(&mut file))
            .map_err(|err| {
                log::error!("block file: block {block_id}: {err}");
                block_dev::Error::Io
            })
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> block_dev::Result<()> {
        self.with_file(block_id, |file| file.read_exact(buf))
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> block_dev::Result<()> {
        self.with_file(block_id, |file| file.write_all(buf))
    }

    fn read_blocks(&self, start: usize, buf: &mut [u8]) -> Option<block_dev::Result<()>> {
        Some(self.read_block(start, buf))
    }

    fn write_blocks(&self, start: usize, buf: &[u8]) -> Option<block_dev::Result<()>> {
        Some(self.write_block(start, buf))
    }

    fn sync(&self) -> block_dev::Result<()> {
        self.with_file(0, |file| file.sync_data())
    }
}

/// 把`file`按其长度登记为磁盘设备，不足一块的尾部被忽略
pub fn register(registry: &DeviceRegistry, name: &str, file: File) -> io::Result<Arc<Device>> {
    let block_count = file.metadata()?.len() as usize / BLOCK_SIZE;
    registry
        .register(Device::new(
            name,
            DeviceKind::Disk,
            BLOCK_SIZE,
            block_count,
            make_bitflags!(Capability::{Readable | Writable}),
            Box::new(BlockFile::new(file)),
        ))
        .map_err(io::Error::other)
}

/// 以`source`中的源文件名(去掉扩展名)为应用名，
/// 把`target`中同名的可执行文件复制到镜像的`/bin`下，返回应用名
pub fn pack(vfs: &Vfs, source: &Path, target: &Path) -> io::Result<Vec<String>> {
    let mut apps = fs::read_dir(source)?
        .map(|app| {
            app.map(|app| {
                let name = app.file_name();
                let name = name.to_string_lossy();
                name.split_once('.')
                    .map_or(name.as_ref(), |(stem, _)| stem)
                    .to_owned()
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    apps.sort_unstable();

    match vfs.mkdir("/bin", 0o755) {
        Ok(()) | Err(vfs::Error::AlreadyExists) => (),
        Err(err) => return Err(io::Error::other(err)),
    }

    for app in &apps {
        log::info!("app={app:?}");
        let elf_data = fs::read(target.join(app))?;

        let fd = vfs
            .open(
                &format!("/bin/{app}"),
                OpenFlag::WRONLY | OpenFlag::CREAT | OpenFlag::TRUNC,
                0o755,
            )
            .map_err(io::Error::other)?;
        let written = vfs.write(fd, &elf_data);
        vfs.close(fd).map_err(io::Error::other)?;

        if written.map_err(io::Error::other)? != elf_data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("{app}: image full or file too large"),
            ));
        }
    }

    Ok(apps)
}
