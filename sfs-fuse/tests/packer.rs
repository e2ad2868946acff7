use std::fs;
use std::sync::Arc;

use block_dev::{DeviceKind, DeviceRegistry};
use enumflags2::BitFlags;
use sfs::{BLOCK_SIZE, SfsType};
use vfs::{OpenFlag, Vfs};

const IMAGE_SIZE: u64 = 1024 * 1024;

fn image() -> fs::File {
    let file = tempfile::tempfile().unwrap();
    file.set_len(IMAGE_SIZE).unwrap();
    file
}

#[test]
fn block_file_reads_back_writes() {
    let registry = DeviceRegistry::new();
    let dev = sfs_fuse::register(&registry, "img0", image()).unwrap();
    assert_eq!(dev.kind(), DeviceKind::Disk);
    assert_eq!(dev.block_count(), IMAGE_SIZE as usize / BLOCK_SIZE);

    let data: Vec<u8> = (0..BLOCK_SIZE).map(|i| (i % 256) as u8).collect();
    dev.write_block(7, &data).unwrap();
    let mut buf = vec![0; BLOCK_SIZE];
    dev.read_block(7, &mut buf).unwrap();
    assert_eq!(buf, data);

    let mut two = vec![0; 2 * BLOCK_SIZE];
    dev.read_blocks(6, &mut two).unwrap();
    assert!(two[..BLOCK_SIZE].iter().all(|&b| b == 0));
    assert_eq!(&two[BLOCK_SIZE..], &data[..]);
    dev.sync().unwrap();
}

#[test]
fn image_keeps_packed_apps() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let apps = [("hello", vec![0x7f, b'E', b'L', b'F']), ("big", vec![3; 3 * BLOCK_SIZE + 5])];
    for (name, elf) in &apps {
        fs::write(source.path().join(format!("{name}.rs")), "fn main() {}").unwrap();
        fs::write(target.path().join(name), elf).unwrap();
    }

    let image = image();
    let registry = Arc::new(DeviceRegistry::new());
    sfs_fuse::register(&registry, "img0", image.try_clone().unwrap()).unwrap();
    let vfs = Vfs::new(registry);
    vfs.register_filesystem(Arc::new(SfsType::new("apps"))).unwrap();
    vfs.format("img0", "sfs").unwrap();
    vfs.mount("img0", "/", "sfs", BitFlags::empty()).unwrap();

    let packed = sfs_fuse::pack(&vfs, source.path(), target.path()).unwrap();
    assert_eq!(packed, ["big", "hello"]);
    vfs.shutdown().unwrap();

    // 重新打开镜像文件，从头挂载
    let registry = Arc::new(DeviceRegistry::new());
    let dev = sfs_fuse::register(&registry, "img1", image).unwrap();
    let vfs = Vfs::new(registry);
    vfs.register_filesystem(Arc::new(SfsType::default())).unwrap();
    vfs.mount("img1", "/", "sfs", BitFlags::empty()).unwrap();

    for (name, elf) in &apps {
        let path = format!("/bin/{name}");
        assert_eq!(vfs.stat(&path).unwrap().size, elf.len() as u64);
        assert_eq!(vfs.stat(&path).unwrap().perm, 0o755);

        let fd = vfs.open(&path, OpenFlag::read_only(), 0).unwrap();
        let mut buf = vec![0; elf.len() + 1];
        assert_eq!(vfs.read(fd, &mut buf).unwrap(), elf.len());
        assert_eq!(&buf[..elf.len()], &elf[..]);
        vfs.close(fd).unwrap();
    }

    let fs = sfs::SimpleFileSystem::mount(dev).unwrap();
    assert_eq!(fs.super_block().label(), "apps");
}

#[test]
fn missing_target_binary_fails() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    fs::write(source.path().join("ghost.rs"), "").unwrap();

    let registry = Arc::new(DeviceRegistry::new());
    sfs_fuse::register(&registry, "img0", image()).unwrap();
    let vfs = Vfs::new(registry);
    vfs.register_filesystem(Arc::new(SfsType::default())).unwrap();
    vfs.format("img0", "sfs").unwrap();
    vfs.mount("img0", "/", "sfs", BitFlags::empty()).unwrap();

    let err = sfs_fuse::pack(&vfs, source.path(), target.path()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}
