use std::sync::Arc;
use std::sync::Mutex;

use block_dev::{
    BlockDevice, Capability, Device, DeviceKind, DeviceRegistry, Error, RamDisk, Result, ram_disk,
};
use enumflags2::BitFlags;

const BS: usize = 4096;

/// 只实现单块读写的驱动，用来验证批量读写的逐块回退
struct PlainDisk(Mutex<Vec<u8>>);

impl BlockDevice for PlainDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        let data = self.0.lock().unwrap();
        buf.copy_from_slice(&data[block_id * BS..(block_id + 1) * BS]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        let mut data = self.0.lock().unwrap();
        data[block_id * BS..(block_id + 1) * BS].copy_from_slice(buf);
        Ok(())
    }
}

#[test]
fn register_and_find() {
    let registry = DeviceRegistry::new();
    ram_disk::create(&registry, "ram0", 16 * BS).unwrap();
    ram_disk::create(&registry, "ram1", 16 * BS).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.find("ram0").unwrap().block_count(), 16);
    assert!(registry.find("hd0").is_none());

    // 新设备在表头
    let names: Vec<_> = registry
        .devices()
        .iter()
        .map(|dev| dev.name().to_owned())
        .collect();
    assert_eq!(names, ["ram1", "ram0"]);
}

#[test]
fn register_rejects_duplicates_and_empty_names() {
    let registry = DeviceRegistry::new();
    ram_disk::create(&registry, "ram0", 4 * BS).unwrap();

    assert_eq!(
        ram_disk::create(&registry, "ram0", 4 * BS).unwrap_err(),
        Error::AlreadyExists
    );
    assert_eq!(
        ram_disk::create(&registry, "", 4 * BS).unwrap_err(),
        Error::InvalidArgument
    );
    assert_eq!(
        ram_disk::create(&registry, "tiny", BS - 1).unwrap_err(),
        Error::InvalidArgument
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn block_bounds_and_stats() {
    let registry = DeviceRegistry::new();
    let dev = ram_disk::create(&registry, "ram0", 8 * BS).unwrap();

    let block = vec![0xAB; BS];
    dev.write_block(7, &block).unwrap();
    let mut buf = vec![0; BS];
    dev.read_block(7, &mut buf).unwrap();
    assert_eq!(buf, block);

    assert_eq!(dev.read_block(8, &mut buf), Err(Error::InvalidArgument));
    assert_eq!(dev.write_block(8, &block), Err(Error::InvalidArgument));
    assert_eq!(dev.read_block(0, &mut buf[..100]), Err(Error::InvalidArgument));

    let stats = dev.stats();
    assert_eq!(stats.reads, 1);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.bytes_read, BS as u64);
    assert_eq!(stats.bytes_written, BS as u64);
}

#[test]
fn missing_capability_is_permission_denied() {
    let registry = DeviceRegistry::new();
    let dev = registry
        .register(Device::new(
            "rom0",
            DeviceKind::CdRom,
            BS,
            4,
            BitFlags::from(Capability::Readable),
            Box::new(RamDisk::new(4 * BS, BS)),
        ))
        .unwrap();

    let mut buf = vec![0; BS];
    dev.read_block(0, &mut buf).unwrap();
    assert_eq!(dev.write_block(0, &buf), Err(Error::PermissionDenied));
    assert!(!dev.is_writable());
}

#[test]
fn ranged_io_fails_before_touching_the_device() {
    let registry = DeviceRegistry::new();
    let dev = ram_disk::create(&registry, "ram0", 4 * BS).unwrap();

    let data = vec![0x5A; 2 * BS];
    assert_eq!(dev.write_blocks(3, &data), Err(Error::InvalidArgument));
    assert_eq!(dev.write_blocks(0, &[]), Err(Error::InvalidArgument));

    let mut buf = vec![0xFF; BS];
    dev.read_block(3, &mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0));
    assert_eq!(dev.stats().writes, 0);
}

#[test]
fn ranged_io_falls_back_to_single_blocks() {
    let registry = DeviceRegistry::new();
    let dev = registry
        .register(Device::new(
            "plain0",
            DeviceKind::Disk,
            BS,
            4,
            Capability::Readable | Capability::Writable,
            Box::new(PlainDisk(Mutex::new(vec![0; 4 * BS]))),
        ))
        .unwrap();

    let mut data = vec![1; 3 * BS];
    data[BS..2 * BS].fill(2);
    data[2 * BS..].fill(3);
    dev.write_blocks(1, &data).unwrap();

    let mut buf = vec![0; 3 * BS];
    dev.read_blocks(1, &mut buf).unwrap();
    assert_eq!(buf, data);

    let stats = dev.stats();
    assert_eq!(stats.writes, 3);
    assert_eq!(stats.reads, 3);
}

#[test]
fn registries_are_independent() {
    let a = Arc::new(DeviceRegistry::new());
    let b = Arc::new(DeviceRegistry::new());
    ram_disk::create(&a, "ram0", BS).unwrap();
    ram_disk::create(&b, "ram0", BS).unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
}
