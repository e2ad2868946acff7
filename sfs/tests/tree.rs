use std::sync::Arc;

use block_dev::{Device, DeviceRegistry, ram_disk};
use sfs::{BLOCK_SIZE, DirEntry, MAX_FILE_SIZE, SimpleFileSystem};
use vfs::{DirEntryType, Error, Inode};

const MIB: usize = 1024 * 1024;

fn ram_device(size: usize) -> Arc<Device> {
    let registry = DeviceRegistry::new();
    let dev = ram_disk::create(&registry, "ram0", size).unwrap();
    SimpleFileSystem::format(&dev, "test").unwrap();
    dev
}

fn mounted(size: usize) -> Arc<SimpleFileSystem> {
    SimpleFileSystem::mount(ram_device(size)).unwrap()
}

fn names(fs: &Arc<SimpleFileSystem>, path: &str) -> Vec<String> {
    let mut dir = SimpleFileSystem::resolve_path(fs, path).unwrap();
    let mut offset = 0;
    let entries = fs.readdir(&mut dir, &mut offset, usize::MAX).unwrap();
    entries.into_iter().map(|entry| entry.name).collect()
}

#[test]
fn write_survives_remount() {
    let dev = ram_device(MIB);
    let fs = SimpleFileSystem::mount(dev.clone()).unwrap();
    let baseline = fs.super_block().free_blocks;

    let data: Vec<u8> = (0..5000).map(|i| (i % 251) as u8).collect();
    let mut file = SimpleFileSystem::create_file(&fs, "/a.txt", 0o644).unwrap();
    assert_eq!(fs.write_file(&mut file, 0, &data).unwrap(), 5000);
    drop(file);
    fs.unmount().unwrap();
    drop(fs);

    let fs = SimpleFileSystem::mount(dev).unwrap();
    let mut file = SimpleFileSystem::resolve_path(&fs, "/a.txt").unwrap();
    assert_eq!(file.size(), 5000);
    assert_eq!(file.disk().blocks, 2);

    let mut buf = vec![0; 8192];
    assert_eq!(fs.read_file(&mut file, 0, &mut buf).unwrap(), 5000);
    assert_eq!(&buf[..5000], &data[..]);
    assert_eq!(fs.super_block().free_blocks, baseline - 2);
}

#[test]
fn mkdir_twice_then_rmdir_twice() {
    let fs = mounted(MIB);

    SimpleFileSystem::create_directory(&fs, "/x", 0o755).unwrap();
    assert_eq!(
        SimpleFileSystem::create_directory(&fs, "/x", 0o755).map(drop),
        Err(Error::AlreadyExists)
    );
    assert_eq!(SimpleFileSystem::delete_directory(&fs, "/x"), Ok(()));
    assert_eq!(
        SimpleFileSystem::delete_directory(&fs, "/x"),
        Err(Error::NotFound)
    );
}

#[test]
fn names_are_unique_across_kinds() {
    let fs = mounted(MIB);
    SimpleFileSystem::create_file(&fs, "/same", 0o644).unwrap();

    assert_eq!(
        SimpleFileSystem::create_directory(&fs, "/same", 0o755).map(drop),
        Err(Error::AlreadyExists)
    );
    let mut root = SimpleFileSystem::root(&fs).unwrap();
    assert_eq!(fs.add_dirent(&mut root, "same", 7), Err(Error::AlreadyExists));
}

#[test]
fn nested_paths_resolve() {
    let fs = mounted(MIB);
    SimpleFileSystem::create_directory(&fs, "/usr", 0o755).unwrap();
    SimpleFileSystem::create_directory(&fs, "/usr/bin", 0o755).unwrap();
    let file = SimpleFileSystem::create_file(&fs, "/usr/bin/ls", 0o755).unwrap();

    let found = SimpleFileSystem::resolve_path(&fs, "//usr/bin/ls").unwrap();
    assert_eq!(found.ino(), file.ino());
    assert!(SimpleFileSystem::resolve_path(&fs, "/").unwrap().is_dir());

    assert_eq!(
        SimpleFileSystem::resolve_path(&fs, "/usr/lib/ls").map(drop),
        Err(Error::NotFound)
    );
    assert_eq!(
        SimpleFileSystem::create_file(&fs, "/usr/bin/ls/x", 0o644).map(drop),
        Err(Error::NotADirectory)
    );
    let long = format!("/{}", "n".repeat(255));
    assert_eq!(
        SimpleFileSystem::resolve_path(&fs, &long).map(drop),
        Err(Error::NotFound)
    );
    assert_eq!(
        SimpleFileSystem::create_file(&fs, &long, 0o644).map(drop),
        Err(Error::InvalidArgument)
    );
}

#[test]
fn directory_holds_twelve_blocks_of_entries() {
    let fs = mounted(4 * MIB);
    let capacity = 12 * (BLOCK_SIZE / DirEntry::SIZE);

    for i in 0..capacity {
        SimpleFileSystem::create_file(&fs, &format!("/f{i}"), 0o644).unwrap();
    }
    let free_inodes = fs.super_block().free_inodes;
    assert_eq!(
        SimpleFileSystem::create_file(&fs, "/overflow", 0o644).map(drop),
        Err(Error::OutOfSpace)
    );
    // 失败的创建不占用索引节点
    assert_eq!(fs.super_block().free_inodes, free_inodes);

    let root = SimpleFileSystem::root(&fs).unwrap();
    assert_eq!(root.disk().blocks, 12);
    assert_eq!(names(&fs, "/").len(), capacity);

    // 删除后空出的槽位可以复用
    SimpleFileSystem::delete_file(&fs, "/f7").unwrap();
    SimpleFileSystem::create_file(&fs, "/overflow", 0o644).unwrap();
}

#[test]
fn file_is_capped_at_direct_blocks() {
    let fs = mounted(MIB);
    let mut file = SimpleFileSystem::create_file(&fs, "/big", 0o644).unwrap();

    let data = vec![0x5a; MAX_FILE_SIZE + 100];
    assert_eq!(fs.write_file(&mut file, 0, &data).unwrap(), MAX_FILE_SIZE);
    assert_eq!(file.size() as usize, MAX_FILE_SIZE);
    assert_eq!(file.disk().blocks, 12);
    assert_eq!(file.disk().indirect, 0);

    assert_eq!(
        fs.write_file(&mut file, MAX_FILE_SIZE as u64, b"x"),
        Err(Error::OutOfSpace)
    );
    let mut buf = vec![0; 16];
    assert_eq!(fs.read_file(&mut file, MAX_FILE_SIZE as u64, &mut buf).unwrap(), 0);
}

#[test]
fn sparse_write_reads_zeros() {
    let fs = mounted(MIB);
    let mut file = SimpleFileSystem::create_file(&fs, "/sparse", 0o644).unwrap();
    let free = fs.super_block().free_blocks;

    let offset = 3 * BLOCK_SIZE as u64 + 10;
    assert_eq!(fs.write_file(&mut file, offset, b"tail").unwrap(), 4);
    assert_eq!(file.size() as u64, offset + 4);
    // 只分配被写到的块
    assert_eq!(file.disk().blocks, 1);
    assert_eq!(fs.super_block().free_blocks, free - 1);

    let mut buf = vec![0xff; offset as usize + 4];
    assert_eq!(fs.read_file(&mut file, 0, &mut buf).unwrap(), buf.len());
    assert!(buf[..offset as usize].iter().all(|&b| b == 0));
    assert_eq!(&buf[offset as usize..], b"tail");
}

#[test]
fn overwrite_does_not_shrink() {
    let fs = mounted(MIB);
    let mut file = SimpleFileSystem::create_file(&fs, "/f", 0o644).unwrap();

    fs.write_file(&mut file, 0, b"hello world").unwrap();
    fs.write_file(&mut file, 0, b"HELLO").unwrap();
    assert_eq!(file.size(), 11);

    let mut buf = [0; 32];
    let n = fs.read_file(&mut file, 0, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"HELLO world");
    assert_eq!(fs.read_file(&mut file, 6, &mut buf[..3]).unwrap(), 3);
    assert_eq!(&buf[..3], b"wor");
}

#[test]
fn truncate_only_to_zero() {
    let fs = mounted(MIB);
    let free = fs.super_block().free_blocks;
    let mut file = SimpleFileSystem::create_file(&fs, "/t", 0o644).unwrap();
    fs.write_file(&mut file, 0, &vec![1; 3 * BLOCK_SIZE]).unwrap();
    assert_eq!(fs.super_block().free_blocks, free - 3);

    assert_eq!(fs.truncate(&mut file, 10), Err(Error::Unsupported));
    assert_eq!(file.size() as usize, 3 * BLOCK_SIZE);

    fs.truncate(&mut file, 0).unwrap();
    assert_eq!(file.size(), 0);
    assert_eq!(file.disk().blocks, 0);
    assert!(file.disk().data_blocks().next().is_none());
    assert_eq!(fs.super_block().free_blocks, free);

    let mut dir = SimpleFileSystem::root(&fs).unwrap();
    assert_eq!(fs.truncate(&mut dir, 0), Err(Error::IsADirectory));
}

#[test]
fn unlink_releases_blocks_and_inode() {
    let fs = mounted(MIB);
    let sb = fs.super_block();

    let mut file = SimpleFileSystem::create_file(&fs, "/gone", 0o644).unwrap();
    fs.write_file(&mut file, 0, &vec![9; 2 * BLOCK_SIZE]).unwrap();
    SimpleFileSystem::delete_file(&fs, "/gone").unwrap();

    let after = fs.super_block();
    assert_eq!(after.free_blocks, sb.free_blocks);
    assert_eq!(after.free_inodes, sb.free_inodes);
    assert_eq!(
        SimpleFileSystem::resolve_path(&fs, "/gone").map(drop),
        Err(Error::NotFound)
    );
    // 旧句柄不能再使用
    let mut buf = [0; 4];
    assert_eq!(fs.read_file(&mut file, 0, &mut buf), Err(Error::NotFound));
}

#[test]
fn stale_handle_does_not_follow_reused_inode() {
    let fs = mounted(MIB);
    let mut old = SimpleFileSystem::create_file(&fs, "/old", 0o644).unwrap();
    SimpleFileSystem::delete_file(&fs, "/old").unwrap();

    let mut new = SimpleFileSystem::create_file(&fs, "/new", 0o644).unwrap();
    assert_eq!(new.ino(), old.ino());
    assert_ne!(new.disk().generation, old.disk().generation);
    fs.write_file(&mut new, 0, b"fresh").unwrap();

    assert_eq!(fs.write_file(&mut old, 0, b"stale"), Err(Error::NotFound));
    assert_eq!(fs.truncate(&mut old, 0), Err(Error::NotFound));
    assert_eq!(Inode::stat(&old).map(drop), Err(Error::NotFound));
    drop(old);

    let mut buf = [0; 5];
    assert_eq!(fs.read_file(&mut new, 0, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"fresh");
    assert_eq!(new.size(), 5);
}

#[test]
fn generation_survives_free_and_remount() {
    let dev = ram_device(MIB);
    let fs = SimpleFileSystem::mount(dev.clone()).unwrap();
    let first = SimpleFileSystem::create_file(&fs, "/f", 0o644).unwrap();
    let generation = first.disk().generation;
    drop(first);
    SimpleFileSystem::delete_file(&fs, "/f").unwrap();
    fs.unmount().unwrap();
    drop(fs);

    let fs = SimpleFileSystem::mount(dev).unwrap();
    let again = SimpleFileSystem::create_file(&fs, "/g", 0o644).unwrap();
    assert_eq!(again.disk().generation, generation + 1);
}

#[test]
fn unlink_and_rmdir_check_kinds() {
    let fs = mounted(MIB);
    SimpleFileSystem::create_directory(&fs, "/d", 0o755).unwrap();
    SimpleFileSystem::create_file(&fs, "/d/f", 0o644).unwrap();

    assert_eq!(SimpleFileSystem::delete_file(&fs, "/d"), Err(Error::IsADirectory));
    assert_eq!(
        SimpleFileSystem::delete_directory(&fs, "/d/f"),
        Err(Error::NotADirectory)
    );
    assert_eq!(
        SimpleFileSystem::delete_directory(&fs, "/d"),
        Err(Error::DirectoryNotEmpty)
    );
    assert_eq!(
        SimpleFileSystem::delete_directory(&fs, "/"),
        Err(Error::PermissionDenied)
    );

    SimpleFileSystem::delete_file(&fs, "/d/f").unwrap();
    SimpleFileSystem::delete_directory(&fs, "/d").unwrap();
    assert!(names(&fs, "/").is_empty());
}

#[test]
fn directory_size_tracks_inserts_and_removes() {
    let fs = mounted(MIB);
    SimpleFileSystem::create_file(&fs, "/a", 0o644).unwrap();
    SimpleFileSystem::create_file(&fs, "/b", 0o644).unwrap();
    SimpleFileSystem::delete_file(&fs, "/a").unwrap();

    let root = SimpleFileSystem::root(&fs).unwrap();
    assert_eq!(root.size() as usize, DirEntry::SIZE);
    assert_eq!(root.disk().blocks, 1);
}

#[test]
fn readdir_reports_kinds_and_resumes() {
    let fs = mounted(MIB);
    SimpleFileSystem::create_directory(&fs, "/dir", 0o755).unwrap();
    for name in ["a", "b", "c"] {
        SimpleFileSystem::create_file(&fs, &format!("/dir/{name}"), 0o644).unwrap();
    }
    SimpleFileSystem::create_directory(&fs, "/dir/sub", 0o755).unwrap();
    SimpleFileSystem::delete_file(&fs, "/dir/b").unwrap();

    let mut dir = SimpleFileSystem::resolve_path(&fs, "/dir").unwrap();
    let mut offset = 0;
    let first = fs.readdir(&mut dir, &mut offset, 2).unwrap();
    let rest = fs.readdir(&mut dir, &mut offset, 10).unwrap();
    assert!(fs.readdir(&mut dir, &mut offset, 10).unwrap().is_empty());

    let all: Vec<_> = first.iter().chain(&rest).collect();
    assert_eq!(first.len(), 2);
    assert_eq!(
        all.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>(),
        ["a", "c", "sub"]
    );
    assert_eq!(all[0].ty, DirEntryType::Regular);
    assert_eq!(all[2].ty, DirEntryType::Directory);

    let mut file = SimpleFileSystem::resolve_path(&fs, "/dir/a").unwrap();
    let mut offset = 0;
    assert_eq!(
        fs.readdir(&mut file, &mut offset, 1).map(drop),
        Err(Error::NotADirectory)
    );
}

#[test]
fn rename_moves_entries() {
    let fs = mounted(MIB);
    SimpleFileSystem::create_directory(&fs, "/src", 0o755).unwrap();
    SimpleFileSystem::create_directory(&fs, "/dst", 0o755).unwrap();
    let mut file = SimpleFileSystem::create_file(&fs, "/src/f", 0o644).unwrap();
    fs.write_file(&mut file, 0, b"payload").unwrap();

    SimpleFileSystem::rename(&fs, "/src/f", "/dst/g").unwrap();
    assert!(names(&fs, "/src").is_empty());
    assert_eq!(names(&fs, "/dst"), ["g"]);

    let mut moved = SimpleFileSystem::resolve_path(&fs, "/dst/g").unwrap();
    assert_eq!(moved.ino(), file.ino());
    let mut buf = [0; 7];
    fs.read_file(&mut moved, 0, &mut buf).unwrap();
    assert_eq!(&buf, b"payload");

    // 同一目录内改名
    SimpleFileSystem::rename(&fs, "/dst/g", "/dst/h").unwrap();
    assert_eq!(names(&fs, "/dst"), ["h"]);
    SimpleFileSystem::rename(&fs, "/dst/h", "/dst/h").unwrap();
}

#[test]
fn rename_rejects_conflicts() {
    let fs = mounted(MIB);
    SimpleFileSystem::create_directory(&fs, "/a", 0o755).unwrap();
    SimpleFileSystem::create_directory(&fs, "/a/b", 0o755).unwrap();
    SimpleFileSystem::create_file(&fs, "/f", 0o644).unwrap();

    assert_eq!(
        SimpleFileSystem::rename(&fs, "/f", "/a/b"),
        Err(Error::AlreadyExists)
    );
    assert_eq!(
        SimpleFileSystem::rename(&fs, "/a", "/a/b/c"),
        Err(Error::InvalidArgument)
    );
    assert_eq!(
        SimpleFileSystem::rename(&fs, "/missing", "/x"),
        Err(Error::NotFound)
    );
    assert_eq!(
        SimpleFileSystem::rename(&fs, "/f", "/nowhere/f"),
        Err(Error::NotFound)
    );
    assert_eq!(names(&fs, "/"), ["a", "f"]);
}

#[test]
fn stat_reports_inode_fields() {
    let fs = mounted(MIB);
    let mut file = SimpleFileSystem::create_file(&fs, "/s", 0o640).unwrap();
    fs.write_file(&mut file, 0, &[1; 100]).unwrap();

    let stat = SimpleFileSystem::stat(&fs, "/s").unwrap();
    assert_eq!(stat.ino, file.ino() as u64);
    assert_eq!(stat.mode, DirEntryType::Regular);
    assert_eq!(stat.perm, 0o640);
    assert_eq!(stat.size, 100);
    assert_eq!(stat.blocks, 1);
    assert_eq!(stat.block_size, BLOCK_SIZE as u64);
    assert_eq!(stat.links, 1);
    assert_eq!(Inode::stat(&file).unwrap(), stat);

    assert!(SimpleFileSystem::stat(&fs, "/").unwrap().is_dir());
}

#[test]
fn handles_of_one_inode_stay_coherent() {
    let fs = mounted(MIB);
    let mut writer = SimpleFileSystem::create_file(&fs, "/shared", 0o644).unwrap();
    let mut reader = SimpleFileSystem::resolve_path(&fs, "/shared").unwrap();

    writer.write_at(0, b"first").unwrap();
    reader.write_at(5, b"second").unwrap();
    writer.write_at(11, b"third").unwrap();

    let mut buf = [0; 32];
    let n = reader.read_at(0, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"firstsecondthird");
}
