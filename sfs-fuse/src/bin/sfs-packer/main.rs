mod cli;

use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;

use block_dev::DeviceRegistry;
use clap::Parser;
use enumflags2::BitFlags;
use sfs::SfsType;
use typed_bytesize::ByteSizeIec;
use vfs::Vfs;

use self::cli::Cli;

const DEVICE: &str = "img0";

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    println!("source={:?}\ntarget={:?}", cli.source, cli.target);

    let disk_size = ByteSizeIec::mib(cli.size).0;
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(cli.out_dir.join("fs.img"))?;
    fd.set_len(disk_size)?;

    let registry = Arc::new(DeviceRegistry::new());
    sfs_fuse::register(&registry, DEVICE, fd)?;

    let vfs = Vfs::new(registry);
    vfs.register_filesystem(Arc::new(SfsType::new(cli.label)))
        .map_err(io::Error::other)?;
    vfs.format(DEVICE, "sfs").map_err(io::Error::other)?;
    vfs.mount(DEVICE, "/", "sfs", BitFlags::empty())
        .map_err(io::Error::other)?;

    let apps = sfs_fuse::pack(&vfs, &cli.source, &cli.target)?;
    for app in &apps {
        println!("program: {app:?}");
    }

    vfs.shutdown().map_err(io::Error::other)
}
