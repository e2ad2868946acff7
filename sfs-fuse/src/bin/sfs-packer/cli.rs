use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
pub struct Cli {
    /// Executable source directory
    #[arg(long, short)]
    pub source: PathBuf,

    /// Executable target directory
    #[arg(long, short)]
    pub target: PathBuf,

    /// Output directory
    #[arg(long, short = 'O')]
    pub out_dir: PathBuf,

    /// Image size in MiB
    #[arg(long, default_value_t = 16)]
    pub size: u64,

    /// Volume label
    #[arg(long, default_value = sfs::DEFAULT_LABEL)]
    pub label: String,
}
