use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use clap::Parser;

use crate::config::{self, Configuration, SymlinkPolicy};

/// Create a revision store and pin its settings.
#[derive(Debug, Parser)]
pub struct Args {
    /// Deflate file contents inside revisions.
    #[clap(short, long)]
    compress: bool,

    /// Record symlink targets instead of skipping symlinks.
    #[clap(long)]
    keep_symlinks: bool,
}

pub fn run(store: &Utf8Path, args: Args) -> Result<()> {
    if config::config_path(store).exists() {
        bail!("{store} is already a revision store");
    }
    std::fs::create_dir_all(store).with_context(|| format!("Couldn't create {store}"))?;

    let configuration = Configuration {
        compress_files: args.compress,
        symlinks: if args.keep_symlinks {
            SymlinkPolicy::Preserve
        } else {
            SymlinkPolicy::Skip
        },
    };
    config::save(store, &configuration)?;

    println!("Initialized revision store at {store}");
    Ok(())
}
