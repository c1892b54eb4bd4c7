use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

use crate::revision;

/// Rebuild a revision into a directory.
#[derive(Debug, Parser)]
pub struct Args {
    /// The revision to restore
    version: i32,

    /// Where to put it (created if missing)
    #[clap(short, long)]
    output: Utf8PathBuf,
}

pub fn run(store: &Utf8Path, args: Args) -> Result<()> {
    revision::restore(store, args.version, &args.output)
        .with_context(|| format!("Couldn't restore revision {} to {}", args.version, args.output))?;
    println!("Restored revision {} to {}", args.version, args.output);
    Ok(())
}
