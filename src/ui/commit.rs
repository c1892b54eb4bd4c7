use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

use crate::config;
use crate::revision::{self, Revision};

/// Snapshot a directory into the store.
///
/// The first commit records the full tree; every later commit records a
/// delta against it.
#[derive(Debug, Parser)]
pub struct Args {
    /// The directory to snapshot
    directory: Utf8PathBuf,
}

pub fn run(store: &Utf8Path, args: Args) -> Result<()> {
    if !store.is_dir() {
        bail!("{store} is not a revision store (run init first)");
    }
    let configuration = config::load(store)?;
    let opts = configuration.scan_options();

    let base_path = revision::revision_path(store, 0);
    let rev = if base_path.exists() {
        let base = Revision::load(&base_path)?;
        Revision::delta(store, &base, &args.directory, opts)
    } else {
        Revision::base(&args.directory, opts)
    }
    .with_context(|| format!("Couldn't snapshot {}", args.directory))?;

    // Write-then-rename so a crash can't leave a half-written file at a
    // revision's final name.
    let mut fh = tempfile::Builder::new()
        .prefix("temp-revision-")
        .tempfile_in(store)
        .context("Couldn't open temporary revision for writing")?;
    rev.write_to(fh.as_file_mut())?;
    fh.as_file_mut().sync_all()?;

    let final_path = revision::revision_path(store, rev.version);
    fh.persist(&final_path)
        .with_context(|| format!("Couldn't persist {final_path}"))?;

    println!("Committed revision {} ({})", rev.version, rev.hash.short_name());
    Ok(())
}
