use anyhow::Result;
use camino::Utf8Path;

use crate::revision::{self, Contents};

/// List every revision in the store.
pub fn run(store: &Utf8Path) -> Result<()> {
    let revisions = revision::list(store)?;
    if revisions.is_empty() {
        println!("No revisions in {store}");
        return Ok(());
    }

    for rev in revisions {
        match &rev.contents {
            Contents::Base(tree) => println!(
                "revision {:>3}  base   {}  {} top-level entries",
                rev.version,
                rev.hash.short_name(),
                tree.entries.len()
            ),
            Contents::Delta(changes) => println!(
                "revision {:>3}  delta  {}  {} changes",
                rev.version,
                rev.hash.short_name(),
                changes.change_count()
            ),
        }
    }
    Ok(())
}
