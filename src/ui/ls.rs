use anyhow::Result;
use camino::Utf8Path;
use clap::Parser;

use crate::revision;
use crate::tree::{EntryPayload, Tree};

/// Print the tree of a revision.
#[derive(Debug, Parser)]
pub struct Args {
    /// The revision to list
    version: i32,
}

pub fn run(store: &Utf8Path, args: Args) -> Result<()> {
    let tree = revision::materialize(store, args.version)?;
    print_tree(&tree, 0)?;
    Ok(())
}

fn print_tree(tree: &Tree, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    for entry in &tree.entries {
        match &entry.payload {
            EntryPayload::Subtree(sub) => {
                println!(
                    "{indent}{:06o} tree {}/ {}",
                    entry.meta.mode,
                    entry.meta.name,
                    sub.hash.short_name()
                );
                print_tree(sub, depth + 1)?;
            }
            EntryPayload::Blob(blob) => {
                print!(
                    "{indent}{:06o} blob {} {}",
                    entry.meta.mode,
                    entry.meta.name,
                    entry.meta.hash.short_name()
                );
                if blob.is_compressed() {
                    print!(" ({} bytes, {} stored)", blob.size, blob.data.len());
                } else {
                    print!(" ({} bytes)", blob.size);
                }
                if let Some(target) = blob.link_target()? {
                    print!(" -> {target}");
                }
                println!();
            }
        }
    }
    Ok(())
}
