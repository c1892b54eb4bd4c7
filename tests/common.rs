#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use walkdir::WalkDir;

pub fn cli_run(store: &Path) -> Result<Command> {
    let bin_name = env!("CARGO_PKG_NAME");
    let mut cmd = Command::cargo_bin(bin_name)?;
    cmd.arg("--store").arg(store);
    cmd.arg("-vvv");
    Ok(cmd)
}

fn relative_listing(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.expect("couldn't walk dir").into_path())
        .map(|p| p.strip_prefix(root).unwrap().to_owned())
        .collect()
}

/// Assert `actual` holds exactly the files of `expected`, with equal
/// bytes and permission bits.
pub fn assert_dirs_match(expected: &Path, actual: &Path) {
    let listing = relative_listing(expected);
    assert_eq!(listing, relative_listing(actual), "directory listings differ");

    for rel in listing {
        let e = expected.join(&rel);
        let a = actual.join(&rel);
        let emeta = fs::symlink_metadata(&e).expect("couldn't stat expected file");

        if emeta.file_type().is_symlink() {
            assert_eq!(
                fs::read_link(&e).unwrap(),
                fs::read_link(&a).unwrap(),
                "link targets differ: {}",
                rel.display()
            );
        } else if emeta.is_file() {
            assert_eq!(
                fs::read(&e).unwrap(),
                fs::read(&a).unwrap(),
                "contents differ: {}",
                rel.display()
            );
            let ameta = fs::symlink_metadata(&a).unwrap();
            assert_eq!(
                emeta.permissions().mode() & 0o7777,
                ameta.permissions().mode() & 0o7777,
                "modes differ: {}",
                rel.display()
            );
        }
    }
}
