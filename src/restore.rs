//! Put a tree back onto the filesystem: contents, modes, owners, times.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::os::unix::fs::PermissionsExt;

use camino::Utf8Path;
use rustix::fs::{AtFlags, CWD, Timestamps};
use rustix::process::{Gid, Uid};
use tracing::*;

use crate::blob::{Blob, Timespec};
use crate::error::{Error, Result};
use crate::tree::{EntryPayload, Tree};

/// Materialize `tree` into `dir`, creating it if needed.
///
/// Everything is fatal except `chown`, which unprivileged processes
/// usually can't do; that failure is logged and skipped. A failure
/// partway through leaves whatever was already written.
pub fn restore_tree(tree: &Tree, dir: &Utf8Path) -> Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(Error::Io(e)),
    }

    for entry in &tree.entries {
        let path = dir.join(&entry.meta.name);
        match &entry.payload {
            EntryPayload::Subtree(sub) => restore_tree(sub, &path)?,
            EntryPayload::Blob(blob) if blob.is_symlink() => restore_symlink(blob, &path)?,
            EntryPayload::Blob(blob) => restore_file(blob, &path)?,
        }
    }
    Ok(())
}

fn restore_file(blob: &Blob, path: &Utf8Path) -> Result<()> {
    let contents = blob.contents()?;
    let mut fh = fs::File::create(path)?;
    fh.write_all(&contents)?;
    drop(fh);

    fs::set_permissions(path, fs::Permissions::from_mode(blob.mode & 0o7777))?;
    set_owner(path, blob.uid, blob.gid, AtFlags::empty());
    set_times(path, blob.atime, blob.mtime, AtFlags::empty())?;
    trace!("restored {path}");
    Ok(())
}

fn restore_symlink(blob: &Blob, path: &Utf8Path) -> Result<()> {
    let target = blob
        .link_target()?
        .ok_or_else(|| Error::CorruptTree(format!("symlink entry {path} has no target")))?;
    std::os::unix::fs::symlink(&target, path)?;

    // Link modes are fixed; owners and times still apply, without
    // following the link.
    set_owner(path, blob.uid, blob.gid, AtFlags::SYMLINK_NOFOLLOW);
    set_times(path, blob.atime, blob.mtime, AtFlags::SYMLINK_NOFOLLOW)?;
    trace!("restored {path} -> {target}");
    Ok(())
}

fn set_owner(path: &Utf8Path, uid: u32, gid: u32, flags: AtFlags) {
    let res = rustix::fs::chownat(
        CWD,
        path.as_std_path(),
        Some(Uid::from_raw(uid)),
        Some(Gid::from_raw(gid)),
        flags,
    );
    if let Err(e) = res {
        warn!("couldn't set owner of {path} to {uid}:{gid}: {e}");
    }
}

fn set_times(path: &Utf8Path, atime: Timespec, mtime: Timespec, flags: AtFlags) -> Result<()> {
    let stamps = Timestamps {
        last_access: to_rustix(atime),
        last_modification: to_rustix(mtime),
    };
    rustix::fs::utimensat(CWD, path.as_std_path(), &stamps, flags)
        .map_err(|e| Error::Io(e.into()))?;
    Ok(())
}

fn to_rustix(t: Timespec) -> rustix::fs::Timespec {
    rustix::fs::Timespec {
        tv_sec: t.sec,
        tv_nsec: t.nsec,
    }
}
