//! The in-memory shape of a directory: ordered, named entries that own
//! either a blob or a sub-tree.
//!
//! Entry order is whatever order the directory reader produced. It is
//! observable - it defines the serialized bytes and therefore the hash -
//! so nothing here may ever sort it.

use std::io;
use std::io::prelude::*;

use camino::Utf8Path;
use tracing::*;

use crate::blob::Blob;
use crate::config::SymlinkPolicy;
use crate::error::{Error, Result};
use crate::hashing::{HashingWriter, ID_LEN, ObjectId};
use crate::wire;

/// Mode recorded for every tree entry, `S_IFDIR | 0755`.
pub const TREE_ENTRY_MODE: u32 = 0o040755;

/// What a tree entry is on the wire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EntryKind {
    Blob,
    Tree,
}

impl EntryKind {
    fn tag(self) -> &'static [u8; wire::TAG_LEN] {
        match self {
            EntryKind::Blob => &wire::BLOB_TAG,
            EntryKind::Tree => &wire::TREE_TAG,
        }
    }

    fn from_tag(tag: [u8; wire::TAG_LEN]) -> Result<Self> {
        if tag == wire::BLOB_TAG {
            Ok(EntryKind::Blob)
        } else if tag == wire::TREE_TAG {
            Ok(EntryKind::Tree)
        } else {
            Err(Error::CorruptTree(format!(
                "unknown entry kind {:?}",
                String::from_utf8_lossy(&tag)
            )))
        }
    }
}

/// The fixed-size header every entry carries on the wire.
///
/// The hash field identifies blob contents; for tree entries the format
/// zero-fills it and the sub-tree's own root hash is authoritative.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EntryMeta {
    pub name: String,
    pub mode: u32,
    pub kind: EntryKind,
    pub hash: ObjectId,
}

impl EntryMeta {
    pub fn new(name: &str, mode: u32, kind: EntryKind, hash: ObjectId) -> Result<Self> {
        if name.len() > wire::NAME_LEN - 1 {
            return Err(Error::InvalidArgument(format!(
                "entry name {name:?} is longer than {} bytes",
                wire::NAME_LEN - 1
            )));
        }
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(Error::InvalidArgument(format!(
                "invalid entry name {name:?}"
            )));
        }
        Ok(Self {
            name: name.to_owned(),
            mode,
            kind,
            hash,
        })
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_padded(w, &format!("{:06o}", self.mode), wire::TAG_LEN)?;
        w.write_all(self.kind.tag())?;
        wire::write_padded(w, &self.name, wire::NAME_LEN)?;
        w.write_all(self.hash.as_bytes())?;
        Ok(())
    }

    pub(crate) fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mode_field = wire::read_padded(r, wire::TAG_LEN)?;
        let mode = u32::from_str_radix(&mode_field, 8)
            .map_err(|_| Error::CorruptTree(format!("bad mode field {mode_field:?}")))?;
        let kind = EntryKind::from_tag(wire::read_tag(r)?)?;
        let name = wire::read_padded(r, wire::NAME_LEN)?;
        let mut hash = [0u8; ID_LEN];
        r.read_exact(&mut hash)?;
        Self::new(&name, mode, kind, ObjectId::from_bytes(hash))
    }
}

/// Exactly one of: an owned blob, or an owned sub-tree.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EntryPayload {
    Blob(Blob),
    Subtree(Tree),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    pub meta: EntryMeta,
    pub payload: EntryPayload,
}

impl Entry {
    pub fn for_blob(name: &str, blob: Blob) -> Result<Self> {
        let hash = ObjectId::hash(&blob.data);
        let meta = EntryMeta::new(name, blob.mode, EntryKind::Blob, hash)?;
        Ok(Self {
            meta,
            payload: EntryPayload::Blob(blob),
        })
    }

    pub fn for_subtree(name: &str, subtree: Tree) -> Result<Self> {
        let meta = EntryMeta::new(name, TREE_ENTRY_MODE, EntryKind::Tree, ObjectId::ZERO)?;
        Ok(Self {
            meta,
            payload: EntryPayload::Subtree(subtree),
        })
    }

    /// The hash that identifies this entry's current contents:
    /// the header hash for blobs, the sub-tree's root hash for trees.
    pub fn content_hash(&self) -> &ObjectId {
        match &self.payload {
            EntryPayload::Blob(_) => &self.meta.hash,
            EntryPayload::Subtree(t) => &t.hash,
        }
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        self.meta.write_to(w)?;
        match &self.payload {
            EntryPayload::Blob(b) => b.write_payload(w),
            EntryPayload::Subtree(t) => t.write_to(w),
        }
    }

    pub(crate) fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let meta = EntryMeta::read_from(r)?;
        let payload = match meta.kind {
            EntryKind::Blob => EntryPayload::Blob(Blob::read_payload(r)?),
            EntryKind::Tree => EntryPayload::Subtree(Tree::read_from(r)?),
        };
        Ok(Self { meta, payload })
    }
}

/// How the filesystem is scanned into a tree.
#[derive(Debug, Copy, Clone)]
pub struct ScanOptions {
    pub compress: bool,
    pub symlinks: SymlinkPolicy,
}

/// One directory level: entries in read order, hashed over the canonical
/// serialization.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Tree {
    pub entries: Vec<Entry>,
    pub hash: ObjectId,
}

impl Tree {
    /// Assemble a tree from already-built entries and hash it.
    pub fn from_entries(entries: Vec<Entry>) -> Result<Self> {
        let mut tree = Tree {
            entries,
            hash: ObjectId::ZERO,
        };
        tree.hash = tree.compute_hash()?;
        Ok(tree)
    }

    /// Walk `dir` into a tree, capturing file contents and metadata.
    ///
    /// Sub-directories recurse; regular files become blob entries.
    /// Symlinks follow `opts.symlinks`; every other file type is skipped.
    pub fn from_dir(dir: &Utf8Path, opts: ScanOptions) -> Result<Self> {
        let mut entries = Vec::new();
        for dirent in dir.read_dir_utf8()? {
            let dirent = dirent.map_err(|e| {
                if e.kind() == io::ErrorKind::InvalidData {
                    Error::InvalidArgument(format!("non-UTF-8 file name in {dir}"))
                } else {
                    Error::Io(e)
                }
            })?;
            let name = dirent.file_name();
            let path = dirent.path();
            let ftype = dirent.file_type()?;

            if ftype.is_dir() {
                let subtree = Tree::from_dir(path, opts)?;
                entries.push(Entry::for_subtree(name, subtree)?);
            } else if ftype.is_file() {
                let blob = Blob::from_file(path, opts.compress)?;
                entries.push(Entry::for_blob(name, blob)?);
            } else if ftype.is_symlink() && opts.symlinks == SymlinkPolicy::Preserve {
                let blob = Blob::from_symlink(path)?;
                entries.push(Entry::for_blob(name, blob)?);
            } else {
                debug!("skipping special file {path}");
            }
        }
        Self::from_entries(entries)
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&wire::TREE_TAG)?;
        wire::write_usize(w, self.entries.len())?;
        for entry in &self.entries {
            entry.write_to(w)?;
        }
        Ok(())
    }

    /// The canonical serialization: what gets hashed and what `read_from`
    /// parses.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Parse a serialized tree, recomputing every level's hash.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let tag = wire::read_tag(r)?;
        if tag != wire::TREE_TAG {
            return Err(Error::CorruptTree(format!(
                "expected a tree tag, found {:?}",
                String::from_utf8_lossy(&tag)
            )));
        }
        let count = wire::read_usize(r)?;
        let mut entries = Vec::new();
        for _ in 0..count {
            entries.push(Entry::read_from(r)?);
        }
        Self::from_entries(entries)
    }

    fn compute_hash(&self) -> Result<ObjectId> {
        let mut hasher = HashingWriter::new(io::sink());
        self.write_to(&mut hasher)?;
        Ok(hasher.finalize().0)
    }

    /// Recompute hashes bottom-up after structural edits.
    pub(crate) fn rehash(&mut self) -> Result<()> {
        for entry in &mut self.entries {
            if let EntryPayload::Subtree(sub) = &mut entry.payload {
                sub.rehash()?;
            }
        }
        self.hash = self.compute_hash()?;
        Ok(())
    }
}
