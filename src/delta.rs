//! Structural differences between two trees, and their application.
//!
//! A delta describes one directory level with three lists: entries only
//! in the new tree, entries only in the old one, and entries present in
//! both with different contents. Modified sub-tree pairs nest another
//! delta instead of carrying full copies.

use std::collections::HashMap;
use std::io::prelude::*;

use crate::blob::Blob;
use crate::error::{Error, Result};
use crate::tree::{Entry, EntryMeta, EntryPayload, Tree};
use crate::wire;

/// Replacement contents for an entry present on both sides.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Change {
    /// The new blob, wholesale.
    Blob(Blob),
    /// A nested delta for a sub-tree pair.
    Subtree(TreeDelta),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ModifiedEntry {
    pub old: EntryMeta,
    pub new: EntryMeta,
    pub change: Change,
}

/// The difference between two trees at one level.
///
/// `added` and `modified` follow the new tree's entry order, `deleted`
/// the old tree's.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TreeDelta {
    pub added: Vec<Entry>,
    pub deleted: Vec<EntryMeta>,
    pub modified: Vec<ModifiedEntry>,
}

impl TreeDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    /// Count of individual changes at every level, for reporting.
    pub fn change_count(&self) -> usize {
        self.added.len()
            + self.deleted.len()
            + self
                .modified
                .iter()
                .map(|m| match &m.change {
                    Change::Blob(_) => 1,
                    Change::Subtree(d) => d.change_count(),
                })
                .sum::<usize>()
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_usize(w, self.added.len())?;
        for entry in &self.added {
            entry.write_to(w)?;
        }

        wire::write_usize(w, self.deleted.len())?;
        for meta in &self.deleted {
            meta.write_to(w)?;
        }

        wire::write_usize(w, self.modified.len())?;
        for m in &self.modified {
            m.old.write_to(w)?;
            m.new.write_to(w)?;
            match &m.change {
                Change::Blob(b) => {
                    w.write_all(&[0])?;
                    b.write_payload(w)?;
                }
                Change::Subtree(d) => {
                    w.write_all(&[1])?;
                    d.write_to(w)?;
                }
            }
        }
        Ok(())
    }

    /// The canonical serialization, as hashed into a delta revision.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut added = Vec::new();
        for _ in 0..wire::read_usize(r)? {
            added.push(Entry::read_from(r)?);
        }

        let mut deleted = Vec::new();
        for _ in 0..wire::read_usize(r)? {
            deleted.push(EntryMeta::read_from(r)?);
        }

        let mut modified = Vec::new();
        for _ in 0..wire::read_usize(r)? {
            let old = EntryMeta::read_from(r)?;
            let new = EntryMeta::read_from(r)?;
            let mut flag = [0u8; 1];
            r.read_exact(&mut flag)?;
            let change = match flag[0] {
                0 => Change::Blob(Blob::read_payload(r)?),
                1 => Change::Subtree(TreeDelta::read_from(r)?),
                other => {
                    return Err(Error::CorruptTree(format!(
                        "bad modified-entry flag {other}"
                    )));
                }
            };
            modified.push(ModifiedEntry { old, new, change });
        }

        Ok(Self {
            added,
            deleted,
            modified,
        })
    }
}

fn index_by_name(tree: &Tree) -> Result<HashMap<&str, &Entry>> {
    let mut index = HashMap::with_capacity(tree.entries.len());
    for entry in &tree.entries {
        if index.insert(entry.meta.name.as_str(), entry).is_some() {
            return Err(Error::CorruptTree(format!(
                "duplicate entry name {:?}",
                entry.meta.name
            )));
        }
    }
    Ok(index)
}

/// Compute the delta that turns `old` into `new`.
///
/// An entry whose kind flipped (file became directory, or vice versa)
/// decomposes into a deletion plus an addition.
pub fn compute(old: &Tree, new: &Tree) -> Result<TreeDelta> {
    let old_index = index_by_name(old)?;
    let new_index = index_by_name(new)?;

    let mut delta = TreeDelta::default();

    for entry in &old.entries {
        match new_index.get(entry.meta.name.as_str()) {
            Some(counterpart) if counterpart.meta.kind == entry.meta.kind => {}
            _ => delta.deleted.push(entry.meta.clone()),
        }
    }

    for entry in &new.entries {
        match old_index.get(entry.meta.name.as_str()) {
            None => delta.added.push(entry.clone()),
            Some(old_entry) if old_entry.meta.kind != entry.meta.kind => {
                delta.added.push(entry.clone());
            }
            Some(old_entry) => {
                if old_entry.content_hash() == entry.content_hash() {
                    continue;
                }
                let change = match (&old_entry.payload, &entry.payload) {
                    (EntryPayload::Subtree(old_sub), EntryPayload::Subtree(new_sub)) => {
                        Change::Subtree(compute(old_sub, new_sub)?)
                    }
                    (EntryPayload::Blob(_), EntryPayload::Blob(new_blob)) => {
                        Change::Blob(new_blob.clone())
                    }
                    // Kind mismatches became delete + add above.
                    _ => unreachable!("entry kind disagrees with payload"),
                };
                delta.modified.push(ModifiedEntry {
                    old: old_entry.meta.clone(),
                    new: entry.meta.clone(),
                    change,
                });
            }
        }
    }

    Ok(delta)
}

/// Apply `delta` to `tree` in place, then recompute its hashes.
pub fn apply(delta: &TreeDelta, tree: &mut Tree) -> Result<()> {
    apply_level(delta, tree)?;
    tree.rehash()
}

fn apply_level(delta: &TreeDelta, tree: &mut Tree) -> Result<()> {
    for doomed in &delta.deleted {
        let at = position_of(tree, &doomed.name)?;
        tree.entries.remove(at);
    }

    for modified in &delta.modified {
        let at = position_of(tree, &modified.new.name)?;
        let entry = &mut tree.entries[at];
        match &modified.change {
            Change::Subtree(sub_delta) => {
                let EntryPayload::Subtree(sub) = &mut entry.payload else {
                    return Err(Error::DeltaMismatch(modified.new.name.clone()));
                };
                apply_level(sub_delta, sub)?;
            }
            Change::Blob(blob) => {
                entry.meta = modified.new.clone();
                entry.payload = EntryPayload::Blob(blob.clone());
            }
        }
    }

    for entry in &delta.added {
        tree.entries.push(entry.clone());
    }

    Ok(())
}

fn position_of(tree: &Tree, name: &str) -> Result<usize> {
    tree.entries
        .iter()
        .position(|e| e.meta.name == name)
        .ok_or_else(|| Error::DeltaMismatch(name.to_owned()))
}
