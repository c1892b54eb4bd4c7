//! Version-numbered snapshots: a base tree, or a delta chained onto it.
//!
//! A store directory holds `revision_0`, `revision_1`, ... in contiguous
//! order. `revision_0` is always the full base tree; every later file
//! holds the changes since the revision before it, anchored to the base
//! by version number and hash. Restoring version N replays deltas 1..=N
//! over a copy of the base.

use std::fs;
use std::io::prelude::*;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::*;

use crate::delta::{self, TreeDelta};
use crate::error::{Error, Result};
use crate::hashing::{HashingWriter, ID_LEN, ObjectId};
use crate::restore::restore_tree;
use crate::tree::{ScanOptions, Tree};
use crate::wire;

/// The `base_version` value marking a base revision.
pub const NO_BASE: i32 = -1;

/// A base revision owns a full tree; a delta revision owns the changes
/// against the base it references.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Contents {
    Base(Tree),
    Delta(TreeDelta),
}

/// Immutable once created; `save` and `load` move it to and from
/// `store/revision_<version>`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Revision {
    pub version: i32,
    /// [`NO_BASE`] for a base revision, else the version this chains to.
    pub base_version: i32,
    pub hash: ObjectId,
    pub contents: Contents,
}

/// `store/revision_<N>`
pub fn revision_path(store: &Utf8Path, version: i32) -> Utf8PathBuf {
    store.join(format!("revision_{version}"))
}

/// Smallest k >= 1 whose revision file doesn't exist yet.
///
/// Probing assumes a single writer; concurrent commits would race.
fn next_version(store: &Utf8Path) -> i32 {
    let mut k = 1;
    while revision_path(store, k).exists() {
        k += 1;
    }
    k
}

/// A delta revision's hash covers the base hash it chains from plus the
/// canonical delta bytes, so reordered or renamed files break the chain.
fn chain_hash(base_hash: &ObjectId, changes: &TreeDelta) -> Result<ObjectId> {
    let mut hasher = HashingWriter::new(std::io::sink());
    hasher.write_all(base_hash.as_bytes())?;
    changes.write_to(&mut hasher)?;
    Ok(hasher.finalize().0)
}

impl Revision {
    pub fn is_base(&self) -> bool {
        self.base_version == NO_BASE
    }

    /// Snapshot `dir` in full as version 0.
    pub fn base(dir: &Utf8Path, opts: ScanOptions) -> Result<Self> {
        let tree = Tree::from_dir(dir, opts)?;
        debug!("base revision: {} top-level entries", tree.entries.len());
        Ok(Self {
            version: 0,
            base_version: NO_BASE,
            hash: tree.hash,
            contents: Contents::Base(tree),
        })
    }

    /// Snapshot `dir` as the next delta in `base`'s chain.
    ///
    /// The delta is computed against the chain's current tip (the base
    /// with every existing delta replayed), so restore can apply deltas
    /// one after another; the hash still chains from the base.
    pub fn delta(
        store: &Utf8Path,
        base: &Revision,
        dir: &Utf8Path,
        opts: ScanOptions,
    ) -> Result<Self> {
        let Contents::Base(base_tree) = &base.contents else {
            return Err(Error::InvalidArgument(format!(
                "revision {} is not a base revision",
                base.version
            )));
        };

        let version = next_version(store);
        let previous = if version == 1 {
            base_tree.clone()
        } else {
            materialize(store, version - 1)?
        };

        let current = Tree::from_dir(dir, opts)?;
        let changes = delta::compute(&previous, &current)?;
        let hash = chain_hash(&base.hash, &changes)?;
        debug!(
            "revision {version}: {} changes against base {}",
            changes.change_count(),
            base.version
        );

        Ok(Self {
            version,
            base_version: base.version,
            hash,
            contents: Contents::Delta(changes),
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_i32(w, self.version)?;
        wire::write_i32(w, self.base_version)?;
        w.write_all(self.hash.as_bytes())?;
        match &self.contents {
            Contents::Base(tree) => tree.write_to(w),
            Contents::Delta(changes) => changes.write_to(w),
        }
    }

    /// Persist to `store/revision_<version>`.
    ///
    /// The write is not atomic; callers that need crash safety write to
    /// a temporary file and rename, as the CLI commit path does.
    pub fn save(&self, store: &Utf8Path) -> Result<Utf8PathBuf> {
        let path = revision_path(store, self.version);
        let mut fh = fs::File::create(&path)?;
        self.write_to(&mut fh)?;
        fh.sync_all()?;
        debug!("wrote revision {} to {path}", self.version);
        Ok(path)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let version = wire::read_i32(r)?;
        let base_version = wire::read_i32(r)?;
        if version < 0 || (base_version != NO_BASE && !(0..version).contains(&base_version)) {
            return Err(Error::InvalidArgument(format!(
                "version {version} chained to base {base_version}"
            )));
        }

        let mut hash = [0u8; ID_LEN];
        r.read_exact(&mut hash)?;
        let hash = ObjectId::from_bytes(hash);

        let contents = if base_version == NO_BASE {
            Contents::Base(Tree::read_from(r)?)
        } else {
            Contents::Delta(TreeDelta::read_from(r)?)
        };

        Ok(Self {
            version,
            base_version,
            hash,
            contents,
        })
    }

    /// Load a revision file. A truncated or malformed file, whatever the
    /// underlying parse failure, reports the file as corrupt.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        trace!("loading {path}");
        let mut fh = fs::File::open(path)?;
        Self::read_from(&mut fh).map_err(|e| match e {
            already @ Error::CorruptRevision { .. } => already,
            other => Error::CorruptRevision {
                path: path.to_owned(),
                reason: other.to_string(),
            },
        })
    }
}

/// Load `store/revision_<version>`, checking that the file really holds
/// the version its name claims. Renamed or shuffled revision files fail
/// here instead of replaying in the wrong order.
fn load_numbered(store: &Utf8Path, version: i32) -> Result<Revision> {
    let path = revision_path(store, version);
    let rev = Revision::load(&path)?;
    if rev.version != version {
        return Err(Error::CorruptRevision {
            path,
            reason: format!(
                "file is numbered {version} but records version {}",
                rev.version
            ),
        });
    }
    Ok(rev)
}

/// Load `revision_0..` until the first gap.
pub fn list(store: &Utf8Path) -> Result<Vec<Revision>> {
    let mut revisions = Vec::new();
    loop {
        let version = revisions.len() as i32;
        if !revision_path(store, version).exists() {
            break;
        }
        revisions.push(load_numbered(store, version)?);
    }
    Ok(revisions)
}

/// Rebuild the tree of revision `version` in memory: the base tree with
/// deltas 1..=version replayed over a copy of it.
///
/// Every revision on the way is checked against its recorded hash, so a
/// tampered or misnumbered file fails here rather than producing a
/// silently wrong tree.
pub fn materialize(store: &Utf8Path, version: i32) -> Result<Tree> {
    if version < 0 {
        return Err(Error::InvalidArgument(format!(
            "bad revision number {version}"
        )));
    }

    let target = load_numbered(store, version)?;

    if let Contents::Base(tree) = target.contents {
        if target.hash != tree.hash {
            return Err(Error::CorruptRevision {
                path: revision_path(store, version),
                reason: format!("tree hashes to {}, header says {}", tree.hash, target.hash),
            });
        }
        return Ok(tree);
    }

    let base_path = revision_path(store, 0);
    if !base_path.exists() {
        return Err(Error::MissingBase(store.to_owned()));
    }
    let base = load_numbered(store, 0)?;
    let Contents::Base(base_tree) = &base.contents else {
        return Err(Error::CorruptRevision {
            path: base_path,
            reason: "revision 0 is not a base revision".to_owned(),
        });
    };
    if base.hash != base_tree.hash {
        return Err(Error::CorruptRevision {
            path: base_path,
            reason: format!("tree hashes to {}, header says {}", base_tree.hash, base.hash),
        });
    }

    let mut working = base_tree.clone();
    for v in 1..=version {
        let path = revision_path(store, v);
        let rev = load_numbered(store, v)?;
        let corrupt = |reason: String| Error::CorruptRevision {
            path: path.clone(),
            reason,
        };

        if rev.base_version != base.version {
            return Err(corrupt(format!(
                "chained to revision {}, expected {}",
                rev.base_version, base.version
            )));
        }
        let Contents::Delta(changes) = &rev.contents else {
            return Err(corrupt("expected a delta payload".to_owned()));
        };
        let expected = chain_hash(&base.hash, changes)?;
        if rev.hash != expected {
            return Err(corrupt(format!(
                "hash chain mismatch: file says {}, contents hash to {expected}",
                rev.hash
            )));
        }

        delta::apply(changes, &mut working)?;
        trace!("applied revision {v}");
    }

    Ok(working)
}

/// Rebuild revision `version` from `store` into `output`.
///
/// Partial output from a failed restore is left in place for inspection;
/// there is no rollback.
pub fn restore(store: &Utf8Path, version: i32, output: &Utf8Path) -> Result<()> {
    let tree = materialize(store, version)?;
    restore_tree(&tree, output)
}
