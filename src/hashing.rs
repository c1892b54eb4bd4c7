//! Tools for hashing everything we care about into a unique [`ObjectId`]

use std::fmt;
use std::io;
use std::io::prelude::*;

use data_encoding::HEXLOWER;
use sha1::{Digest, Sha1};

/// SHA-1 digests are 20 bytes; every persisted hash field is this wide.
pub const ID_LEN: usize = 20;

/// The hash (a SHA-1) used to identify trees, deltas, and revisions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId {
    digest: [u8; ID_LEN],
}

impl ObjectId {
    /// The zero-filled ID used where the format leaves the field blank.
    pub const ZERO: ObjectId = ObjectId {
        digest: [0; ID_LEN],
    };

    /// Calculates an ID from the given bytes
    pub fn hash(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        Self::from(hasher)
    }

    pub fn from_bytes(digest: [u8; ID_LEN]) -> Self {
        Self { digest }
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.digest
    }

    /// Gets a git-like shortened version of the hash that's unique enough
    /// for most UI uses.
    pub fn short_name(&self) -> String {
        let mut full = format!("{self}");
        let _rest = full.split_off(8);
        full
    }
}

impl From<Sha1> for ObjectId {
    fn from(hasher: Sha1) -> Self {
        Self {
            digest: hasher.finalize().into(),
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ digest: {} }}", HEXLOWER.encode(&self.digest))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.digest))
    }
}

/// Hashes everything written through it on the way to `W`.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha1,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha1::new(),
        }
    }

    pub fn finalize(self) -> (ObjectId, W) {
        (ObjectId::from(self.hasher), self.inner)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let count = self.inner.write(buf)?;
        self.hasher.update(&buf[..count]);
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
