//! File contents plus the POSIX metadata needed to put them back.

use std::borrow::Cow;
use std::fs;
use std::io::prelude::*;
use std::os::unix::fs::MetadataExt;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tracing::*;

use crate::error::{Error, Result};
use crate::wire;

/// A `(seconds, nanoseconds)` timestamp, as `struct timespec` keeps it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: i64,
}

/// The stored form of one file: its bytes (possibly deflated) and the
/// stat fields restore puts back.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Blob {
    /// Uncompressed length in bytes. `data.len()` is the stored length;
    /// the two differ exactly when the blob is a zlib stream.
    pub size: usize,
    pub data: Vec<u8>,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: Timespec,
    pub mtime: Timespec,
    pub ctime: Timespec,
}

impl Blob {
    /// Read `path` into a blob, deflating the contents if asked.
    pub fn from_file(path: &Utf8Path, compress: bool) -> Result<Self> {
        let meta = fs::symlink_metadata(path)?;
        let raw = fs::read(path)?;
        let size = raw.len();

        let data = if compress { deflate(&raw)? } else { raw };
        trace!("read {path}: {size} bytes, {} stored", data.len());

        Ok(Self::with_metadata(size, data, &meta))
    }

    /// Capture a symlink as a blob whose data is the link target.
    ///
    /// Targets are short; they are never compressed.
    pub fn from_symlink(path: &Utf8Path) -> Result<Self> {
        let meta = fs::symlink_metadata(path)?;
        let target = Utf8PathBuf::try_from(fs::read_link(path)?).map_err(|e| {
            Error::InvalidArgument(format!("link target of {path} isn't UTF-8: {e}"))
        })?;
        let data = target.into_string().into_bytes();
        trace!("read link {path}: {} byte target", data.len());

        Ok(Self::with_metadata(data.len(), data, &meta))
    }

    fn with_metadata(size: usize, data: Vec<u8>, meta: &fs::Metadata) -> Self {
        Self {
            size,
            data,
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            atime: Timespec {
                sec: meta.atime(),
                nsec: meta.atime_nsec(),
            },
            mtime: Timespec {
                sec: meta.mtime(),
                nsec: meta.mtime_nsec(),
            },
            ctime: Timespec {
                sec: meta.ctime(),
                nsec: meta.ctime_nsec(),
            },
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.data.len() != self.size
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & 0o170000 == 0o120000
    }

    /// The original file contents, inflated if the stored bytes are a
    /// zlib stream.
    pub fn contents(&self) -> Result<Cow<'_, [u8]>> {
        if !self.is_compressed() {
            return Ok(Cow::Borrowed(&self.data));
        }

        // `size` comes off the wire; let the buffer grow with the bytes
        // actually produced, and stop one past `size` so an over-long
        // stream fails the length check below.
        let mut inflated = Vec::new();
        ZlibDecoder::new(self.data.as_slice())
            .take(self.size as u64 + 1)
            .read_to_end(&mut inflated)
            .map_err(|e| Error::Decompression(e.to_string()))?;
        if inflated.len() != self.size {
            return Err(Error::Decompression(format!(
                "inflated to {} bytes, expected {}",
                inflated.len(),
                self.size
            )));
        }
        Ok(Cow::Owned(inflated))
    }

    /// For symlink blobs, the recorded link target.
    pub fn link_target(&self) -> Result<Option<Utf8PathBuf>> {
        if !self.is_symlink() {
            return Ok(None);
        }
        let bytes = self.contents()?;
        let target = std::str::from_utf8(&bytes)
            .map_err(|_| Error::CorruptTree("symlink target isn't UTF-8".to_owned()))?;
        Ok(Some(Utf8PathBuf::from(target)))
    }

    pub(crate) fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_usize(w, self.size)?;
        wire::write_usize(w, self.data.len())?;
        w.write_all(&self.data)?;
        wire::write_u32(w, self.mode)?;
        wire::write_u32(w, self.uid)?;
        wire::write_u32(w, self.gid)?;
        for t in [self.atime, self.mtime, self.ctime] {
            wire::write_i64(w, t.sec)?;
            wire::write_i64(w, t.nsec)?;
        }
        Ok(())
    }

    pub(crate) fn read_payload<R: Read>(r: &mut R) -> Result<Self> {
        let size = wire::read_usize(r)?;
        let stored = wire::read_usize(r)?;
        // `stored` comes off the wire; a corrupt value should fail the
        // parse, not size an allocation.
        let mut data = Vec::new();
        r.by_ref().take(stored as u64).read_to_end(&mut data)?;
        if data.len() != stored {
            return Err(Error::CorruptTree(format!(
                "blob data truncated: wanted {stored} bytes, got {}",
                data.len()
            )));
        }
        let mode = wire::read_u32(r)?;
        let uid = wire::read_u32(r)?;
        let gid = wire::read_u32(r)?;

        let mut times = [Timespec { sec: 0, nsec: 0 }; 3];
        for t in &mut times {
            t.sec = wire::read_i64(r)?;
            t.nsec = wire::read_i64(r)?;
        }

        Ok(Self {
            size,
            data,
            mode,
            uid,
            gid,
            atime: times[0],
            mtime: times[1],
            ctime: times[2],
        })
    }
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).map_err(Error::Compression)?;
    encoder.finish().map_err(Error::Compression)
}
