//! Error kinds the core surfaces; the CLI wraps these with anyhow context.

use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("zlib deflate failed")]
    Compression(#[source] std::io::Error),

    #[error("zlib inflate failed: {0}")]
    Decompression(String),

    #[error("corrupt tree: {0}")]
    CorruptTree(String),

    #[error("corrupt revision file {path}: {reason}")]
    CorruptRevision { path: Utf8PathBuf, reason: String },

    #[error("no base revision (revision_0) in {0}")]
    MissingBase(Utf8PathBuf),

    #[error("delta does not match tree: no entry named {0:?}")]
    DeltaMismatch(String),

    #[error("{0}")]
    InvalidArgument(String),
}
