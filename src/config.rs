//! Per-store settings, written once by `init` and pinned thereafter.
//!
//! Compression must not change between committing and restoring the same
//! store, so the flag lives next to the revisions it describes instead
//! of in a user-level config file.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tree::ScanOptions;

/// What to do with symbolic links during a scan.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkPolicy {
    /// Leave them out of the snapshot entirely.
    #[default]
    Skip,
    /// Record their targets and re-create them on restore.
    Preserve,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub compress_files: bool,
    pub symlinks: SymlinkPolicy,
}

impl Configuration {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            compress: self.compress_files,
            symlinks: self.symlinks,
        }
    }
}

pub fn config_path(store: &Utf8Path) -> Utf8PathBuf {
    store.join("config.toml")
}

/// Loads the store's configuration, defaulting when the file is absent.
pub fn load(store: &Utf8Path) -> Result<Configuration> {
    let path = config_path(store);
    let s = match fs::read_to_string(&path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Configuration::default()),
        found => found,
    }?;
    toml::from_str(&s).map_err(|e| Error::InvalidArgument(format!("couldn't parse {path}: {e}")))
}

pub fn save(store: &Utf8Path, config: &Configuration) -> Result<()> {
    let s = toml::to_string_pretty(config)
        .map_err(|e| Error::InvalidArgument(format!("couldn't format configuration: {e}")))?;
    fs::write(config_path(store), s)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Utf8Path::from_path(dir.path()).unwrap();

        let config = Configuration {
            compress_files: true,
            symlinks: SymlinkPolicy::Preserve,
        };
        save(store, &config)?;
        assert_eq!(load(store)?, config);
        Ok(())
    }

    #[test]
    fn missing_file_means_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Utf8Path::from_path(dir.path()).unwrap();
        assert_eq!(load(store)?, Configuration::default());
        Ok(())
    }
}
