//! Data folder configuration.
//!
//! Every command works on three folders under one data directory:
//! `raw` (downloaded records), `processed` (STAC catalogs) and `analysis`
//! (exported tables). The data directory comes from `NOMAD_DATA_DIR` and
//! defaults to `./data`.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "NOMAD_DATA_DIR";

/// Default folders of one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFolders {
    pub raw: PathBuf,
    pub processed: PathBuf,
    pub analysis: PathBuf,
}

impl DataFolders {
    /// Folders under `data_dir`.
    pub fn under(data_dir: &Path) -> Self {
        Self {
            raw: data_dir.join("raw"),
            processed: data_dir.join("processed"),
            analysis: data_dir.join("analysis"),
        }
    }

    /// Folders under `$NOMAD_DATA_DIR`, or `./data` when unset.
    pub fn from_env() -> Result<Self> {
        let data_dir = match env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => env::current_dir()
                .context("Failed to read the current directory")?
                .join("data"),
        };
        Ok(Self::under(&data_dir))
    }
}

/// The folder given on the command line, or `default`.
///
/// A custom folder is logged as a warning since anything inside the
/// working tree may end up under version control.
pub fn resolve_folder(explicit: Option<PathBuf>, default: &Path) -> PathBuf {
    match explicit {
        Some(folder) if folder != default => {
            warn!(
                folder = %folder.display(),
                "Using a non-default data folder; make sure you don't commit it to version control"
            );
            folder
        }
        Some(folder) => folder,
        None => default.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folders_under_data_dir() {
        let folders = DataFolders::under(Path::new("/srv/nomad"));
        assert_eq!(folders.raw, Path::new("/srv/nomad/raw"));
        assert_eq!(folders.processed, Path::new("/srv/nomad/processed"));
        assert_eq!(folders.analysis, Path::new("/srv/nomad/analysis"));
    }

    #[test]
    fn test_resolve_folder() {
        let default = Path::new("/data/raw");
        assert_eq!(resolve_folder(None, default), default);
        assert_eq!(
            resolve_folder(Some(PathBuf::from("/tmp/raw")), default),
            Path::new("/tmp/raw")
        );
        assert_eq!(resolve_folder(Some(default.to_path_buf()), default), default);
    }
}
