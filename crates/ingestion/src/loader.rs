//! Record table loader.
//!
//! Reads every `*.geojson` file below a folder, then every `*.json` file,
//! and concatenates them into a single [`RecordTable`].

use std::path::{Path, PathBuf};

use stac_protocol::GeoJson;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::error::{IngestionError, IntegrityKind, Result};
use crate::records::RecordTable;

/// Extensions of the files that are read, in reading order.
pub const INPUT_EXTENSIONS: [&str; 2] = ["geojson", "json"];

/// Recursively list the files under `folder` with the given extension,
/// sorted by path.
pub fn find_files(folder: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(folder).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            IngestionError::io(path, source)
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// All eligible input files: `*.geojson` first, then `*.json`.
pub fn input_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for extension in INPUT_EXTENSIONS {
        files.extend(find_files(folder, extension)?);
    }
    Ok(files)
}

/// Parse one GeoJSON file into a table.
pub fn read_file(path: &Path) -> Result<RecordTable> {
    let bytes = std::fs::read(path)
        .map_err(|e| IngestionError::integrity(path, IntegrityKind::IoError, e.to_string()))?;
    let document: GeoJson = serde_json::from_slice(&bytes)
        .map_err(|e| IngestionError::integrity(path, IntegrityKind::JsonError, e.to_string()))?;
    RecordTable::from_feature_collection(document.into_feature_collection(), path)
}

/// Read and concatenate every eligible file under `folder`.
///
/// The whole load fails on the first bad file; no partial table is
/// returned.
pub fn load_records(folder: &Path) -> Result<RecordTable> {
    let result = input_files(folder).and_then(|files| load_files(&files));
    match result {
        Ok(table) => {
            info!(
                folder = %folder.display(),
                records = table.len(),
                columns = table.columns().len(),
                "Loaded record table"
            );
            Ok(table)
        }
        Err(e) => {
            error!(
                folder = %folder.display(),
                error = %e,
                "Couldn't load the data in the input folder"
            );
            Err(e)
        }
    }
}

/// Concatenate the given files in order.
pub fn load_files(files: &[PathBuf]) -> Result<RecordTable> {
    let mut table = RecordTable::new();
    for path in files {
        let part = read_file(path)?;
        debug!(file = %path.display(), records = part.len(), "Read input file");
        table.concat(part, path)?;
    }
    Ok(table)
}
