//! Error types for the ingestion crate.

use std::fmt;
use std::path::PathBuf;

use stac_protocol::{ExtensionError, StacError};
use thiserror::Error;

use crate::export::ExportError;

/// Failure class of a [`IngestionError::DataIntegrity`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityKind {
    IoError,
    JsonError,
    TimeParseError,
    MissingColumn,
    TimeOrder,
    ConcatError,
    DuplicateId,
}

impl IntegrityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityKind::IoError => "IoError",
            IntegrityKind::JsonError => "JsonError",
            IntegrityKind::TimeParseError => "TimeParseError",
            IntegrityKind::MissingColumn => "MissingColumn",
            IntegrityKind::TimeOrder => "TimeOrder",
            IntegrityKind::ConcatError => "ConcatError",
            IntegrityKind::DuplicateId => "DuplicateId",
        }
    }
}

impl fmt::Display for IntegrityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while loading records or building a catalog.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("No eligible input files (*.geojson, *.json) in {0}")]
    EmptyInput(PathBuf),

    #[error("Output folder {0} is not empty; clear it or allow cleaning")]
    OutputNotEmpty(PathBuf),

    #[error("Couldn't load {file} into the record table. Reason: {kind}: {message}")]
    DataIntegrity {
        file: PathBuf,
        kind: IntegrityKind,
        message: String,
    },

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Stac(#[from] StacError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestionError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn integrity(
        file: impl Into<PathBuf>,
        kind: IntegrityKind,
        message: impl Into<String>,
    ) -> Self {
        IngestionError::DataIntegrity {
            file: file.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

/// Stages of a catalog build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Empty,
    Loading,
    Grouping,
    BuildingCollections,
    Linking,
    Normalizing,
    Persisted,
    Aborted,
}

impl BuildStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStage::Empty => "EMPTY",
            BuildStage::Loading => "LOADING",
            BuildStage::Grouping => "GROUPING",
            BuildStage::BuildingCollections => "BUILDING_COLLECTIONS",
            BuildStage::Linking => "LINKING",
            BuildStage::Normalizing => "NORMALIZING",
            BuildStage::Persisted => "PERSISTED",
            BuildStage::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed catalog build: the stage it failed in, the record being
/// processed (if any) and the underlying error.
#[derive(Error, Debug)]
#[error("Catalog build failed during {stage}{}: {source}", record_suffix(.record_id))]
pub struct BuildError {
    pub stage: BuildStage,
    pub record_id: Option<String>,
    #[source]
    pub source: IngestionError,
}

impl BuildError {
    pub fn new(stage: BuildStage, source: IngestionError) -> Self {
        Self {
            stage,
            record_id: None,
            source,
        }
    }

    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }
}

fn record_suffix(record_id: &Option<String>) -> String {
    match record_id {
        Some(id) => format!(" (record {})", id),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_integrity_message_names_kind() {
        let err = IngestionError::integrity(
            "/data/raw/a.geojson",
            IntegrityKind::JsonError,
            "expected value at line 1 column 1",
        );
        assert_eq!(
            err.to_string(),
            "Couldn't load /data/raw/a.geojson into the record table. \
             Reason: JsonError: expected value at line 1 column 1"
        );
    }

    #[test]
    fn test_build_error_display() {
        let err = BuildError::new(
            BuildStage::BuildingCollections,
            IngestionError::MissingField("hdf5_filename".to_string()),
        )
        .with_record("scene-1");
        assert_eq!(
            err.to_string(),
            "Catalog build failed during BUILDING_COLLECTIONS (record scene-1): \
             Missing required field 'hdf5_filename'"
        );

        let err = BuildError::new(
            BuildStage::Empty,
            IngestionError::EmptyInput(PathBuf::from("in")),
        );
        assert!(err.to_string().starts_with("Catalog build failed during EMPTY: "));
    }
}
