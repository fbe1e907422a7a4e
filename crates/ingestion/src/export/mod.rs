//! Export of the unified record table to GIS formats.

mod geojson;
mod gpkg;
mod shp;
pub mod wkb;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::records::RecordTable;

pub use self::geojson::write_geojson;
pub use self::gpkg::{write_geopackage, GPKG_TABLE};
pub use self::shp::{shapefile_field_names, write_shapefile};

/// Errors raised while exporting a table.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export: the record table is empty")]
    EmptyTable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shapefile error: {0}")]
    Shapefile(String),

    #[error("GeoPackage error: {0}")]
    GeoPackage(#[from] sqlx::Error),

    #[error("A shapefile holds one geometry type: found {found} after {expected}")]
    MixedGeometry {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Record {0} has no geometry")]
    MissingGeometry(String),

    #[error("Invalid geometry for record {record}: {message}")]
    InvalidGeometry { record: String, message: String },

    #[error("Unknown export format '{0}'")]
    UnknownFormat(String),
}

/// Target format of a table export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Shapefile,
    GeoJson,
    GeoPackage,
    /// Anything else; written as a shapefile.
    Other,
}

impl ExportFormat {
    /// The format actually written.
    pub fn resolved(self) -> ExportFormat {
        match self {
            ExportFormat::Other => ExportFormat::Shapefile,
            other => other,
        }
    }

    pub fn extension(self) -> &'static str {
        match self.resolved() {
            ExportFormat::GeoJson => "geojson",
            ExportFormat::GeoPackage => "gpkg",
            _ => "shp",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Shapefile => "shp",
            ExportFormat::GeoJson => "geojson",
            ExportFormat::GeoPackage => "gpkg",
            ExportFormat::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shp" | "shapefile" | "esri shapefile" => Ok(ExportFormat::Shapefile),
            "geojson" => Ok(ExportFormat::GeoJson),
            "gpkg" | "geopackage" => Ok(ExportFormat::GeoPackage),
            "other" => Ok(ExportFormat::Other),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Read/write capability of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Write,
    ReadWrite,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Write => "w",
            Capability::ReadWrite => "rw",
        })
    }
}

/// Description of a supported format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub format: ExportFormat,
    pub driver: &'static str,
    pub extension: &'static str,
    pub capability: Capability,
}

/// Formats the table can be exported to. GeoJSON is also the input format.
pub fn list_formats() -> Vec<FormatInfo> {
    vec![
        FormatInfo {
            format: ExportFormat::Shapefile,
            driver: "ESRI Shapefile",
            extension: "shp",
            capability: Capability::Write,
        },
        FormatInfo {
            format: ExportFormat::GeoJson,
            driver: "GeoJSON",
            extension: "geojson",
            capability: Capability::ReadWrite,
        },
        FormatInfo {
            format: ExportFormat::GeoPackage,
            driver: "GPKG",
            extension: "gpkg",
            capability: Capability::Write,
        },
    ]
}

/// Storage type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Boolean,
    Text,
}

/// Narrowest kind holding every non-null value of `column`.
pub fn column_kind(table: &RecordTable, column: &str) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for record in table {
        let value_kind = match record.get(column) {
            None => continue,
            Some(Value::Bool(_)) => ColumnKind::Boolean,
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => ColumnKind::Integer,
            Some(Value::Number(_)) => ColumnKind::Real,
            Some(_) => ColumnKind::Text,
        };
        kind = Some(match (kind, value_kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Integer), ColumnKind::Real)
            | (Some(ColumnKind::Real), ColumnKind::Integer) => ColumnKind::Real,
            _ => ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Text)
}

/// Text rendering of a cell for text columns.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write `table` to `path` in `format`.
pub async fn export_table(
    table: &RecordTable,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    if table.is_empty() {
        return Err(ExportError::EmptyTable);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    match format.resolved() {
        ExportFormat::GeoJson => write_geojson(table, path)?,
        ExportFormat::GeoPackage => write_geopackage(table, path).await?,
        _ => write_shapefile(table, path)?,
    }

    info!(
        path = %path.display(),
        format = %format.resolved(),
        records = table.len(),
        "Exported record table"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stac_protocol::FeatureCollection;

    fn table() -> RecordTable {
        let fc: FeatureCollection = serde_json::from_value(test_utils::feature_collection(
            (0..3).map(|i| test_utils::nomad_feature(i, 134)).collect(),
        ))
        .unwrap();
        RecordTable::from_feature_collection(fc, Path::new("mem.geojson")).unwrap()
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("SHP".parse::<ExportFormat>().unwrap(), ExportFormat::Shapefile);
        assert_eq!("gpkg".parse::<ExportFormat>().unwrap(), ExportFormat::GeoPackage);
        assert_eq!("other".parse::<ExportFormat>().unwrap().resolved(), ExportFormat::Shapefile);
        assert!("kml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_list_formats() {
        let formats = list_formats();
        assert_eq!(formats.len(), 3);
        assert!(formats
            .iter()
            .any(|f| f.format == ExportFormat::GeoJson && f.capability == Capability::ReadWrite));
    }

    #[test]
    fn test_column_kinds() {
        let table = table();
        assert_eq!(column_kind(&table, "diffraction_order"), ColumnKind::Integer);
        assert_eq!(column_kind(&table, "incidence_angle"), ColumnKind::Real);
        assert_eq!(column_kind(&table, "psa_lid"), ColumnKind::Text);
        assert_eq!(column_kind(&table, "utc_start_time"), ColumnKind::Text);
        assert_eq!(column_kind(&table, "no_such_column"), ColumnKind::Text);
    }
}
