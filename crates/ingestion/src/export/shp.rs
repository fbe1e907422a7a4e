//! ESRI shapefile export (`.shp`, `.shx`, `.dbf`).

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::record::EsriShape;
use shapefile::{Multipoint, Point, Polygon, PolygonRing, Polyline};
use stac_protocol::Geometry;
use tracing::debug;

use super::{cell_text, column_kind, ColumnKind, ExportError};
use crate::records::{ObservationRecord, RecordTable};

/// dBase limits.
const MAX_FIELD_NAME: usize = 10;
const MAX_CHARACTER_LENGTH: usize = 254;

const REAL_LENGTH: u8 = 24;
const REAL_DECIMALS: u8 = 15;
const INTEGER_LENGTH: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Point,
    Multipoint,
    Polyline,
    Polygon,
}

impl ShapeKind {
    fn of(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Point { .. } => ShapeKind::Point,
            Geometry::MultiPoint { .. } => ShapeKind::Multipoint,
            Geometry::LineString { .. } | Geometry::MultiLineString { .. } => ShapeKind::Polyline,
            Geometry::Polygon { .. } | Geometry::MultiPolygon { .. } => ShapeKind::Polygon,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ShapeKind::Point => "Point",
            ShapeKind::Multipoint => "Multipoint",
            ShapeKind::Polyline => "Polyline",
            ShapeKind::Polygon => "Polygon",
        }
    }
}

/// dBase field names for `columns`: ASCII, at most 10 characters,
/// de-duplicated with a numeric suffix (`emergence_`, `emergenc_1`).
pub fn shapefile_field_names(columns: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(columns.len());

    for column in columns {
        let ascii: String = column
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        let base: String = ascii.chars().take(MAX_FIELD_NAME).collect();
        let base = if base.is_empty() { "field".to_string() } else { base };

        let mut name = base.clone();
        let mut n = 1;
        while taken.contains(&name.to_ascii_lowercase()) {
            let suffix = format!("_{}", n);
            let keep = MAX_FIELD_NAME.saturating_sub(suffix.len());
            name = format!("{}{}", &base[..keep.min(base.len())], suffix);
            n += 1;
        }
        taken.insert(name.to_ascii_lowercase());
        names.push(name);
    }
    names
}

fn truncate_utf8(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

struct Column {
    source: String,
    field: String,
    kind: ColumnKind,
}

fn plan_columns(table: &RecordTable) -> Vec<Column> {
    let names = shapefile_field_names(table.columns());
    table
        .columns()
        .iter()
        .zip(names)
        .map(|(source, field)| Column {
            source: source.clone(),
            field,
            kind: column_kind(table, source),
        })
        .collect()
}

fn field_name(name: &str) -> Result<FieldName, ExportError> {
    FieldName::try_from(name)
        .map_err(|e| ExportError::Shapefile(format!("invalid field name '{}': {:?}", name, e)))
}

fn table_builder(table: &RecordTable, columns: &[Column]) -> Result<TableWriterBuilder, ExportError> {
    let mut builder = TableWriterBuilder::new();
    for column in columns {
        let name = field_name(&column.field)?;
        builder = match column.kind {
            ColumnKind::Integer => builder.add_numeric_field(name, INTEGER_LENGTH, 0),
            ColumnKind::Real => builder.add_numeric_field(name, REAL_LENGTH, REAL_DECIMALS),
            ColumnKind::Boolean => builder.add_logical_field(name),
            ColumnKind::Text => {
                let longest = table
                    .iter()
                    .filter_map(|r| r.get(&column.source))
                    .map(|v| cell_text(&v).len())
                    .max()
                    .unwrap_or(1);
                let length = longest.clamp(1, MAX_CHARACTER_LENGTH) as u8;
                builder.add_character_field(name, length)
            }
        };
    }
    Ok(builder)
}

fn dbase_record(record: &ObservationRecord, columns: &[Column]) -> Record {
    let mut row = Record::default();
    for column in columns {
        let value = record.get(&column.source);
        let cell = match column.kind {
            ColumnKind::Integer | ColumnKind::Real => {
                FieldValue::Numeric(value.as_ref().and_then(Value::as_f64))
            }
            ColumnKind::Boolean => FieldValue::Logical(value.as_ref().and_then(Value::as_bool)),
            ColumnKind::Text => FieldValue::Character(
                value
                    .as_ref()
                    .map(|v| truncate_utf8(&cell_text(v), MAX_CHARACTER_LENGTH)),
            ),
        };
        row.insert(column.field.clone(), cell);
    }
    row
}

fn points(positions: &[[f64; 2]]) -> Vec<Point> {
    positions.iter().map(|[x, y]| Point::new(*x, *y)).collect()
}

fn invalid(record: &ObservationRecord, message: impl Into<String>) -> ExportError {
    ExportError::InvalidGeometry {
        record: record.display_id().to_string(),
        message: message.into(),
    }
}

fn line_part(record: &ObservationRecord, positions: &[[f64; 2]]) -> Result<Vec<Point>, ExportError> {
    if positions.len() < 2 {
        return Err(invalid(record, "a line needs at least two positions"));
    }
    Ok(points(positions))
}

fn rings(record: &ObservationRecord, polygon: &[Vec<[f64; 2]>]) -> Result<Vec<PolygonRing<Point>>, ExportError> {
    let mut rings = Vec::with_capacity(polygon.len());
    for (i, ring) in polygon.iter().enumerate() {
        if ring.len() < 3 {
            return Err(invalid(record, "a polygon ring needs at least three positions"));
        }
        let ring = points(ring);
        rings.push(if i == 0 {
            PolygonRing::Outer(ring)
        } else {
            PolygonRing::Inner(ring)
        });
    }
    Ok(rings)
}

fn to_point(record: &ObservationRecord, geometry: &Geometry) -> Result<Point, ExportError> {
    match geometry {
        Geometry::Point { coordinates: [x, y] } => Ok(Point::new(*x, *y)),
        other => Err(invalid(record, format!("expected Point, got {}", other.type_name()))),
    }
}

fn to_multipoint(record: &ObservationRecord, geometry: &Geometry) -> Result<Multipoint, ExportError> {
    match geometry {
        Geometry::MultiPoint { coordinates } => Ok(Multipoint::new(points(coordinates))),
        other => Err(invalid(record, format!("expected MultiPoint, got {}", other.type_name()))),
    }
}

fn to_polyline(record: &ObservationRecord, geometry: &Geometry) -> Result<Polyline, ExportError> {
    match geometry {
        Geometry::LineString { coordinates } => Ok(Polyline::new(line_part(record, coordinates)?)),
        Geometry::MultiLineString { coordinates } => {
            let parts = coordinates
                .iter()
                .map(|line| line_part(record, line))
                .collect::<Result<Vec<_>, _>>()?;
            if parts.is_empty() {
                return Err(invalid(record, "empty MultiLineString"));
            }
            Ok(Polyline::with_parts(parts))
        }
        other => Err(invalid(record, format!("expected a line, got {}", other.type_name()))),
    }
}

fn to_polygon(record: &ObservationRecord, geometry: &Geometry) -> Result<Polygon, ExportError> {
    let all_rings = match geometry {
        Geometry::Polygon { coordinates } => rings(record, coordinates)?,
        Geometry::MultiPolygon { coordinates } => {
            let mut all = Vec::new();
            for polygon in coordinates {
                all.extend(rings(record, polygon)?);
            }
            all
        }
        other => return Err(invalid(record, format!("expected a polygon, got {}", other.type_name()))),
    };
    if all_rings.is_empty() {
        return Err(invalid(record, "polygon without rings"));
    }
    Ok(Polygon::with_rings(all_rings))
}

fn write_rows<S, F>(
    path: &Path,
    table: &RecordTable,
    columns: &[Column],
    convert: F,
) -> Result<(), ExportError>
where
    S: EsriShape,
    F: Fn(&ObservationRecord, &Geometry) -> Result<S, ExportError>,
{
    let builder = table_builder(table, columns)?;
    let mut writer = shapefile::Writer::from_path(path, builder)
        .map_err(|e| ExportError::Shapefile(e.to_string()))?;

    for record in table {
        let geometry = record
            .geometry
            .as_ref()
            .ok_or_else(|| ExportError::MissingGeometry(record.display_id().to_string()))?;
        let shape = convert(record, geometry)?;
        let row = dbase_record(record, columns);
        writer
            .write_shape_and_record(&shape, &row)
            .map_err(|e| ExportError::Shapefile(e.to_string()))?;
    }
    Ok(())
}

/// Write the table as a shapefile. All records must share one shape type.
pub fn write_shapefile(table: &RecordTable, path: &Path) -> Result<(), ExportError> {
    let mut kind: Option<ShapeKind> = None;
    for record in table {
        let geometry = record
            .geometry
            .as_ref()
            .ok_or_else(|| ExportError::MissingGeometry(record.display_id().to_string()))?;
        let this = ShapeKind::of(geometry);
        match kind {
            None => kind = Some(this),
            Some(expected) if expected != this => {
                return Err(ExportError::MixedGeometry {
                    expected: expected.name(),
                    found: this.name(),
                })
            }
            Some(_) => {}
        }
    }
    let kind = kind.ok_or(ExportError::EmptyTable)?;

    let columns = plan_columns(table);
    debug!(
        path = %path.display(),
        shape = kind.name(),
        fields = columns.len(),
        "Writing shapefile"
    );

    match kind {
        ShapeKind::Point => write_rows(path, table, &columns, to_point),
        ShapeKind::Multipoint => write_rows(path, table, &columns, to_multipoint),
        ShapeKind::Polyline => write_rows(path, table, &columns, to_polyline),
        ShapeKind::Polygon => write_rows(path, table, &columns, to_polygon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stac_protocol::FeatureCollection;
    use tempfile::TempDir;

    #[test]
    fn test_field_names_truncated_and_unique() {
        let columns: Vec<String> = [
            "emergence_angle",
            "emergence_time",
            "emergence_extra",
            "ls",
            "centre_latitude",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let names = shapefile_field_names(&columns);
        assert_eq!(
            names,
            vec!["emergence_", "emergenc_1", "emergenc_2", "ls", "centre_lat"]
        );
        assert!(names.iter().all(|n| n.len() <= 10));
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate_utf8("abc", 10), "abc");
        assert_eq!(truncate_utf8("aé", 2), "a");
    }

    #[test]
    fn test_write_shapefile_creates_sidecars() {
        let dir = TempDir::new().unwrap();
        let fc: FeatureCollection = serde_json::from_value(test_utils::feature_collection(
            (0..3).map(|i| test_utils::nomad_feature(i, 134)).collect(),
        ))
        .unwrap();
        let table = RecordTable::from_feature_collection(fc, Path::new("mem")).unwrap();

        let path = dir.path().join("table.shp");
        write_shapefile(&table, &path).unwrap();

        assert!(path.exists());
        assert!(dir.path().join("table.shx").exists());
        assert!(dir.path().join("table.dbf").exists());
    }

    #[test]
    fn test_mixed_geometry_rejected() {
        let mut point = test_utils::nomad_feature(1, 1);
        point["geometry"] = serde_json::json!({"type": "Point", "coordinates": [0.0, 0.0]});
        let fc: FeatureCollection = serde_json::from_value(test_utils::feature_collection(vec![
            test_utils::nomad_feature(0, 1),
            point,
        ]))
        .unwrap();
        let table = RecordTable::from_feature_collection(fc, Path::new("mem")).unwrap();

        let dir = TempDir::new().unwrap();
        let err = write_shapefile(&table, &dir.path().join("mixed.shp")).unwrap_err();
        assert!(matches!(err, ExportError::MixedGeometry { .. }));
    }
}
