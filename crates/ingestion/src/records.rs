//! The unified observation record table.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;
use stac_common::{parse_timestamp, BoundingBox, TimeRange};
use stac_protocol::item::format_datetime;
use stac_protocol::{Feature, FeatureCollection, Geometry, Properties};

use crate::error::{IngestionError, IntegrityKind, Result};

/// Column names used by NOMAD/PSA scene exports.
pub mod fields {
    pub const ID: &str = "psa_lid";
    pub const UTC_START_TIME: &str = "utc_start_time";
    pub const UTC_END_TIME: &str = "utc_end_time";
    pub const DIFFRACTION_ORDER: &str = "diffraction_order";
    pub const HDF5_FILENAME: &str = "hdf5_filename";
    pub const MARTIAN_YEAR: &str = "martian_year";
    pub const LS: &str = "ls";
    pub const LOCAL_SOLAR_TIME: &str = "local_solar_time";

    /// Domain attributes copied into item properties.
    pub const ITEM_PROPERTIES: [&str; 7] = [
        "spec_ix",
        "incidence_angle",
        "emergence_angle",
        "phase_angle",
        "centre_latitude",
        "centre_longitude",
        "channel_temperature",
    ];
}

/// One row of the table: a single observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    /// Feature `id`, or the `psa_lid` property.
    pub id: Option<String>,
    pub geometry: Option<Geometry>,
    pub utc_start_time: DateTime<Utc>,
    pub utc_end_time: DateTime<Utc>,
    /// All other columns present in the source feature.
    pub properties: Properties,
}

impl ObservationRecord {
    /// Build a record from a GeoJSON feature, coercing the timestamp
    /// columns. `index` is the feature position, used in messages.
    pub fn from_feature(feature: Feature, file: &Path, index: usize) -> Result<Self> {
        let id = feature.id_string();
        let mut properties = feature.properties.unwrap_or_default();

        let start = take_timestamp(&mut properties, fields::UTC_START_TIME, file, index)?;
        let end = take_timestamp(&mut properties, fields::UTC_END_TIME, file, index)?;
        if end < start {
            return Err(IngestionError::integrity(
                file,
                IntegrityKind::TimeOrder,
                format!(
                    "feature {} ends ({}) before it starts ({})",
                    index,
                    format_datetime(&end),
                    format_datetime(&start)
                ),
            ));
        }

        let id = id.or_else(|| properties.get(fields::ID).and_then(value_to_key));

        Ok(Self {
            id,
            geometry: feature.geometry,
            utc_start_time: start,
            utc_end_time: end,
            properties,
        })
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.utc_start_time, self.utc_end_time)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry.as_ref().and_then(Geometry::bbox)
    }

    /// Value of a column. Timestamps are rendered as RFC 3339 strings.
    pub fn get(&self, column: &str) -> Option<Value> {
        match column {
            fields::UTC_START_TIME => Some(Value::String(format_datetime(&self.utc_start_time))),
            fields::UTC_END_TIME => Some(Value::String(format_datetime(&self.utc_end_time))),
            _ => self
                .properties
                .get(column)
                .filter(|v| !v.is_null())
                .cloned(),
        }
    }

    /// Non-null property value.
    pub fn property(&self, column: &str) -> Option<&Value> {
        self.properties.get(column).filter(|v| !v.is_null())
    }

    /// Id for messages: the record id or `<unknown>`.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<unknown>")
    }

    /// Back to a GeoJSON feature, timestamps included as text.
    pub fn to_feature(&self, columns: &[String]) -> Feature {
        let mut properties = Properties::new();
        for column in columns {
            if let Some(value) = self.get(column) {
                properties.insert(column.clone(), value);
            }
        }
        Feature {
            type_: "Feature".to_string(),
            id: self.id.clone().map(Value::String),
            geometry: self.geometry.clone(),
            properties: Some(properties),
        }
    }
}

fn take_timestamp(
    properties: &mut Properties,
    column: &str,
    file: &Path,
    index: usize,
) -> Result<DateTime<Utc>> {
    let value = match properties.remove(column) {
        Some(Value::Null) | None => {
            return Err(IngestionError::integrity(
                file,
                IntegrityKind::MissingColumn,
                format!("feature {} has no '{}'", index, column),
            ))
        }
        Some(value) => value,
    };

    let text = value.as_str().ok_or_else(|| {
        IngestionError::integrity(
            file,
            IntegrityKind::TimeParseError,
            format!("feature {}: '{}' is not a string: {}", index, column, value),
        )
    })?;

    parse_timestamp(text).map_err(|e| {
        IngestionError::integrity(
            file,
            IntegrityKind::TimeParseError,
            format!("feature {}: '{}': {}", index, column, e),
        )
    })
}

/// Render a scalar JSON value as a plain key (strings unquoted).
pub fn value_to_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Rows of one discriminant value, borrowed from the table.
#[derive(Debug)]
pub struct Partition<'a> {
    /// The discriminant value as text, `None` for the whole table.
    pub key: Option<String>,
    pub records: Vec<&'a ObservationRecord>,
}

/// Flat, read-only table of observation records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    records: Vec<ObservationRecord>,
    columns: Vec<String>,
    crs: Option<Value>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a feature collection read from `file`.
    pub fn from_feature_collection(collection: FeatureCollection, file: &Path) -> Result<Self> {
        let mut table = Self {
            crs: collection.crs,
            ..Self::default()
        };
        for (index, feature) in collection.features.into_iter().enumerate() {
            let keys: Vec<String> = feature
                .properties
                .as_ref()
                .map(|p| p.keys().cloned().collect())
                .unwrap_or_default();
            let record = ObservationRecord::from_feature(feature, file, index)?;
            table.note_columns(keys);
            table.records.push(record);
        }
        Ok(table)
    }

    fn note_columns(&mut self, keys: impl IntoIterator<Item = String>) {
        for key in keys {
            if !self.columns.contains(&key) {
                self.columns.push(key);
            }
        }
    }

    /// Append another table's rows.
    ///
    /// A table without a `crs` member is compatible with any other and takes
    /// the declared one; two declared systems must be equal.
    pub fn concat(&mut self, other: RecordTable, file: &Path) -> Result<()> {
        if let Some(crs) = other.crs {
            match &self.crs {
                Some(own) if *own != crs => {
                    return Err(IngestionError::integrity(
                        file,
                        IntegrityKind::ConcatError,
                        format!("coordinate reference system {} differs from {}", crs, own),
                    ));
                }
                Some(_) => {}
                None => self.crs = Some(crs),
            }
        }
        self.note_columns(other.columns);
        self.records.extend(other.records);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObservationRecord> {
        self.records.iter()
    }

    /// Property columns in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The GeoJSON `crs` member shared by all source files.
    pub fn crs(&self) -> Option<&Value> {
        self.crs.as_ref()
    }

    /// Check that every identified record has a distinct id.
    pub fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for record in &self.records {
            if let Some(id) = &record.id {
                if !seen.insert(id.as_str()) {
                    return Err(IngestionError::integrity(
                        "<table>",
                        IntegrityKind::DuplicateId,
                        format!("record id '{}' appears more than once", id),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Partition by `field` in first-appearance order, or one partition
    /// holding the whole table when `field` is `None`.
    pub fn partition_by(&self, field: Option<&str>) -> Result<Vec<Partition<'_>>> {
        let field = match field {
            Some(field) => field,
            None => {
                return Ok(vec![Partition {
                    key: None,
                    records: self.records.iter().collect(),
                }])
            }
        };

        let mut partitions: Vec<Partition<'_>> = Vec::new();
        for record in &self.records {
            let key = record
                .property(field)
                .and_then(value_to_key)
                .ok_or_else(|| IngestionError::MissingField(field.to_string()))?;

            match partitions
                .iter_mut()
                .find(|p| p.key.as_deref() == Some(key.as_str()))
            {
                Some(partition) => partition.records.push(record),
                None => partitions.push(Partition {
                    key: Some(key),
                    records: vec![record],
                }),
            }
        }
        Ok(partitions)
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a ObservationRecord;
    type IntoIter = std::slice::Iter<'a, ObservationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
