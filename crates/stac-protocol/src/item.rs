//! STAC Items: one observation with its footprint, time range and assets.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stac_common::{parse_timestamp, BoundingBox, TimeRange};

use crate::asset::Asset;
use crate::geojson::Geometry;
use crate::types::{Link, Properties};
use crate::STAC_VERSION;

/// A STAC Item (a GeoJSON Feature with STAC fields).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub stac_version: String,

    /// Schema URIs of the extensions in use.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,

    pub id: String,

    pub geometry: Geometry,

    /// [west, south, east, north]
    pub bbox: [f64; 4],

    pub properties: Properties,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,

    /// Id of the owning collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// Render a timestamp the way STAC expects it.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl Item {
    /// Create an item covering `range`.
    ///
    /// `datetime` and `start_datetime` are both set to the start of the
    /// range and `end_datetime` to its end.
    pub fn new(
        id: impl Into<String>,
        geometry: Geometry,
        bbox: BoundingBox,
        range: TimeRange,
    ) -> Self {
        let start = Value::String(format_datetime(&range.start));
        let end = Value::String(format_datetime(&range.end));

        let mut properties = Properties::new();
        properties.insert("datetime".to_string(), start.clone());
        properties.insert("start_datetime".to_string(), start);
        properties.insert("end_datetime".to_string(), end);

        Self {
            type_: "Feature".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.into(),
            geometry,
            bbox: bbox.to_array(),
            properties,
            links: Vec::new(),
            assets: BTreeMap::new(),
            collection: None,
        }
    }

    /// Set a property, replacing any previous value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Attach an asset under `key`, replacing any previous one.
    pub fn add_asset(&mut self, key: impl Into<String>, asset: Asset) {
        self.assets.insert(key.into(), asset);
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_array(self.bbox)
    }

    /// The covered time range, read back from the temporal properties.
    ///
    /// Falls back to `datetime` for whichever end is missing.
    pub fn time_range(&self) -> Option<TimeRange> {
        let read = |key: &str| {
            self.properties
                .get(key)
                .and_then(Value::as_str)
                .and_then(|s| parse_timestamp(s).ok())
        };
        let datetime = read("datetime");
        let start = read("start_datetime").or(datetime)?;
        let end = read("end_datetime").or(datetime)?;
        Some(TimeRange::new(start, end))
    }
}
