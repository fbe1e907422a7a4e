//! GeoJSON types for observation footprints.
//!
//! Only the subset needed for NOMAD scene records is modelled: 2D positions
//! and the six simple geometry types. Positions carry planetocentric
//! longitude/latitude in whatever frame the source declares.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc7946>

use serde::{Deserialize, Serialize};
use stac_common::BoundingBox;

use crate::types::Properties;

/// A GeoJSON geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },

    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },

    LineString {
        coordinates: Vec<[f64; 2]>,
    },

    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },

    /// Linear rings; the first is the exterior, the rest are holes.
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },

    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

impl Geometry {
    /// Create a point geometry.
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            coordinates: [x, y],
        }
    }

    /// Create a line string geometry.
    pub fn line_string(coordinates: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates }
    }

    /// Create a polygon geometry.
    pub fn polygon(coordinates: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates }
    }

    /// The GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
        }
    }

    /// Every position of the geometry, in document order.
    pub fn positions(&self) -> Vec<&[f64; 2]> {
        match self {
            Geometry::Point { coordinates } => vec![coordinates],
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().collect()
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().flatten().collect()
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().collect()
            }
        }
    }

    /// Bounding box of all positions, `None` for an empty geometry.
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_positions(self.positions())
    }
}

/// A GeoJSON Feature with free-form properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type", default = "feature_type")]
    pub type_: String,

    /// Optional feature identifier (string or number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,

    /// The footprint; null geometries are allowed by GeoJSON.
    pub geometry: Option<Geometry>,

    /// Properties; null is allowed by GeoJSON.
    #[serde(default)]
    pub properties: Option<Properties>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self {
            type_: feature_type(),
            id: None,
            geometry: Some(geometry),
            properties: Some(properties),
        }
    }

    /// Set the feature ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(serde_json::Value::String(id.into()));
        self
    }

    /// The identifier rendered as a string, if present.
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type", default = "feature_collection_type")]
    pub type_: String,

    /// Legacy (2008) coordinate reference system member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<serde_json::Value>,

    /// Array of features.
    pub features: Vec<Feature>,
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

impl FeatureCollection {
    /// Create a new empty FeatureCollection.
    pub fn new() -> Self {
        Self {
            type_: feature_collection_type(),
            crs: None,
            features: Vec::new(),
        }
    }

    /// Add multiple features to the collection.
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A top-level GeoJSON document as read from disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    FeatureCollection(FeatureCollection),
    Feature(Feature),
}

impl GeoJson {
    /// Normalize into a feature collection.
    pub fn into_feature_collection(self) -> FeatureCollection {
        match self {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(f) => FeatureCollection::new().with_features(vec![f]),
        }
    }
}
