//! Core STAC types shared by catalogs, collections and items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stac_common::{BoundingBox, TimeRange};

/// Free-form JSON object used for item properties and collection summaries.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A hyperlink to a related STAC object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// The URI or path of the linked resource.
    pub href: String,

    /// The relationship type (e.g., "root", "child", "item").
    pub rel: String,

    /// The media type of the linked resource.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// A human-readable title for the link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    /// Create a new link with required fields.
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            type_: None,
            title: None,
        }
    }

    /// Set the media type.
    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// The spatial and temporal extent of a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

impl Extent {
    /// Create an extent holding a single bbox and a single closed interval.
    pub fn new(bbox: BoundingBox, range: TimeRange) -> Self {
        Self {
            spatial: SpatialExtent {
                bbox: vec![bbox.to_array()],
            },
            temporal: TemporalExtent {
                interval: vec![[Some(range.start), Some(range.end)]],
            },
        }
    }

    /// The overall bounding box (first entry), if any.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.spatial.bbox.first().copied().map(BoundingBox::from_array)
    }

    /// The overall closed interval (first entry), if both ends are set.
    pub fn time_range(&self) -> Option<TimeRange> {
        match self.temporal.interval.first() {
            Some([Some(start), Some(end)]) => Some(TimeRange::new(*start, *end)),
            _ => None,
        }
    }
}

/// Spatial extent with bounding boxes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpatialExtent {
    /// Bounding boxes as [west, south, east, north] arrays.
    /// The first box is the overall extent.
    pub bbox: Vec<[f64; 4]>,
}

/// Temporal extent with time intervals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporalExtent {
    /// Time intervals as [start, end] pairs; null marks an open end.
    pub interval: Vec<[Option<DateTime<Utc>>; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_link_builder() {
        let link = Link::new("./collection.json", "child")
            .with_type("application/json")
            .with_title("Diffraction order 134");

        assert_eq!(link.href, "./collection.json");
        assert_eq!(link.rel, "child");
        assert_eq!(link.type_, Some("application/json".to_string()));
        assert_eq!(link.title, Some("Diffraction order 134".to_string()));
    }

    #[test]
    fn test_link_serialization() {
        let link = Link::new("../catalog.json", "root").with_type("application/json");

        let json = serde_json::to_string(&link).unwrap();
        assert!(json.contains("\"href\":\"../catalog.json\""));
        assert!(json.contains("\"rel\":\"root\""));
        assert!(json.contains("\"type\":\"application/json\""));
        assert!(!json.contains("\"title\""));
    }

    #[test]
    fn test_extent_serialization() {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2018, 4, 21, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 4, 30, 12, 0, 0).unwrap(),
        );
        let extent = Extent::new(BoundingBox::new(-10.0, -5.0, 20.0, 15.0), range);

        let json = serde_json::to_value(&extent).unwrap();
        assert_eq!(json["spatial"]["bbox"][0][0], -10.0);
        assert_eq!(json["temporal"]["interval"][0][0], "2018-04-21T00:00:00Z");
        assert_eq!(json["temporal"]["interval"][0][1], "2018-04-30T12:00:00Z");

        let back: Extent = serde_json::from_value(json).unwrap();
        assert_eq!(back, extent);
        assert_eq!(back.time_range(), Some(range));
    }

    #[test]
    fn test_open_interval_has_no_range() {
        let extent = Extent {
            spatial: SpatialExtent { bbox: vec![] },
            temporal: TemporalExtent {
                interval: vec![[None, None]],
            },
        };
        assert!(extent.bounding_box().is_none());
        assert!(extent.time_range().is_none());
    }
}
