//! Projection extension (`proj:`).
//!
//! Planetary frames rarely have EPSG codes, so the frame is recorded
//! either as an authority code (e.g. `IAU:2015:49900`) or as WKT2.
//!
//! See: <https://github.com/stac-extensions/projection>

use serde_json::Value;

use super::{Extension, ExtensionError, FieldReader};

/// Reference frame of the geometry coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionExtension {
    /// Authority code, e.g. `EPSG:4326` or `IAU:2015:49900`.
    pub code: Option<String>,

    /// Full WKT2 description of the frame.
    pub wkt2: Option<String>,
}

impl ProjectionExtension {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            wkt2: None,
        }
    }

    pub fn wkt2(wkt2: impl Into<String>) -> Self {
        Self {
            code: None,
            wkt2: Some(wkt2.into()),
        }
    }
}

impl Extension for ProjectionExtension {
    const NAME: &'static str = "proj";
    const PREFIX: &'static str = "proj:";
    const SCHEMA_URI: &'static str =
        "https://stac-extensions.github.io/projection/v2.0.0/schema.json";

    fn fields(&self) -> Result<Vec<(&'static str, Option<Value>)>, ExtensionError> {
        Ok(vec![
            ("code", self.code.clone().map(Value::String)),
            ("wkt2", self.wkt2.clone().map(Value::String)),
        ])
    }

    fn from_fields(fields: &FieldReader<'_>) -> Result<Self, ExtensionError> {
        let code: Option<String> = fields.optional("code")?;
        let wkt2: Option<String> = fields.optional("wkt2")?;
        if code.is_none() && wkt2.is_none() {
            return Err(ExtensionError::RequiredPropertyMissing(
                "proj:code".to_string(),
            ));
        }
        Ok(Self { code, wkt2 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Geometry;
    use crate::item::Item;
    use chrono::{TimeZone, Utc};
    use stac_common::{BoundingBox, TimeRange};

    fn item() -> Item {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2018, 4, 21, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 4, 21, 1, 0, 0).unwrap(),
        );
        Item::new(
            "scene",
            Geometry::point(0.0, 0.0),
            BoundingBox::from_point(0.0, 0.0),
            range,
        )
    }

    #[test]
    fn test_code_written_with_prefix() {
        let mut item = item();
        ProjectionExtension::code("IAU:2015:49986").apply(&mut item).unwrap();
        assert_eq!(item.properties["proj:code"], "IAU:2015:49986");
        assert!(item.properties.get("proj:wkt2").is_none());
    }

    #[test]
    fn test_read_requires_code_or_wkt() {
        let item = item();
        assert!(matches!(
            ProjectionExtension::read(&item),
            Err(ExtensionError::RequiredPropertyMissing(_))
        ));
    }
}
