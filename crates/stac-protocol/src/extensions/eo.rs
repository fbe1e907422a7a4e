//! Electro-Optical extension (`eo:`).
//!
//! See: <https://github.com/stac-extensions/eo>

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{to_field, Extension, ExtensionError, FieldReader};

/// A spectral band descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Band {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Center wavelength in micrometres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_wavelength: Option<f64>,

    /// Full width at half maximum in micrometres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_width_half_max: Option<f64>,
}

impl Band {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            common_name: None,
            description: None,
            center_wavelength: None,
            full_width_half_max: None,
        }
    }

    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = Some(common_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set center and width from a `[min, max]` wavelength window in μm.
    pub fn with_window(mut self, min_um: f64, max_um: f64) -> Self {
        self.center_wavelength = Some((min_um + max_um) / 2.0);
        self.full_width_half_max = Some(max_um - min_um);
        self
    }
}

/// The `eo:bands` list.
#[derive(Debug, Clone, PartialEq)]
pub struct EoExtension {
    pub bands: Vec<Band>,
}

impl EoExtension {
    pub fn new(bands: Vec<Band>) -> Self {
        Self { bands }
    }
}

impl Extension for EoExtension {
    const NAME: &'static str = "eo";
    const PREFIX: &'static str = "eo:";
    const SCHEMA_URI: &'static str = "https://stac-extensions.github.io/eo/v1.1.0/schema.json";

    fn fields(&self) -> Result<Vec<(&'static str, Option<Value>)>, ExtensionError> {
        Ok(vec![("bands", Some(to_field("bands", &self.bands)?))])
    }

    fn from_fields(fields: &FieldReader<'_>) -> Result<Self, ExtensionError> {
        Ok(Self {
            bands: fields.required("bands")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Geometry;
    use crate::item::Item;
    use chrono::{TimeZone, Utc};
    use stac_common::{BoundingBox, TimeRange};

    #[test]
    fn test_band_window() {
        let band = Band::new("LNO").with_window(2.2, 3.8);
        assert!((band.center_wavelength.unwrap() - 3.0).abs() < 1e-12);
        assert!((band.full_width_half_max.unwrap() - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_bands_roundtrip_on_item() {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2018, 4, 21, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 4, 21, 1, 0, 0).unwrap(),
        );
        let mut item = Item::new(
            "scene",
            Geometry::point(0.0, 0.0),
            BoundingBox::from_point(0.0, 0.0),
            range,
        );

        let eo = EoExtension::new(vec![
            Band::new("SO").with_common_name("so").with_window(2.2, 4.3),
            Band::new("LNO").with_common_name("lno").with_window(2.2, 3.8),
        ]);
        eo.apply(&mut item).unwrap();

        assert_eq!(item.properties["eo:bands"][1]["name"], "LNO");
        assert_eq!(EoExtension::read(&item).unwrap(), eo);
    }
}
