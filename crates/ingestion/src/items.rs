//! Observation record to STAC item mapping.

use serde_json::Value;
use stac_protocol::{media_types, Asset, Item};

use crate::config::mission;
use crate::error::{IngestionError, Result};
use crate::records::{fields, ObservationRecord};

/// Key of the asset pointing at the record's HDF5 product.
pub const DATA_ASSET: &str = "dataformat";

/// Platform metadata stamped identically on every item.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonMetadata {
    pub platform: String,
    pub instruments: Vec<String>,
    pub constellation: String,
    pub mission: String,
}

impl Default for CommonMetadata {
    fn default() -> Self {
        Self {
            platform: mission::PLATFORM.to_string(),
            instruments: mission::INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
            constellation: mission::CONSTELLATION.to_string(),
            mission: mission::MISSION.to_string(),
        }
    }
}

/// Builds items from observation records.
#[derive(Debug, Clone, Default)]
pub struct ItemBuilder {
    common: CommonMetadata,
}

impl ItemBuilder {
    pub fn new(common: CommonMetadata) -> Self {
        Self { common }
    }

    /// Item with geometry, temporal range, domain properties, common
    /// metadata and the data asset.
    pub fn build(&self, record: &ObservationRecord) -> Result<Item> {
        let id = record
            .id
            .clone()
            .ok_or_else(|| IngestionError::MissingField(fields::ID.to_string()))?;
        let geometry = record
            .geometry
            .clone()
            .ok_or_else(|| IngestionError::MissingField("geometry".to_string()))?;
        let bbox = geometry
            .bbox()
            .ok_or_else(|| IngestionError::MissingField("geometry".to_string()))?;

        let mut item = Item::new(id, geometry, bbox, record.time_range());

        for name in fields::ITEM_PROPERTIES {
            if let Some(value) = record.property(name) {
                item.set_property(name, value.clone());
            }
        }

        self.stamp_common_metadata(&mut item);
        self.attach_asset(&mut item, record)?;
        Ok(item)
    }

    fn stamp_common_metadata(&self, item: &mut Item) {
        item.set_property("platform", self.common.platform.clone());
        item.set_property(
            "instruments",
            Value::Array(
                self.common
                    .instruments
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        item.set_property("constellation", self.common.constellation.clone());
        item.set_property("mission", self.common.mission.clone());
    }

    /// Attach the `dataformat` asset from `hdf5_filename`.
    pub fn attach_asset(&self, item: &mut Item, record: &ObservationRecord) -> Result<()> {
        let href = record
            .property(fields::HDF5_FILENAME)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IngestionError::MissingField(fields::HDF5_FILENAME.to_string()))?;

        item.add_asset(
            DATA_ASSET,
            Asset::new(href)
                .with_type(media_types::HDF5)
                .with_title("NOMAD calibrated spectra")
                .with_role("data"),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use stac_protocol::Feature;

    fn record(value: Value) -> ObservationRecord {
        let feature: Feature = serde_json::from_value(value).unwrap();
        ObservationRecord::from_feature(feature, Path::new("test.geojson"), 0).unwrap()
    }

    #[test]
    fn test_build_full_record() {
        let record = record(test_utils::nomad_feature(2, 134));
        let item = ItemBuilder::default().build(&record).unwrap();

        assert_eq!(item.id, test_utils::scene_id(2, 134));
        assert_eq!(item.properties["platform"], "exomars-trace-gas-orbiter");
        assert_eq!(item.properties["instruments"], serde_json::json!(["NOMAD"]));
        assert_eq!(item.properties["constellation"], "exomars");
        assert_eq!(item.properties["mission"], "ExoMars");
        assert_eq!(item.properties["datetime"], item.properties["start_datetime"]);
        for name in fields::ITEM_PROPERTIES {
            assert!(item.properties.contains_key(name), "missing {name}");
        }
        assert!(!item.properties.contains_key("diffraction_order"));

        assert_eq!(item.assets.len(), 1);
        let asset = &item.assets[DATA_ASSET];
        assert_eq!(asset.type_.as_deref(), Some("application/x-hdf5"));
        assert_eq!(asset.roles, vec!["data".to_string()]);
        assert!(asset.href.ends_with(".h5"));
    }

    #[test]
    fn test_absent_attributes_are_omitted() {
        let mut value = test_utils::nomad_feature(0, 1);
        value["properties"]
            .as_object_mut()
            .unwrap()
            .remove("phase_angle");
        let item = ItemBuilder::default().build(&record(value)).unwrap();
        assert!(!item.properties.contains_key("phase_angle"));
        assert!(item.properties.contains_key("incidence_angle"));
    }

    #[test]
    fn test_missing_required_fields() {
        let mut value = test_utils::nomad_feature(0, 1);
        value["properties"]
            .as_object_mut()
            .unwrap()
            .remove("hdf5_filename");
        let err = ItemBuilder::default().build(&record(value)).unwrap_err();
        assert!(matches!(err, IngestionError::MissingField(ref f) if f == "hdf5_filename"));

        let mut value = test_utils::nomad_feature(0, 1);
        value["geometry"] = Value::Null;
        let err = ItemBuilder::default().build(&record(value)).unwrap_err();
        assert!(matches!(err, IngestionError::MissingField(ref f) if f == "geometry"));

        let mut value = test_utils::nomad_feature(0, 1);
        value["properties"].as_object_mut().unwrap().remove("psa_lid");
        let err = ItemBuilder::default().build(&record(value)).unwrap_err();
        assert!(matches!(err, IngestionError::MissingField(ref f) if f == "psa_lid"));
    }
}
