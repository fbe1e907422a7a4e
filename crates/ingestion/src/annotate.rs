//! Extension wiring for NOMAD items and collections.

use serde_json::Value;
use stac_protocol::{
    Band, Collection, EoExtension, Extension, Item, ProjectionExtension, SsysExtension,
    TargetClass,
};

use crate::error::{IngestionError, Result};
use crate::records::{fields, value_to_key, ObservationRecord};

/// Applies the EO, solar-system and projection extensions.
#[derive(Debug, Clone)]
pub struct ExtensionApplicator {
    eo: EoExtension,
    projection: ProjectionExtension,
    targets: Vec<String>,
    target_class: TargetClass,
}

impl ExtensionApplicator {
    pub fn new(
        bands: Vec<Band>,
        projection: ProjectionExtension,
        targets: Vec<String>,
        target_class: TargetClass,
    ) -> Self {
        Self {
            eo: EoExtension::new(bands),
            projection,
            targets,
            target_class,
        }
    }

    /// Summaries: bands, targets and target class, reference frame.
    pub fn annotate_collection(&self, collection: &mut Collection) -> Result<()> {
        self.eo.apply(collection)?;
        SsysExtension::summary(self.targets.clone(), self.target_class).apply(collection)?;
        self.projection.apply(collection)?;
        Ok(())
    }

    /// Item fields, including the record's local time.
    pub fn annotate_item(&self, item: &mut Item, record: &ObservationRecord) -> Result<()> {
        self.eo.apply(item)?;
        SsysExtension {
            targets: self.targets.clone(),
            target_class: self.target_class,
            local_time: Some(local_time(record)?),
        }
        .apply(item)?;
        self.projection.apply(item)?;
        Ok(())
    }

    /// Read all three extensions back from an item.
    pub fn validate_item(item: &Item) -> Result<()> {
        EoExtension::read(item)?;
        SsysExtension::read(item)?.require_local_time()?;
        ProjectionExtension::read(item)?;
        Ok(())
    }

    /// Read all three extension summaries back from a collection.
    pub fn validate_collection(collection: &Collection) -> Result<()> {
        EoExtension::read(collection)?;
        SsysExtension::read(collection)?;
        ProjectionExtension::read(collection)?;
        Ok(())
    }
}

/// `{martian_year}:{ls}:{local_solar_time}`, each value rendered as it
/// appears in the record.
pub fn local_time(record: &ObservationRecord) -> Result<String> {
    let part = |name: &str| {
        record
            .property(name)
            .and_then(render_plain)
            .ok_or_else(|| IngestionError::MissingField(name.to_string()))
    };
    Ok(format!(
        "{}:{}:{}",
        part(fields::MARTIAN_YEAR)?,
        part(fields::LS)?,
        part(fields::LOCAL_SOLAR_TIME)?
    ))
}

fn render_plain(value: &Value) -> Option<String> {
    match value {
        Value::Array(_) | Value::Object(_) => None,
        scalar => value_to_key(scalar),
    }
}
