//! STAC metadata extensions.
//!
//! An extension is a namespaced group of properties plus the schema URI
//! that validates them. Extensions do not live on the objects they
//! annotate: an [`Extension`] value is applied to an [`Extensible`] target,
//! which writes its prefixed fields into the target's property map and
//! registers the schema URI, and it is read back from that map when
//! needed.
//!
//! Items store fields in `properties`. Collections store them in
//! `summaries`, where every value is a list of the values found among the
//! collection's members.

mod eo;
mod projection;
mod ssys;

pub use eo::{Band, EoExtension};
pub use projection::ProjectionExtension;
pub use ssys::{SsysExtension, TargetClass};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::collection::Collection;
use crate::item::Item;
use crate::types::Properties;

/// Errors raised while applying or reading an extension.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// A property the extension needs is absent from the target.
    #[error("Required property missing: {0}")]
    RequiredPropertyMissing(String),

    /// A property is present but does not have the expected shape.
    #[error("Invalid value for '{property}': {message}")]
    InvalidProperty { property: String, message: String },

    #[error("Failed to serialize extension field '{property}': {source}")]
    Serialization {
        property: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A STAC object that extensions can be attached to.
pub trait Extensible {
    /// Whether fields are stored as summaries (lists of values).
    const SUMMARIES: bool;

    fn extension_fields(&self) -> &Properties;

    fn extension_fields_mut(&mut self) -> &mut Properties;

    fn stac_extensions(&self) -> &[String];

    fn stac_extensions_mut(&mut self) -> &mut Vec<String>;
}

impl Extensible for Item {
    const SUMMARIES: bool = false;

    fn extension_fields(&self) -> &Properties {
        &self.properties
    }

    fn extension_fields_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn stac_extensions(&self) -> &[String] {
        &self.stac_extensions
    }

    fn stac_extensions_mut(&mut self) -> &mut Vec<String> {
        &mut self.stac_extensions
    }
}

impl Extensible for Collection {
    const SUMMARIES: bool = true;

    fn extension_fields(&self) -> &Properties {
        &self.summaries
    }

    fn extension_fields_mut(&mut self) -> &mut Properties {
        &mut self.summaries
    }

    fn stac_extensions(&self) -> &[String] {
        &self.stac_extensions
    }

    fn stac_extensions_mut(&mut self) -> &mut Vec<String> {
        &mut self.stac_extensions
    }
}

/// A namespaced set of properties with a typed apply/read pair.
pub trait Extension: Sized {
    /// Short name, e.g. "eo".
    const NAME: &'static str;

    /// Property prefix including the colon, e.g. "eo:".
    const PREFIX: &'static str;

    const SCHEMA_URI: &'static str;

    /// The unprefixed fields of this extension. `None` removes the field.
    fn fields(&self) -> Result<Vec<(&'static str, Option<Value>)>, ExtensionError>;

    /// Rebuild the extension from a target's fields.
    fn from_fields(fields: &FieldReader<'_>) -> Result<Self, ExtensionError>;

    /// Write the fields into `target` and register the schema URI.
    ///
    /// Previous values are overwritten, so applying the same value twice
    /// leaves the target unchanged.
    fn apply<T: Extensible>(&self, target: &mut T) -> Result<(), ExtensionError> {
        let fields = self.fields()?;
        let props = target.extension_fields_mut();
        for (name, value) in fields {
            let key = prefixed::<Self>(name);
            match value {
                Some(value) if T::SUMMARIES => {
                    props.insert(key, as_summary(value));
                }
                Some(value) => {
                    props.insert(key, value);
                }
                None => {
                    props.remove(&key);
                }
            }
        }

        let extensions = target.stac_extensions_mut();
        if !extensions.iter().any(|uri| uri == Self::SCHEMA_URI) {
            extensions.push(Self::SCHEMA_URI.to_string());
        }
        Ok(())
    }

    /// Read the extension back from `target`.
    fn read<T: Extensible>(target: &T) -> Result<Self, ExtensionError> {
        let reader = FieldReader {
            props: target.extension_fields(),
            prefix: Self::PREFIX,
            summaries: T::SUMMARIES,
        };
        Self::from_fields(&reader)
    }

    /// Whether the schema URI is registered on `target`.
    fn is_applied<T: Extensible>(target: &T) -> bool {
        target
            .stac_extensions()
            .iter()
            .any(|uri| uri == Self::SCHEMA_URI)
    }
}

fn prefixed<E: Extension>(name: &str) -> String {
    format!("{}{}", E::PREFIX, name)
}

/// Summaries hold lists; wrap scalars.
fn as_summary(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        other => Value::Array(vec![other]),
    }
}

/// Serialize a field value for [`Extension::fields`].
pub(crate) fn to_field<V: serde::Serialize>(
    name: &'static str,
    value: &V,
) -> Result<Value, ExtensionError> {
    serde_json::to_value(value).map_err(|source| ExtensionError::Serialization {
        property: name.to_string(),
        source,
    })
}

/// Typed access to the prefixed fields of one extension on one target.
pub struct FieldReader<'a> {
    props: &'a Properties,
    prefix: &'static str,
    summaries: bool,
}

impl<'a> FieldReader<'a> {
    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Decode an optional field; null counts as absent.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ExtensionError> {
        let key = self.key(name);
        let value = match self.props.get(&key) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };

        match serde_json::from_value::<T>(value.clone()) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                // A scalar field stored as a one-value summary list.
                if self.summaries {
                    if let Some(first) = value.as_array().and_then(|a| a.first()) {
                        if let Ok(v) = serde_json::from_value::<T>(first.clone()) {
                            return Ok(Some(v));
                        }
                    }
                }
                Err(ExtensionError::InvalidProperty {
                    property: key,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Decode a field that must be present.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T, ExtensionError> {
        self.optional(name)?
            .ok_or_else(|| ExtensionError::RequiredPropertyMissing(self.key(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Geometry;
    use crate::types::Extent;
    use chrono::{TimeZone, Utc};
    use stac_common::{BoundingBox, TimeRange};

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2018, 4, 21, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 4, 21, 1, 0, 0).unwrap(),
        )
    }

    fn item() -> Item {
        Item::new(
            "scene",
            Geometry::point(1.0, 2.0),
            BoundingBox::from_point(1.0, 2.0),
            range(),
        )
    }

    fn collection() -> Collection {
        Collection::new(
            "root",
            "root",
            Extent::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), range()),
        )
    }

    #[test]
    fn test_apply_registers_schema_once() {
        let mut item = item();
        let ssys = SsysExtension::mars("34:163.2:13.5");
        ssys.apply(&mut item).unwrap();
        ssys.apply(&mut item).unwrap();

        assert_eq!(item.stac_extensions, vec![SsysExtension::SCHEMA_URI.to_string()]);
        assert!(SsysExtension::is_applied(&item));
        assert!(!EoExtension::is_applied(&item));
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let mut once = item();
        let mut twice = item();
        let proj = ProjectionExtension::code("IAU:2015:49986");

        proj.apply(&mut once).unwrap();
        proj.apply(&mut twice).unwrap();
        proj.apply(&mut twice).unwrap();

        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn test_reapply_overwrites() {
        let mut item = item();
        ProjectionExtension::code("IAU:2015:49986").apply(&mut item).unwrap();
        ProjectionExtension::wkt2("GEOGCRS[\"Mars (2015) - Sphere\"]")
            .apply(&mut item)
            .unwrap();

        assert!(item.properties.get("proj:code").is_none());
        let proj = ProjectionExtension::read(&item).unwrap();
        assert_eq!(proj.wkt2.as_deref(), Some("GEOGCRS[\"Mars (2015) - Sphere\"]"));
    }

    #[test]
    fn test_read_missing_property() {
        let item = item();
        let err = SsysExtension::read(&item).unwrap_err();
        assert!(matches!(
            err,
            ExtensionError::RequiredPropertyMissing(ref p) if p == "ssys:targets"
        ));
    }

    #[test]
    fn test_summaries_are_lists() {
        let mut collection = collection();
        let ssys = SsysExtension::summary(vec!["mars".to_string()], TargetClass::Planet);
        ssys.apply(&mut collection).unwrap();
        ProjectionExtension::code("IAU:2015:49986")
            .apply(&mut collection)
            .unwrap();

        assert_eq!(collection.summaries["ssys:targets"], serde_json::json!(["mars"]));
        assert_eq!(collection.summaries["ssys:target_class"], serde_json::json!(["planet"]));
        assert_eq!(collection.summaries["proj:code"], serde_json::json!(["IAU:2015:49986"]));

        let back = SsysExtension::read(&collection).unwrap();
        assert_eq!(back.target_class, TargetClass::Planet);
        assert_eq!(back.targets, vec!["mars".to_string()]);
    }

    #[test]
    fn test_invalid_property() {
        let mut item = item();
        item.set_property("ssys:targets", "mars");
        item.set_property("ssys:target_class", "moon");

        let err = SsysExtension::read(&item).unwrap_err();
        assert!(matches!(err, ExtensionError::InvalidProperty { .. }));
    }
}
