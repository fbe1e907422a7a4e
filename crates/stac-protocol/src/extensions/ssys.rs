//! Solar System extension (`ssys:`).
//!
//! Describes which body an observation targets and a local, body-relative
//! time. Target names and classes follow the IVOA EPN-TAP vocabulary.
//!
//! See: <https://github.com/stac-extensions/ssys>

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{to_field, Extension, ExtensionError, FieldReader};

/// Kind of target body (EPN-TAP `target_class`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetClass {
    Asteroid,
    DwarfPlanet,
    Planet,
    Satellite,
    Comet,
    Exoplanet,
    InterplanetaryMedium,
    Sample,
    Sky,
    Spacecraft,
    Spacejunk,
    Star,
    Calibration,
}

impl TargetClass {
    pub const ALL: [TargetClass; 13] = [
        TargetClass::Asteroid,
        TargetClass::DwarfPlanet,
        TargetClass::Planet,
        TargetClass::Satellite,
        TargetClass::Comet,
        TargetClass::Exoplanet,
        TargetClass::InterplanetaryMedium,
        TargetClass::Sample,
        TargetClass::Sky,
        TargetClass::Spacecraft,
        TargetClass::Spacejunk,
        TargetClass::Star,
        TargetClass::Calibration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetClass::Asteroid => "asteroid",
            TargetClass::DwarfPlanet => "dwarf_planet",
            TargetClass::Planet => "planet",
            TargetClass::Satellite => "satellite",
            TargetClass::Comet => "comet",
            TargetClass::Exoplanet => "exoplanet",
            TargetClass::InterplanetaryMedium => "interplanetary_medium",
            TargetClass::Sample => "sample",
            TargetClass::Sky => "sky",
            TargetClass::Spacecraft => "spacecraft",
            TargetClass::Spacejunk => "spacejunk",
            TargetClass::Star => "star",
            TargetClass::Calibration => "calibration",
        }
    }
}

impl fmt::Display for TargetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetClass {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetClass::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ExtensionError::InvalidProperty {
                property: "ssys:target_class".to_string(),
                message: format!("unknown target class '{}'", s),
            })
    }
}

/// Target bodies, target class and local time of an observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SsysExtension {
    /// Target body names, e.g. `["mars"]`.
    pub targets: Vec<String>,

    pub target_class: TargetClass,

    /// Lexicographically sortable body-local time, e.g. `34:163.2:13.5`
    /// (Mars year, solar longitude, local solar time). Not summarized on
    /// collections.
    pub local_time: Option<String>,
}

impl SsysExtension {
    /// Item fields for an observation of Mars.
    pub fn mars(local_time: impl Into<String>) -> Self {
        Self {
            targets: vec!["mars".to_string()],
            target_class: TargetClass::Planet,
            local_time: Some(local_time.into()),
        }
    }

    /// Collection summary fields (no local time).
    pub fn summary(targets: Vec<String>, target_class: TargetClass) -> Self {
        Self {
            targets,
            target_class,
            local_time: None,
        }
    }

    /// The local time, which items must carry.
    pub fn require_local_time(&self) -> Result<&str, ExtensionError> {
        self.local_time
            .as_deref()
            .ok_or_else(|| ExtensionError::RequiredPropertyMissing("ssys:local_time".to_string()))
    }
}

impl Extension for SsysExtension {
    const NAME: &'static str = "ssys";
    const PREFIX: &'static str = "ssys:";
    const SCHEMA_URI: &'static str = "https://stac-extensions.github.io/ssys/v1.1.0/schema.json";

    fn fields(&self) -> Result<Vec<(&'static str, Option<Value>)>, ExtensionError> {
        Ok(vec![
            ("targets", Some(to_field("targets", &self.targets)?)),
            ("target_class", Some(to_field("target_class", &self.target_class)?)),
            ("local_time", self.local_time.clone().map(Value::String)),
        ])
    }

    fn from_fields(fields: &FieldReader<'_>) -> Result<Self, ExtensionError> {
        Ok(Self {
            targets: fields.required("targets")?,
            target_class: fields.required("target_class")?,
            local_time: fields.optional("local_time")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_class_serialization() {
        let json = serde_json::to_string(&TargetClass::DwarfPlanet).unwrap();
        assert_eq!(json, "\"dwarf_planet\"");

        let back: TargetClass = serde_json::from_str("\"interplanetary_medium\"").unwrap();
        assert_eq!(back, TargetClass::InterplanetaryMedium);
    }

    #[test]
    fn test_target_class_parse_matches_serde() {
        for class in TargetClass::ALL {
            let parsed: TargetClass = class.as_str().parse().unwrap();
            assert_eq!(parsed, class);
            assert_eq!(
                serde_json::to_value(class).unwrap(),
                Value::String(class.to_string())
            );
        }
        assert!("moon".parse::<TargetClass>().is_err());
    }

    #[test]
    fn test_require_local_time() {
        let ext = SsysExtension::mars("34:163.2:13.5");
        assert_eq!(ext.require_local_time().unwrap(), "34:163.2:13.5");

        let summary = SsysExtension::summary(vec!["mars".to_string()], TargetClass::Planet);
        assert!(matches!(
            summary.require_local_time(),
            Err(ExtensionError::RequiredPropertyMissing(_))
        ));
    }
}
