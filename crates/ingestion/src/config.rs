//! Build configuration: NOMAD channel bands, mission metadata and the
//! options accepted by [`build_catalog`](crate::build_catalog).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use stac_protocol::{Band, ProjectionExtension, TargetClass};

use crate::error::IngestionError;
use crate::items::CommonMetadata;

/// Root collection defaults.
pub mod defaults {
    pub const COLLECTION_ID: &str = "10-days-lno";
    pub const COLLECTION_DESCRIPTION: &str = "Nomad LNO Samples over 2018";
    pub const LICENSE: &str = "CC-BY-SA-4.0";
    /// Mars (2015) planetocentric frame.
    pub const PROJECTION_CODE: &str = "IAU:2015:49986";
    pub const DISCRIMINANT: &str = "diffraction_order";
}

/// Fixed platform metadata stamped on every item.
pub mod mission {
    pub const PLATFORM: &str = "exomars-trace-gas-orbiter";
    pub const CONSTELLATION: &str = "exomars";
    pub const MISSION: &str = "ExoMars";
    pub const INSTRUMENTS: [&str; 1] = ["NOMAD"];
    pub const TARGET: &str = "mars";
}

/// The three NOMAD spectrometer channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NomadChannel {
    /// Solar Occultation (infrared).
    So,
    /// Limb, Nadir and Occultation (infrared).
    Lno,
    /// Ultraviolet and Visible Spectrometer.
    Uvis,
}

impl NomadChannel {
    pub const ALL: [NomadChannel; 3] = [NomadChannel::So, NomadChannel::Lno, NomadChannel::Uvis];

    pub fn as_str(&self) -> &'static str {
        match self {
            NomadChannel::So => "so",
            NomadChannel::Lno => "lno",
            NomadChannel::Uvis => "uvis",
        }
    }

    /// Spectral window in micrometres.
    pub fn window_um(&self) -> (f64, f64) {
        match self {
            NomadChannel::So => (2.2, 4.3),
            NomadChannel::Lno => (2.2, 3.8),
            // 200-650 nm
            NomadChannel::Uvis => (200.0e-3, 650.0e-3),
        }
    }

    /// The EO band descriptor of this channel.
    pub fn band(&self) -> Band {
        let (min, max) = self.window_um();
        let (name, description) = match self {
            NomadChannel::So => ("SO", "Solar Occultation channel (infrared)"),
            NomadChannel::Lno => ("LNO", "Limb, Nadir and Occultation channel (infrared)"),
            NomadChannel::Uvis => ("UVIS", "Ultraviolet and Visible Spectrometer channel"),
        };
        Band::new(name)
            .with_common_name(self.as_str())
            .with_description(description)
            .with_window(min, max)
    }
}

impl fmt::Display for NomadChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NomadChannel {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "so" => Ok(NomadChannel::So),
            "lno" => Ok(NomadChannel::Lno),
            "uvis" => Ok(NomadChannel::Uvis),
            other => Err(IngestionError::InvalidConfig(format!(
                "unknown NOMAD channel '{}' (expected so, lno or uvis)",
                other
            ))),
        }
    }
}

/// Band descriptors for a set of channels, in the given order.
pub fn bands_for(channels: &[NomadChannel]) -> Vec<Band> {
    channels.iter().map(NomadChannel::band).collect()
}

/// How internal references are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HrefMode {
    /// Relative hrefs and no `self` links; the tree can be moved as a unit.
    #[default]
    SelfContained,
    /// Absolute hrefs and a `self` link on every object.
    Absolute,
}

/// Identity of the root collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionConfig {
    pub id: String,
    pub description: String,
    pub license: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            id: defaults::COLLECTION_ID.to_string(),
            description: defaults::COLLECTION_DESCRIPTION.to_string(),
            license: defaults::LICENSE.to_string(),
        }
    }
}

/// Everything a catalog build needs.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,

    pub catalog_id: String,
    pub catalog_description: String,

    pub collection: CollectionConfig,

    /// Platform metadata stamped on every item.
    pub common: CommonMetadata,

    /// EO bands applied to every item and to the root collection summary.
    pub bands: Vec<Band>,

    /// Field used to partition records into sub-collections; `None`
    /// puts all items directly in the root collection.
    pub discriminant: Option<String>,

    /// Remove existing contents of the output folder before building.
    pub clean_output: bool,

    pub href_mode: HrefMode,

    pub projection: ProjectionExtension,

    pub targets: Vec<String>,
    pub target_class: TargetClass,

    /// Directory that relative asset hrefs are resolved against.
    pub asset_root: Option<PathBuf>,

    /// Build items on the rayon pool.
    pub parallel: bool,
}

impl BuildOptions {
    pub fn new(
        input_folder: impl Into<PathBuf>,
        output_folder: impl Into<PathBuf>,
        catalog_id: impl Into<String>,
        catalog_description: impl Into<String>,
    ) -> Self {
        Self {
            input_folder: input_folder.into(),
            output_folder: output_folder.into(),
            catalog_id: catalog_id.into(),
            catalog_description: catalog_description.into(),
            collection: CollectionConfig::default(),
            common: CommonMetadata::default(),
            bands: bands_for(&[NomadChannel::Lno]),
            discriminant: Some(defaults::DISCRIMINANT.to_string()),
            clean_output: false,
            href_mode: HrefMode::default(),
            projection: ProjectionExtension::code(defaults::PROJECTION_CODE),
            targets: vec![mission::TARGET.to_string()],
            target_class: TargetClass::Planet,
            asset_root: None,
            parallel: true,
        }
    }

    pub fn with_bands(mut self, bands: Vec<Band>) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_discriminant(mut self, field: Option<impl Into<String>>) -> Self {
        self.discriminant = field.map(Into::into);
        self
    }

    pub fn with_clean_output(mut self, clean: bool) -> Self {
        self.clean_output = clean;
        self
    }

    pub fn with_href_mode(mut self, mode: HrefMode) -> Self {
        self.href_mode = mode;
        self
    }

    pub fn with_collection(mut self, collection: CollectionConfig) -> Self {
        self.collection = collection;
        self
    }

    pub fn with_common_metadata(mut self, common: CommonMetadata) -> Self {
        self.common = common;
        self
    }

    pub fn with_projection(mut self, projection: ProjectionExtension) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_asset_root(mut self, root: impl AsRef<Path>) -> Self {
        self.asset_root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_windows() {
        let lno = NomadChannel::Lno.band();
        assert_eq!(lno.name, "LNO");
        assert!((lno.center_wavelength.unwrap() - 3.0).abs() < 1e-9);
        assert!((lno.full_width_half_max.unwrap() - 1.6).abs() < 1e-9);

        let uvis = NomadChannel::Uvis.band();
        assert!((uvis.center_wavelength.unwrap() - 0.425).abs() < 1e-9);
        assert!((uvis.full_width_half_max.unwrap() - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("SO".parse::<NomadChannel>().unwrap(), NomadChannel::So);
        assert_eq!("uvis".parse::<NomadChannel>().unwrap(), NomadChannel::Uvis);
        assert!("acs".parse::<NomadChannel>().is_err());
    }

    #[test]
    fn test_build_options_defaults() {
        let options = BuildOptions::new("in", "out", "nomad", "NOMAD catalog");
        assert_eq!(options.collection.id, "10-days-lno");
        assert_eq!(options.collection.license, "CC-BY-SA-4.0");
        assert_eq!(options.discriminant.as_deref(), Some("diffraction_order"));
        assert_eq!(options.projection.code.as_deref(), Some("IAU:2015:49986"));
        assert_eq!(options.href_mode, HrefMode::SelfContained);
        assert!(!options.clean_output);

        let options = options.with_discriminant(None::<String>);
        assert!(options.discriminant.is_none());
    }
}
