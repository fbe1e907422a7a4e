//! SpatioTemporal Asset Catalog (STAC) protocol types.
//!
//! This crate models the three STAC document kinds (Catalog, Collection and
//! Item) together with the GeoJSON geometry they carry and the metadata
//! extensions used for planetary observations:
//!
//! - Electro-Optical bands (`eo:`)
//! - Solar System targets (`ssys:`)
//! - Projection / reference frame (`proj:`)
//!
//! # Example
//!
//! ```rust
//! use stac_protocol::{Catalog, Collection, Extent};
//! use stac_common::{BoundingBox, TimeRange};
//! use chrono::{TimeZone, Utc};
//!
//! let range = TimeRange::new(
//!     Utc.with_ymd_and_hms(2018, 4, 21, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2018, 4, 30, 0, 0, 0).unwrap(),
//! );
//! let extent = Extent::new(BoundingBox::new(-180.0, -90.0, 180.0, 90.0), range);
//! let collection = Collection::new("10-days-lno", "Nomad LNO Samples over 2018", extent);
//!
//! let mut catalog = Catalog::new("nomad", "NOMAD observations");
//! catalog.add_child(collection).unwrap();
//! assert_eq!(catalog.children.len(), 1);
//! ```

pub mod asset;
pub mod catalog;
pub mod collection;
pub mod errors;
pub mod extensions;
pub mod geojson;
pub mod item;
pub mod types;

pub use asset::Asset;
pub use catalog::Catalog;
pub use collection::Collection;
pub use errors::StacError;
pub use extensions::{
    Band, EoExtension, Extensible, Extension, ExtensionError, ProjectionExtension,
    SsysExtension, TargetClass,
};
pub use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
pub use item::Item;
pub use types::{Extent, Link, Properties, SpatialExtent, TemporalExtent};

/// STAC specification version written into every document.
pub const STAC_VERSION: &str = "1.1.0";

/// Media types used in STAC documents.
pub mod media_types {
    /// JSON media type (catalogs, collections)
    pub const JSON: &str = "application/json";
    /// GeoJSON media type (items)
    pub const GEO_JSON: &str = "application/geo+json";
    /// HDF5 binary data
    pub const HDF5: &str = "application/x-hdf5";
}

/// Link relation types.
pub mod rel {
    pub const ROOT: &str = "root";
    pub const PARENT: &str = "parent";
    pub const CHILD: &str = "child";
    pub const ITEM: &str = "item";
    pub const SELF: &str = "self";
    pub const COLLECTION: &str = "collection";
}
