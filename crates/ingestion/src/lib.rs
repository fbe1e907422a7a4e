//! NOMAD observation record ingestion.
//!
//! Turns folders of per-scene GeoJSON records from the NOMAD spectrometer
//! (ExoMars Trace Gas Orbiter) into a STAC catalog, and exports the unified
//! record table to common GIS formats.
//!
//! # Architecture
//!
//! - [`loader`] reads every `*.geojson`/`*.json` file into one [`RecordTable`]
//! - [`extent`] aggregates spatial and temporal bounds
//! - [`items`] maps a record to a STAC item with its data asset
//! - [`annotate`] applies the EO, solar-system and projection extensions
//! - [`assembler`] groups records into collections and drives the build
//! - [`layout`] and [`writer`] normalize hrefs and persist the tree
//! - [`export`] writes the record table as shapefile, GeoJSON or GeoPackage

pub mod annotate;
pub mod assembler;
pub mod config;
pub mod error;
pub mod export;
pub mod extent;
pub mod items;
pub mod layout;
pub mod loader;
pub mod records;
pub mod writer;

// Re-exports
pub use annotate::{local_time, ExtensionApplicator};
pub use assembler::{build_catalog, sub_collection_id, CatalogCreator};
pub use config::{bands_for, BuildOptions, CollectionConfig, HrefMode, NomadChannel};
pub use error::{BuildError, BuildStage, IngestionError, IntegrityKind, Result};
pub use export::{export_table, list_formats, ExportError, ExportFormat, FormatInfo};
pub use extent::{aggregate, Spatiotemporal};
pub use items::{CommonMetadata, ItemBuilder, DATA_ASSET};
pub use loader::load_records;
pub use records::{ObservationRecord, Partition, RecordTable};
pub use writer::{read_catalog, write_catalog};
