//! Catalog assembly.
//!
//! A build walks through the stages of [`BuildStage`]:
//!
//! ```text
//! EMPTY -> LOADING -> GROUPING -> BUILDING_COLLECTIONS -> LINKING
//!       -> NORMALIZING -> PERSISTED
//! ```
//!
//! Any failure moves the creator to `ABORTED` and is reported as a
//! [`BuildError`] carrying the stage it happened in.

use std::path::PathBuf;

use rayon::prelude::*;
use stac_protocol::{Catalog, Collection, Item};
use tracing::{debug, error, info, warn};

use crate::annotate::ExtensionApplicator;
use crate::config::BuildOptions;
use crate::error::{BuildError, BuildStage, IngestionError};
use crate::extent;
use crate::items::ItemBuilder;
use crate::layout::HrefNormalizer;
use crate::loader;
use crate::records::{ObservationRecord, Partition, RecordTable};
use crate::writer;

/// Result of a single build step.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Collection id for a discriminant value: `diffraction_order` and `134`
/// give `diffraction-order-134`.
pub fn sub_collection_id(field: &str, key: &str) -> String {
    format!("{}-{}", field.replace('_', "-"), key)
}

/// Step-by-step catalog builder.
pub struct CatalogCreator {
    options: BuildOptions,
    stage: BuildStage,
    builder: ItemBuilder,
    applicator: ExtensionApplicator,
}

impl CatalogCreator {
    pub fn new(options: BuildOptions) -> Self {
        let applicator = ExtensionApplicator::new(
            options.bands.clone(),
            options.projection.clone(),
            options.targets.clone(),
            options.target_class,
        );
        let builder = ItemBuilder::new(options.common.clone());
        Self {
            options,
            stage: BuildStage::Empty,
            builder,
            applicator,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// The current stage.
    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    fn enter(&mut self, stage: BuildStage) {
        debug!(from = %self.stage, to = %stage, "Build stage transition");
        self.stage = stage;
    }

    fn abort(&mut self, error: BuildError) -> BuildError {
        error!(
            stage = %error.stage,
            record = error.record_id.as_deref().unwrap_or("-"),
            error = %error.source,
            "Catalog build aborted"
        );
        self.stage = BuildStage::Aborted;
        error
    }

    fn fail(&mut self, source: IngestionError) -> BuildError {
        let error = BuildError::new(self.stage, source);
        self.abort(error)
    }

    /// Run the whole pipeline.
    pub fn create_catalog(&mut self) -> BuildResult<Catalog> {
        self.check_preconditions()?;
        let table = self.load()?;
        let mut catalog = self.assemble(&table)?;
        self.persist(&mut catalog)?;
        Ok(catalog)
    }

    /// Input must hold eligible files; output must be empty or cleared.
    pub fn check_preconditions(&mut self) -> BuildResult<()> {
        let input = self.options.input_folder.clone();
        let output = self.options.output_folder.clone();

        let files = match loader::input_files(&input) {
            Ok(files) => files,
            Err(IngestionError::Io { .. }) if !input.exists() => Vec::new(),
            Err(e) => return Err(self.fail(e)),
        };
        if files.is_empty() {
            warn!(folder = %input.display(), "Input folder holds no *.geojson or *.json files");
            return Err(self.fail(IngestionError::EmptyInput(input)));
        }

        if let Err(e) = writer::prepare_output(&output, self.options.clean_output) {
            return Err(self.fail(e));
        }

        info!(
            input = %input.display(),
            output = %output.display(),
            files = files.len(),
            "Preconditions satisfied"
        );
        Ok(())
    }

    /// Load the unified record table.
    pub fn load(&mut self) -> BuildResult<RecordTable> {
        self.enter(BuildStage::Loading);
        let input = self.options.input_folder.clone();
        loader::load_records(&input).map_err(|e| self.fail(e))
    }

    /// Group, build collections and items, and link the tree.
    pub fn assemble(&mut self, table: &RecordTable) -> BuildResult<Catalog> {
        self.enter(BuildStage::Grouping);
        if table.is_empty() {
            let input = self.options.input_folder.clone();
            return Err(self.fail(IngestionError::EmptyInput(input)));
        }
        table.check_unique_ids().map_err(|e| self.fail(e))?;

        let discriminant = self.options.discriminant.clone();
        let partitions = table
            .partition_by(discriminant.as_deref())
            .map_err(|e| self.fail(e))?;

        let root_extent = match extent::aggregate(table) {
            Some(extent) => extent,
            None => return Err(self.fail(IngestionError::MissingField("geometry".to_string()))),
        };
        let config = self.options.collection.clone();
        let mut root = Collection::new(&config.id, &config.description, root_extent)
            .with_license(&config.license);
        self.applicator
            .annotate_collection(&mut root)
            .and_then(|_| ExtensionApplicator::validate_collection(&root))
            .map_err(|e| self.fail(e))?;
        info!(
            collection = %root.id,
            partitions = partitions.len(),
            records = table.len(),
            "Grouped records"
        );

        self.enter(BuildStage::BuildingCollections);
        let mut subs = Vec::new();
        for partition in &partitions {
            let items = self.build_items(&partition.records)?;
            match (&partition.key, discriminant.as_deref()) {
                (Some(key), Some(field)) => {
                    let sub = self.build_sub_collection(field, key, partition, items, &config.license)?;
                    subs.push(sub);
                }
                _ => {
                    for item in items {
                        root.add_item(item).map_err(|e| self.fail(e.into()))?;
                    }
                }
            }
        }

        self.enter(BuildStage::Linking);
        for sub in subs {
            root.add_child(sub).map_err(|e| self.fail(e.into()))?;
        }
        let mut catalog = Catalog::new(&self.options.catalog_id, &self.options.catalog_description);
        catalog.add_child(root).map_err(|e| self.fail(e.into()))?;

        info!(
            catalog = %catalog.id,
            items = catalog.all_items().len(),
            "Catalog assembled"
        );
        Ok(catalog)
    }

    fn build_sub_collection(
        &mut self,
        field: &str,
        key: &str,
        partition: &Partition<'_>,
        items: Vec<Item>,
        license: &str,
    ) -> BuildResult<Collection> {
        let id = sub_collection_id(field, key);
        let extent = match extent::aggregate(partition.records.iter().copied()) {
            Some(extent) => extent,
            None => return Err(self.fail(IngestionError::MissingField("geometry".to_string()))),
        };
        let description = format!("Observations with {} = {}", field, key);
        let mut collection = Collection::new(&id, description, extent).with_license(license);
        self.applicator
            .annotate_collection(&mut collection)
            .and_then(|_| ExtensionApplicator::validate_collection(&collection))
            .map_err(|e| self.fail(e))?;

        let count = items.len();
        for item in items {
            collection.add_item(item).map_err(|e| self.fail(e.into()))?;
        }
        info!(collection = %id, items = count, "Built sub-collection");
        Ok(collection)
    }

    /// Build, annotate and validate the items of one partition, in row
    /// order. The first failing row aborts the build.
    fn build_items(&mut self, records: &[&ObservationRecord]) -> BuildResult<Vec<Item>> {
        let builder = &self.builder;
        let applicator = &self.applicator;
        let build = |record: &&ObservationRecord| build_item(builder, applicator, record);

        let results: Vec<std::result::Result<Item, IngestionError>> = if self.options.parallel {
            records.par_iter().map(build).collect()
        } else {
            records.iter().map(build).collect()
        };

        let mut items = Vec::with_capacity(results.len());
        for (record, result) in records.iter().zip(results) {
            match result {
                Ok(item) => items.push(item),
                Err(e) => {
                    let error = BuildError::new(self.stage, e).with_record(record.display_id());
                    return Err(self.abort(error));
                }
            }
        }
        Ok(items)
    }

    /// Normalize hrefs for the output folder and write every document.
    pub fn persist(&mut self, catalog: &mut Catalog) -> BuildResult<Vec<PathBuf>> {
        self.enter(BuildStage::Normalizing);
        let output = self.options.output_folder.clone();
        let normalized = HrefNormalizer::new(
            &output,
            self.options.href_mode,
            self.options.asset_root.as_deref(),
        )
        .and_then(|normalizer| normalizer.normalize(catalog));
        if let Err(e) = normalized {
            return Err(self.fail(e));
        }

        let written = match writer::write_catalog(catalog, &output) {
            Ok(written) => written,
            Err(e) => {
                let error = BuildError::new(BuildStage::Persisted, e);
                return Err(self.abort(error));
            }
        };
        self.enter(BuildStage::Persisted);
        info!(
            output = %output.display(),
            files = written.len(),
            "Catalog created"
        );
        Ok(written)
    }
}

fn build_item(
    builder: &ItemBuilder,
    applicator: &ExtensionApplicator,
    record: &ObservationRecord,
) -> std::result::Result<Item, IngestionError> {
    let mut item = builder.build(record)?;
    applicator.annotate_item(&mut item, record)?;
    ExtensionApplicator::validate_item(&item)?;
    Ok(item)
}

/// Build and persist a catalog in one call.
pub fn build_catalog(options: &BuildOptions) -> BuildResult<Catalog> {
    CatalogCreator::new(options.clone()).create_catalog()
}
