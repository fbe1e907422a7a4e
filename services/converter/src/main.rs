//! NOMAD to STAC converter.
//!
//! Command line entry point:
//! - Builds STAC catalogs from folders of NOMAD observation records
//! - Downloads and unpacks raw record archives
//! - Exports the unified record table for analysis (shapefile, GeoJSON, GeoPackage)
//! - Collects and queries planetary WKT projections

mod config;
mod download;
mod wkt;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ingestion::{
    bands_for, export_table, list_formats, load_records, BuildError, BuildOptions,
    CatalogCreator, ExportFormat, HrefMode, NomadChannel, RecordTable,
};

use config::{resolve_folder, DataFolders};

#[derive(Parser, Debug)]
#[command(name = "nomad-stac")]
#[command(about = "Converts NOMAD observation records into STAC catalogs")]
struct Args {
    /// Log level
    #[arg(long, env = "NOMAD_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a catalog from an input folder
    CreateStacCatalog(CreateArgs),

    /// Downloads (and unzips) FILE_NAME into the input folder
    DownloadFromFile {
        /// Local path or URL of the data
        file_name: String,

        /// The folder to put the downloaded data in
        #[arg(long)]
        output_folder: Option<PathBuf>,
    },

    /// Writes the unified record table to FILE_NAME in the analysis folder
    FormatDataForAnalysis {
        /// Name of the intermediate file
        file_name: PathBuf,

        /// Format of the intermediate file
        #[arg(short, long, value_enum)]
        format: FormatArg,

        /// The folder holding the raw data
        #[arg(short = 'I', long)]
        input_folder: Option<PathBuf>,

        /// The folder to put the file in
        #[arg(short = 'O', long)]
        output_folder: Option<PathBuf>,
    },

    /// Shows the available formats for saving
    ShowPossibleFormats,

    /// Downloads WKT projections of the solar system into FILE_NAME (CSV)
    DownloadWktFiles {
        file_name: PathBuf,
    },

    /// Prints the projections of a WKT summary file
    ShowWktProjections {
        file_name: PathBuf,

        /// Keep bodies whose name contains this text
        #[arg(long = "solar-body", short = 's')]
        solar_body: Option<String>,

        /// Keep projections whose name matches every keyword
        #[arg(long = "keywords", short = 'k', num_args = 1..)]
        keywords: Vec<String>,
    },
}

#[derive(ClapArgs, Debug)]
struct CreateArgs {
    /// The ID of the catalog
    #[arg(long = "id")]
    catalog_id: String,

    /// A short description of the catalog
    #[arg(long = "desc", short = 'd')]
    catalog_description: String,

    /// The NOMAD channels described by the catalog
    #[arg(long, short = 'b', value_enum, num_args = 1.., required = true)]
    bands: Vec<BandArg>,

    /// Remove a previous catalog from the output folder
    #[arg(long)]
    clean: bool,

    /// The folder where the raw data is located
    #[arg(short = 'I', long)]
    input_folder: Option<PathBuf>,

    /// The folder to put the STAC catalog in
    #[arg(short = 'O', long)]
    output_folder: Option<PathBuf>,

    /// Property whose values split the records into sub-collections
    #[arg(long, default_value = "diffraction_order", conflicts_with = "no_group")]
    group_by: String,

    /// Put every item directly in the root collection
    #[arg(long)]
    no_group: bool,

    /// Write absolute hrefs and self links instead of relative ones
    #[arg(long)]
    absolute: bool,

    /// Folder that relative data file names resolve against
    #[arg(long)]
    asset_root: Option<PathBuf>,

    /// Also export the record table to this file in the analysis folder
    #[arg(long, requires = "format")]
    intermediate: Option<PathBuf>,

    /// Format of the intermediate file
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BandArg {
    So,
    Lno,
    Uvis,
}

impl From<BandArg> for NomadChannel {
    fn from(band: BandArg) -> Self {
        match band {
            BandArg::So => NomadChannel::So,
            BandArg::Lno => NomadChannel::Lno,
            BandArg::Uvis => NomadChannel::Uvis,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Shp,
    Geojson,
    Gpkg,
    Other,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Shp => ExportFormat::Shapefile,
            FormatArg::Geojson => ExportFormat::GeoJson,
            FormatArg::Gpkg => ExportFormat::GeoPackage,
            FormatArg::Other => ExportFormat::Other,
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let folders = DataFolders::from_env()?;

    match args.command {
        Command::CreateStacCatalog(create) => create_stac_catalog(create, &folders).await,
        Command::DownloadFromFile {
            file_name,
            output_folder,
        } => {
            let output = resolve_folder(output_folder, &folders.raw);
            download::download_from_file(&file_name, &output).await
        }
        Command::FormatDataForAnalysis {
            file_name,
            format,
            input_folder,
            output_folder,
        } => {
            let input = resolve_folder(input_folder, &folders.raw);
            let output = resolve_folder(output_folder, &folders.analysis);
            format_data_for_analysis(&input, &output.join(file_name), format.into()).await
        }
        Command::ShowPossibleFormats => {
            show_possible_formats();
            Ok(())
        }
        Command::DownloadWktFiles { file_name } => {
            wkt::WktDownloader::new()?.download(&file_name).await?;
            Ok(())
        }
        Command::ShowWktProjections {
            file_name,
            solar_body,
            keywords,
        } => show_wkt_projections(&file_name, solar_body.as_deref(), &keywords),
    }
}

async fn create_stac_catalog(args: CreateArgs, folders: &DataFolders) -> Result<()> {
    let input = resolve_folder(args.input_folder, &folders.raw);
    let output = resolve_folder(args.output_folder, &folders.processed);
    let channels: Vec<NomadChannel> = args.bands.iter().map(|b| (*b).into()).collect();
    let discriminant = (!args.no_group).then_some(args.group_by);

    let mut options = BuildOptions::new(
        &input,
        &output,
        args.catalog_id,
        args.catalog_description,
    )
    .with_bands(bands_for(&channels))
    .with_discriminant(discriminant)
    .with_clean_output(args.clean)
    .with_href_mode(if args.absolute {
        HrefMode::Absolute
    } else {
        HrefMode::SelfContained
    });
    if let Some(root) = &args.asset_root {
        options = options.with_asset_root(root);
    }

    info!(
        id = %options.catalog_id,
        input = %input.display(),
        output = %output.display(),
        "Creating STAC catalog"
    );

    // The build is synchronous and fans out on the rayon pool
    let (mut creator, table) = tokio::task::spawn_blocking(move || {
        let mut creator = CatalogCreator::new(options);
        creator.check_preconditions()?;
        let table = creator.load()?;
        Ok::<_, BuildError>((creator, table))
    })
    .await
    .context("Catalog loading task panicked")??;

    // The intermediate file holds exactly the rows the catalog is built from
    if let (Some(file), Some(format)) = (args.intermediate, args.format) {
        let path = folders.analysis.join(file);
        write_table(&table, &path, format.into()).await?;
    }

    let catalog = tokio::task::spawn_blocking(move || {
        let mut catalog = creator.assemble(&table)?;
        creator.persist(&mut catalog)?;
        Ok::<_, BuildError>(catalog)
    })
    .await
    .context("Catalog build task panicked")??;

    info!(
        collections = catalog.all_collections().len(),
        items = catalog.all_items().len(),
        output = %output.display(),
        "Catalog created"
    );
    Ok(())
}

fn with_default_extension(path: &Path, format: ExportFormat) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(format.extension())
    }
}

async fn format_data_for_analysis(input: &Path, path: &Path, format: ExportFormat) -> Result<()> {
    let source = input.to_path_buf();
    let table = tokio::task::spawn_blocking(move || load_records(&source))
        .await
        .context("Loading task panicked")?
        .with_context(|| format!("Couldn't parse {} as a unified record table", input.display()))?;

    write_table(&table, path, format).await
}

async fn write_table(table: &RecordTable, path: &Path, format: ExportFormat) -> Result<()> {
    let path = with_default_extension(path, format);
    export_table(table, &path, format)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {} records to {}", table.len(), path.display());
    Ok(())
}

fn show_possible_formats() {
    println!("Available formats");
    println!("{:<12} {:<16} {:<10} {}", "Format", "Driver", "Extension", "Permission");
    for info in list_formats() {
        println!(
            "{:<12} {:<16} {:<10} {}",
            info.format.to_string(),
            info.driver,
            info.extension,
            info.capability
        );
    }
}

fn show_wkt_projections(file: &Path, solar_body: Option<&str>, keywords: &[String]) -> Result<()> {
    let projections = wkt::read_projections(file)?;
    let selected = wkt::filter_projections(&projections, solar_body, keywords)?;
    if selected.is_empty() {
        return Err(anyhow!("No projection matches the given filters"));
    }
    for projection in selected {
        println!("{}", wkt::render_projection(projection));
    }
    Ok(())
}
