//! Export of a loaded record table to every supported format.
//!
//! The record table is loaded from a multi-file dataset the same way the
//! catalog build does, then written as shapefile, GeoJSON and GeoPackage.

use ingestion::{export_table, list_formats, load_records, ExportError, ExportFormat};
use ingestion::loader::read_file;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;
use tempfile::TempDir;
use test_utils::{scene_id, ten_scene_input};

#[tokio::test]
async fn test_geojson_export_keeps_all_rows() {
    let input = ten_scene_input();
    let table = load_records(input.path()).unwrap();
    let out = TempDir::new().unwrap();
    let path = out.path().join("analysis/table.geojson");

    export_table(&table, &path, ExportFormat::GeoJson).await.unwrap();

    let reloaded = read_file(&path).unwrap();
    assert_eq!(reloaded.len(), 10);
    assert_eq!(reloaded.columns(), table.columns());
    let ids: Vec<_> = reloaded.iter().map(|r| r.display_id().to_string()).collect();
    assert_eq!(ids[0], scene_id(0, 1));
    assert_eq!(ids[9], scene_id(9, 2));
}

#[tokio::test]
async fn test_shapefile_export_reads_back() {
    let input = ten_scene_input();
    let table = load_records(input.path()).unwrap();
    let out = TempDir::new().unwrap();
    let path = out.path().join("table.shp");

    export_table(&table, &path, ExportFormat::Shapefile).await.unwrap();

    let rows = shapefile::read(&path).unwrap();
    assert_eq!(rows.len(), 10);
    assert!(out.path().join("table.dbf").exists());
}

#[tokio::test]
async fn test_unknown_format_falls_back_to_shapefile() {
    let input = ten_scene_input();
    let table = load_records(input.path()).unwrap();
    let out = TempDir::new().unwrap();
    let path = out.path().join("table.shp");

    let format: ExportFormat = "KML".parse().unwrap();
    assert_eq!(format.resolved(), ExportFormat::Shapefile);
    export_table(&table, &path, format).await.unwrap();
    assert!(out.path().join("table.shx").exists());
}

#[tokio::test]
async fn test_geopackage_export_row_count() {
    let input = ten_scene_input();
    let table = load_records(input.path()).unwrap();
    let out = TempDir::new().unwrap();
    let path = out.path().join("table.gpkg");

    export_table(&table, &path, ExportFormat::GeoPackage).await.unwrap();

    let pool = SqlitePoolOptions::new()
        .connect_with(SqliteConnectOptions::new().filename(&path))
        .await
        .unwrap();
    let count: i64 = sqlx::query("SELECT COUNT(*) FROM data")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 10);

    let orders: Vec<i64> = sqlx::query("SELECT diffraction_order FROM data ORDER BY fid")
        .fetch_all(&pool)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get(0))
        .collect();
    assert_eq!(orders, test_utils::TEN_SCENE_ORDERS.to_vec());
    pool.close().await;
}

#[tokio::test]
async fn test_empty_table_is_rejected() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("empty.geojson");
    test_utils::write_json(&source, &test_utils::feature_collection(Vec::new()));
    let table = read_file(&source).unwrap();

    let err = export_table(&table, &dir.path().join("out.geojson"), ExportFormat::GeoJson)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::EmptyTable));
}

#[test]
fn test_format_listing_covers_exports() {
    let formats = list_formats();
    for format in [
        ExportFormat::Shapefile,
        ExportFormat::GeoJson,
        ExportFormat::GeoPackage,
    ] {
        assert!(formats.iter().any(|f| f.format == format));
    }
}
