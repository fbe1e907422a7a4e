//! GeoPackage export through SQLite.

use std::path::Path;

use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::query::Query;
use sqlx::Sqlite;
use stac_common::BoundingBox;
use tracing::debug;

use super::wkb::to_gpkg_blob;
use super::{cell_text, column_kind, ColumnKind, ExportError};
use crate::records::RecordTable;

/// Name of the feature table.
pub const GPKG_TABLE: &str = "data";

const GEOMETRY_COLUMN: &str = "geom";

/// "GPKG" as a big-endian integer.
const APPLICATION_ID: i64 = 0x4750_4B47;
const USER_VERSION: i64 = 10300;

/// Undefined geographic SRS, required by every GeoPackage.
const SRS_ID: i32 = 0;

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Integer => "INTEGER",
        ColumnKind::Real => "REAL",
        ColumnKind::Boolean => "BOOLEAN",
        ColumnKind::Text => "TEXT",
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE gpkg_spatial_ref_sys (
        srs_name TEXT NOT NULL,
        srs_id INTEGER PRIMARY KEY,
        organization TEXT NOT NULL,
        organization_coordsys_id INTEGER NOT NULL,
        definition TEXT NOT NULL,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE gpkg_contents (
        table_name TEXT NOT NULL PRIMARY KEY,
        data_type TEXT NOT NULL,
        identifier TEXT UNIQUE,
        description TEXT DEFAULT '',
        last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        min_x DOUBLE,
        min_y DOUBLE,
        max_x DOUBLE,
        max_y DOUBLE,
        srs_id INTEGER,
        CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
    )
    "#,
    r#"
    CREATE TABLE gpkg_geometry_columns (
        table_name TEXT NOT NULL,
        column_name TEXT NOT NULL,
        geometry_type_name TEXT NOT NULL,
        srs_id INTEGER NOT NULL,
        z TINYINT NOT NULL,
        m TINYINT NOT NULL,
        CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
        CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
        CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
    )
    "#,
    r#"
    INSERT INTO gpkg_spatial_ref_sys
        (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
    VALUES
        ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
        ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system')
    "#,
];

/// Bind one cell according to its column kind.
fn bind_cell<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    kind: ColumnKind,
    value: Option<Value>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match kind {
        ColumnKind::Integer => query.bind(value.as_ref().and_then(Value::as_i64)),
        ColumnKind::Real => query.bind(value.as_ref().and_then(Value::as_f64)),
        ColumnKind::Boolean => query.bind(value.as_ref().and_then(Value::as_bool)),
        ColumnKind::Text => query.bind(value.as_ref().map(cell_text)),
    }
}

/// Write the table as a GeoPackage with a single `data` feature table.
/// An existing file at `path` is replaced.
pub async fn write_geopackage(table: &RecordTable, path: &Path) -> Result<(), ExportError> {
    if path.exists() {
        tokio::fs::remove_file(path).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query(&format!("PRAGMA application_id = {}", APPLICATION_ID))
        .execute(&pool)
        .await?;
    sqlx::query(&format!("PRAGMA user_version = {}", USER_VERSION))
        .execute(&pool)
        .await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    let columns: Vec<(String, ColumnKind)> = table
        .columns()
        .iter()
        .filter(|c| c.as_str() != GEOMETRY_COLUMN && c.as_str() != "fid")
        .map(|c| (c.clone(), column_kind(table, c)))
        .collect();

    let mut definition = vec![
        "fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL".to_string(),
        format!("{} GEOMETRY", GEOMETRY_COLUMN),
    ];
    definition.extend(
        columns
            .iter()
            .map(|(name, kind)| format!("{} {}", quote_ident(name), sql_type(*kind))),
    );
    let create = format!(
        "CREATE TABLE {} ({})",
        quote_ident(GPKG_TABLE),
        definition.join(", ")
    );
    sqlx::query(&create).execute(&pool).await?;

    let bounds = table
        .iter()
        .filter_map(|r| r.bounding_box())
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0));
    sqlx::query(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id) \
         VALUES (?, 'features', ?, ?, ?, ?, ?, ?)",
    )
    .bind(GPKG_TABLE)
    .bind(GPKG_TABLE)
    .bind(bounds.min_x)
    .bind(bounds.min_y)
    .bind(bounds.max_x)
    .bind(bounds.max_y)
    .bind(SRS_ID)
    .execute(&pool)
    .await?;

    sqlx::query(
        "INSERT INTO gpkg_geometry_columns (table_name, column_name, geometry_type_name, srs_id, z, m) \
         VALUES (?, ?, 'GEOMETRY', ?, 0, 0)",
    )
    .bind(GPKG_TABLE)
    .bind(GEOMETRY_COLUMN)
    .bind(SRS_ID)
    .execute(&pool)
    .await?;

    let mut names = vec![GEOMETRY_COLUMN.to_string()];
    names.extend(columns.iter().map(|(name, _)| quote_ident(name)));
    let placeholders = vec!["?"; names.len()].join(", ");
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(GPKG_TABLE),
        names.join(", "),
        placeholders
    );

    let mut tx = pool.begin().await?;
    for record in table {
        let blob = record.geometry.as_ref().map(|g| to_gpkg_blob(g, SRS_ID));
        let mut query = sqlx::query(&insert).bind(blob);
        for (name, kind) in &columns {
            query = bind_cell(query, *kind, record.get(name));
        }
        query.execute(&mut *tx).await?;
    }
    tx.commit().await?;

    debug!(
        path = %path.display(),
        records = table.len(),
        columns = columns.len(),
        "Wrote GeoPackage"
    );
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use stac_protocol::FeatureCollection;
    use tempfile::TempDir;

    fn table(n: usize) -> RecordTable {
        let fc: FeatureCollection = serde_json::from_value(test_utils::feature_collection(
            (0..n).map(|i| test_utils::nomad_feature(i, 134)).collect(),
        ))
        .unwrap();
        RecordTable::from_feature_collection(fc, Path::new("mem")).unwrap()
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("ls"), "\"ls\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn test_geopackage_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.gpkg");
        let table = table(4);

        write_geopackage(&table, &path).await.unwrap();

        let options = SqliteConnectOptions::new().filename(&path);
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();

        let count: i64 = sqlx::query("SELECT COUNT(*) FROM data")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get(0);
        assert_eq!(count, 4);

        let row = sqlx::query("SELECT data_type, srs_id FROM gpkg_contents WHERE table_name = 'data'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>(0), "features");
        assert_eq!(row.get::<i64, _>(1), 0);

        let blob: Vec<u8> = sqlx::query("SELECT geom FROM data ORDER BY fid LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get(0);
        assert_eq!(&blob[0..2], b"GP");

        let lid: String = sqlx::query("SELECT psa_lid FROM data ORDER BY fid LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get(0);
        assert_eq!(lid, test_utils::scene_id(0, 134));
        pool.close().await;
    }

    #[tokio::test]
    async fn test_existing_file_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.gpkg");
        write_geopackage(&table(2), &path).await.unwrap();
        write_geopackage(&table(3), &path).await.unwrap();

        let options = SqliteConnectOptions::new().filename(&path);
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM data")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get(0);
        assert_eq!(count, 3);
        pool.close().await;
    }
}
