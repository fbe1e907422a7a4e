use std::path::Path;

use stac_protocol::FeatureCollection;

use super::ExportError;
use crate::records::RecordTable;

/// Write the table as one GeoJSON FeatureCollection.
pub fn write_geojson(table: &RecordTable, path: &Path) -> Result<(), ExportError> {
    let features = table.iter().map(|r| r.to_feature(table.columns())).collect();
    let mut collection = FeatureCollection::new().with_features(features);
    collection.crs = table.crs().cloned();

    let bytes = serde_json::to_vec(&collection)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::read_file;
    use tempfile::TempDir;

    #[test]
    fn test_geojson_export_reloads() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in.geojson");
        test_utils::write_json(
            &source,
            &test_utils::feature_collection((0..4).map(|i| test_utils::nomad_feature(i, 2)).collect()),
        );
        let table = read_file(&source).unwrap();

        let out = dir.path().join("out.geojson");
        write_geojson(&table, &out).unwrap();
        let reloaded = read_file(&out).unwrap();

        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded.records()[2].id, table.records()[2].id);
        assert_eq!(reloaded.records()[2].utc_end_time, table.records()[2].utc_end_time);
        assert_eq!(
            reloaded.records()[0].property("incidence_angle"),
            table.records()[0].property("incidence_angle")
        );
    }
}
