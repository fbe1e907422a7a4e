//! Helpers that write record datasets to disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use crate::fixtures::{feature_collection, nomad_feature, TEN_SCENE_ORDERS};

/// Write `value` as JSON, creating parent directories.
pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    let bytes = serde_json::to_vec_pretty(value).expect("serialize fixture");
    fs::write(path, bytes).expect("write fixture");
}

/// Write one `scenes_NN.geojson` FeatureCollection per chunk.
pub fn write_dataset(dir: &Path, chunks: Vec<Vec<Value>>) -> Vec<PathBuf> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(n, features)| {
            let path = dir.join(format!("scenes_{:02}.geojson", n));
            write_json(&path, &feature_collection(features));
            path
        })
        .collect()
}

/// Ten scenes in three files (4, 3 and 3 scenes), diffraction orders as
/// in [`TEN_SCENE_ORDERS`].
pub fn write_ten_scene_dataset(dir: &Path) -> Vec<PathBuf> {
    let mut features: Vec<Value> = TEN_SCENE_ORDERS
        .iter()
        .enumerate()
        .map(|(i, order)| nomad_feature(i, *order))
        .collect();
    let third = features.split_off(7);
    let second = features.split_off(4);
    write_dataset(dir, vec![features, second, third])
}

/// A temporary input folder holding the ten-scene dataset.
pub fn ten_scene_input() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    write_ten_scene_dataset(dir.path());
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_scene_dataset_files() {
        let dir = ten_scene_input();
        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["scenes_00.geojson", "scenes_01.geojson", "scenes_02.geojson"]
        );
    }
}
