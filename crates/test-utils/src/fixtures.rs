//! Synthetic NOMAD scene records.
//!
//! Features mimic the per-scene GeoJSON exported for calibrated LNO
//! observations: a short ground-track line, UTC start/end times and the
//! geometry/housekeeping columns of the product.

use serde_json::{json, Value};

/// Martian year of the April 2018 observations.
pub const MARTIAN_YEAR: i64 = 34;

/// Identifier (`psa_lid`) of scene `index` in diffraction order `order`.
pub fn scene_id(index: usize, order: i64) -> String {
    format!(
        "nmd_cal_sc_lno_201804{:02}t{:02}0000_{:03}_{}",
        21 + index / 24,
        index % 24,
        index,
        order
    )
}

/// Footprint start position of scene `index`.
pub fn scene_origin(index: usize) -> [f64; 2] {
    [-60.0 + 7.0 * index as f64, -40.0 + 3.0 * index as f64]
}

/// A NOMAD scene feature. Scene `index` starts `index` hours after
/// 2018-04-21T00:00 and lasts four and a half minutes.
pub fn nomad_feature(index: usize, order: i64) -> Value {
    let id = scene_id(index, order);
    let [lon, lat] = scene_origin(index);
    let day = 21 + index / 24;
    let hour = index % 24;
    let step = index as f64;

    json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": [[lon, lat], [lon + 1.5, lat + 2.0]]
        },
        "properties": {
            "psa_lid": id,
            "utc_start_time": format!("2018-04-{:02} {:02}:00:00", day, hour),
            "utc_end_time": format!("2018-04-{:02}T{:02}:04:30Z", day, hour),
            "diffraction_order": order,
            "hdf5_filename": format!("{}.h5", id),
            "spec_ix": index,
            "incidence_angle": 30.5 + step,
            "emergence_angle": 10.25 + step,
            "phase_angle": 40.75 + step,
            "centre_latitude": lat + 1.0,
            "centre_longitude": lon + 0.75,
            "channel_temperature": -5.5 + 0.25 * step,
            "martian_year": MARTIAN_YEAR,
            "ls": 163.0 + 0.25 * step,
            "local_solar_time": 13.5 + 0.25 * step
        }
    })
}

/// Wrap features in a FeatureCollection.
pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features
    })
}

/// Diffraction orders of the ten-scene dataset: six scenes of order 1 and
/// four of order 2, interleaved.
pub const TEN_SCENE_ORDERS: [i64; 10] = [1, 2, 1, 1, 2, 1, 2, 1, 1, 2];
