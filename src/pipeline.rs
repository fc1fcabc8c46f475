/*!
The per-granule processing pipeline.

A granule is an atomic unit: crop to the configured box, run the detection
cascade, then turn every surviving fire pixel into a [FireRecord]. Granules
with an empty crop, or with no pixel surviving the power gate, simply
produce no records.
*/

use crate::{
    cascade, confidence,
    config::Config,
    granule::{Granule, Scene},
    output::FireRecord,
    power,
};
use log::debug;

/// Run the full detection pipeline for one granule.
pub fn process_granule(granule: &Granule, config: &Config) -> Vec<FireRecord> {
    let scene = match granule.scene(config) {
        Some(scene) => scene,
        None => {
            debug!("{}: bounding box selects no usable pixels", granule.name);
            return Vec::new();
        }
    };

    detect_scene(&scene, config)
}

/// Detect fires in an already-cropped scene.
pub fn detect_scene(scene: &Scene, config: &Config) -> Vec<FireRecord> {
    let detection = cascade::detect(scene, config);

    let mut records = Vec::new();
    for row in 0..scene.rows() {
        for col in 0..scene.cols() {
            if !detection.fires.get(row, col) {
                continue;
            }

            let t_mid = scene.t_mid.get(row, col);
            let bg_mean = detection.t_mid_bg.mean.get(row, col);
            let power_mw = power::fire_radiative_power(
                t_mid,
                bg_mean,
                detection.potential.get(row, col),
            );
            if !power::is_credible_power(power_mw) {
                continue;
            }

            let t_mid_masked = detection.t_mid_masked.get(row, col);
            let mid_mad = detection.t_mid_bg.mad.get(row, col);
            let dt_mean = detection.delta_t_bg.mean.get(row, col);
            let dt_mad = detection.delta_t_bg.mad.get(row, col);

            let z_mid = (t_mid_masked - bg_mean) / mid_mad;
            let z_delta_t = (scene.delta_t.get(row, col) - dt_mean) / dt_mad;

            let conf = confidence::detection_confidence(
                detection.day.get(row, col),
                t_mid_masked,
                z_mid,
                z_delta_t,
                detection.n_cloud_adj.get(row, col),
                detection.n_water_adj.get(row, col),
            );

            records.push(FireRecord {
                line: row + scene.line_offset,
                sample: col + scene.sample_offset,
                lat: scene.lat.get(row, col),
                lon: scene.lon.get(row, col),
                t_mid,
                t_lw: scene.t_lw.get(row, col),
                t_mid_bg_mean: bg_mean,
                t_lw_bg_mean: detection.t_lw_bg.mean.get(row, col),
                delta_t_bg_mean: dt_mean,
                t_mid_bg_mad: mid_mad,
                t_lw_bg_mad: detection.t_lw_bg.mad.get(row, col),
                delta_t_bg_mad: dt_mad,
                power: power_mw,
                adjacent_cloud: detection.n_cloud_adj.get(row, col),
                adjacent_water: detection.n_water_adj.get(row, col),
                valid_neighbors: detection.n_valid.get(row, col),
                confidence: conf,
                area: power::pixel_area_km2(col),
            });
        }
    }

    records
}
