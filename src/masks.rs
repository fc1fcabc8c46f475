/*!
Scene classification masks.

Pointwise day/water/cloud/background-candidate masks and the sentinel
overlays that thread them through the neighborhood filters. Overlays are
always applied in water → cloud → background-candidate order, so every
pixel ends up with exactly one primary classification.
*/

use crate::{config::Config, flags, granule::Scene, grid::Grid};

/// Solar zenith values below this (centi-degrees) count as daytime.
pub const DAY_SOLAR_ZENITH: f32 = 8500.0;

/// One entry per pixel for each of the four scene classifications.
pub struct Masks {
    pub day: Grid<bool>,
    pub water: Grid<bool>,
    pub cloud: Grid<bool>,
    pub bg_candidate: Grid<bool>,
}

impl Masks {
    /// Classify every pixel of the scene.
    ///
    /// All threshold comparisons treat NaN as false, so a NaN input pixel
    /// is night, land, clear, and not a background candidate.
    pub fn build(scene: &Scene, config: &Config) -> Self {
        let rows = scene.rows();
        let cols = scene.cols();
        let r = config.reduction_factor;

        let mut day = Grid::filled(rows, cols, false);
        let mut water = Grid::filled(rows, cols, false);
        let mut cloud = Grid::filled(rows, cols, false);
        let mut bg_candidate = Grid::filled(rows, cols, false);

        for row in 0..rows {
            for col in 0..cols {
                let is_day = scene.sol_zen.get(row, col) < DAY_SOLAR_ZENITH;
                day.set(row, col, is_day);

                water.set(row, col, scene.land_mask.get(row, col) != 1);

                let refl_sum = scene.r_vis1.get(row, col) + scene.r_vis2.get(row, col);
                let t_lw2 = scene.t_lw2.get(row, col);
                let is_cloud =
                    refl_sum > 900 || t_lw2 < 265.0 || (refl_sum > 700 && t_lw2 < 285.0);
                cloud.set(row, col, is_cloud);

                let t_mid = scene.t_mid.get(row, col);
                let delta_t = scene.delta_t.get(row, col);
                let is_bg_candidate = if is_day {
                    t_mid > 325.0 * r && delta_t > 20.0 * r
                } else {
                    t_mid > 310.0 * r && delta_t > 10.0 * r
                };
                bg_candidate.set(row, col, is_bg_candidate);
            }
        }

        Masks {
            day,
            water,
            cloud,
            bg_candidate,
        }
    }

    /// Overlay the masks onto a radiometric field.
    ///
    /// Water, then cloud, then (optionally) background candidates overwrite
    /// the field with their sentinels.
    pub fn overlay(&self, field: &Grid<f32>, with_bg_candidates: bool) -> Grid<f32> {
        let mut out = field.clone();

        for row in 0..out.rows() {
            for col in 0..out.cols() {
                if self.water.get(row, col) {
                    out.set(row, col, flags::WATER);
                }
                if self.cloud.get(row, col) {
                    out.set(row, col, flags::CLOUD);
                }
                if with_bg_candidates && self.bg_candidate.get(row, col) {
                    out.set(row, col, flags::BG_CANDIDATE);
                }
            }
        }

        out
    }

    /// Keep the field only at background-candidate pixels; everything else
    /// becomes the candidate sentinel. This is the field the
    /// rejected-background statistics run on.
    pub fn bg_candidates_only(&self, field: &Grid<f32>) -> Grid<f32> {
        let mut out = field.clone();

        for row in 0..out.rows() {
            for col in 0..out.cols() {
                if !self.bg_candidate.get(row, col) {
                    out.set(row, col, flags::BG_CANDIDATE);
                }
            }
        }

        out
    }

    /// A sentinel field with `flag` where the mask is set and zero elsewhere,
    /// shaped for the flag counters.
    pub fn flag_field(mask: &Grid<bool>, flag: f32) -> Grid<f32> {
        mask.map(|set| if set { flag } else { 0.0 })
    }
}
