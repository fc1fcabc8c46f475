/*!
Decoded granules and the cropped working scene.

A [Granule] is the full set of co-registered layers handed over by the
upstream decoder, one grid per layer, already converted to brightness
temperatures (K) and scaled reflectances (×1000). A [Scene] is the working
copy the detector runs on: cropped to the configured bounding box, with
saturated mid-IR pixels substituted from the backup band and the
mid-IR/thermal-IR difference field attached.
*/

use crate::{config::Config, grid::Grid};
use chrono::NaiveDateTime;

/// One decoded swath granule.
#[derive(Debug)]
pub struct Granule {
    /// Granule identifier, normally the container file stem.
    pub name: String,

    /// Scan start time recovered from the file name, when present.
    pub scan_time: Option<NaiveDateTime>,

    /// Mid-IR brightness temperature, BAND21 (K). Substitutes for
    /// saturated BAND22 pixels.
    pub t_mid_alt: Grid<f32>,

    /// Mid-IR brightness temperature, BAND22 (K), ≈3.96 μm.
    pub t_mid: Grid<f32>,

    /// Thermal-IR brightness temperature, BAND31 (K), ≈11 μm.
    pub t_lw: Grid<f32>,

    /// Thermal-IR brightness temperature, BAND32 (K), ≈12 μm.
    pub t_lw2: Grid<f32>,

    /// Scaled reflectances ×1000 (BAND1, BAND2, BAND7).
    pub r_vis1: Grid<i32>,
    pub r_vis2: Grid<i32>,
    pub r_swir: Grid<i32>,

    /// 1 = land; everything else is water.
    pub land_mask: Grid<u8>,

    /// Solar zenith angle in centi-degrees.
    pub sol_zen: Grid<f32>,

    /// Solar azimuth, sensor zenith, and sensor azimuth in degrees.
    pub sol_az: Grid<f32>,
    pub sen_zen: Grid<f32>,
    pub sen_az: Grid<f32>,

    /// Geolocation in degrees.
    pub lat: Grid<f32>,
    pub lon: Grid<f32>,
}

impl Granule {
    pub fn rows(&self) -> usize {
        self.t_mid.rows()
    }

    pub fn cols(&self) -> usize {
        self.t_mid.cols()
    }

    /// Crop to the configured bounding box and build the working scene.
    ///
    /// Returns `None` when the box selects fewer than two distinct rows or
    /// columns of the granule; there is nothing to detect in that case.
    pub fn scene(&self, config: &Config) -> Option<Scene> {
        let mut min_row = usize::MAX;
        let mut max_row = 0_usize;
        let mut min_col = usize::MAX;
        let mut max_col = 0_usize;
        let mut any = false;

        for row in 0..self.rows() {
            for col in 0..self.cols() {
                let lat = self.lat.get(row, col) as f64;
                let lon = self.lon.get(row, col) as f64;
                if config.area.contains(lat, lon) {
                    any = true;
                    min_row = min_row.min(row);
                    max_row = max_row.max(row);
                    min_col = min_col.min(col);
                    max_col = max_col.max(col);
                }
            }
        }

        if !any || min_row == max_row || min_col == max_col {
            return None;
        }

        // The crop covers the in-box extent exclusive of the last row and
        // column, the heritage crop rule.
        let rows = min_row..max_row;
        let cols = min_col..max_col;

        let t_mid_alt = self.t_mid_alt.crop(rows.clone(), cols.clone());
        let mut t_mid = self.t_mid.crop(rows.clone(), cols.clone());
        let t_lw = self.t_lw.crop(rows.clone(), cols.clone());

        // Substitute saturated mid-IR pixels from the backup band before
        // anything downstream sees them.
        for row in 0..t_mid.rows() {
            for col in 0..t_mid.cols() {
                if t_mid.get(row, col) >= config.mid_ir_saturation {
                    t_mid.set(row, col, t_mid_alt.get(row, col));
                }
            }
        }

        let mut delta_t = Grid::filled(t_mid.rows(), t_mid.cols(), 0.0_f32);
        for row in 0..delta_t.rows() {
            for col in 0..delta_t.cols() {
                delta_t.set(row, col, (t_mid.get(row, col) - t_lw.get(row, col)).abs());
            }
        }

        Some(Scene {
            t_mid,
            t_lw,
            t_lw2: self.t_lw2.crop(rows.clone(), cols.clone()),
            r_vis1: self.r_vis1.crop(rows.clone(), cols.clone()),
            r_vis2: self.r_vis2.crop(rows.clone(), cols.clone()),
            r_swir: self.r_swir.crop(rows.clone(), cols.clone()),
            land_mask: self.land_mask.crop(rows.clone(), cols.clone()),
            sol_zen: self.sol_zen.crop(rows.clone(), cols.clone()),
            sol_az: self.sol_az.crop(rows.clone(), cols.clone()),
            sen_zen: self.sen_zen.crop(rows.clone(), cols.clone()),
            sen_az: self.sen_az.crop(rows.clone(), cols.clone()),
            lat: self.lat.crop(rows.clone(), cols.clone()),
            lon: self.lon.crop(rows, cols),
            delta_t,
            line_offset: min_row,
            sample_offset: min_col,
        })
    }
}

/// The cropped working copy of a granule.
pub struct Scene {
    /// Mid-IR brightness temperature with saturation substitution applied.
    pub t_mid: Grid<f32>,
    pub t_lw: Grid<f32>,
    pub t_lw2: Grid<f32>,
    pub r_vis1: Grid<i32>,
    pub r_vis2: Grid<i32>,
    pub r_swir: Grid<i32>,
    pub land_mask: Grid<u8>,
    pub sol_zen: Grid<f32>,
    pub sol_az: Grid<f32>,
    pub sen_zen: Grid<f32>,
    pub sen_az: Grid<f32>,
    pub lat: Grid<f32>,
    pub lon: Grid<f32>,

    /// `|T_mid − T_lw|`, K.
    pub delta_t: Grid<f32>,

    /// Crop offsets back into the uncropped granule.
    pub line_offset: usize,
    pub sample_offset: usize,
}

impl Scene {
    pub fn rows(&self) -> usize {
        self.t_mid.rows()
    }

    pub fn cols(&self) -> usize {
        self.t_mid.cols()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub const TEST_ROWS: usize = 10;
    pub const TEST_COLS: usize = 10;

    /// A 10×10 daytime land granule with a uniform, mild background, every
    /// pixel inside the default bounding box.
    pub fn test_granule() -> Granule {
        let mut lat = Grid::filled(TEST_ROWS, TEST_COLS, 0.0_f32);
        let mut lon = Grid::filled(TEST_ROWS, TEST_COLS, 0.0_f32);
        for row in 0..TEST_ROWS {
            for col in 0..TEST_COLS {
                lat.set(row, col, 65.05 + 0.04 * row as f32);
                lon.set(row, col, -147.9 + 0.18 * col as f32);
            }
        }

        Granule {
            name: "TEST.A2016257.2055".to_string(),
            scan_time: None,
            t_mid_alt: Grid::filled(TEST_ROWS, TEST_COLS, 289.0),
            t_mid: Grid::filled(TEST_ROWS, TEST_COLS, 290.0),
            t_lw: Grid::filled(TEST_ROWS, TEST_COLS, 285.0),
            t_lw2: Grid::filled(TEST_ROWS, TEST_COLS, 285.0),
            r_vis1: Grid::filled(TEST_ROWS, TEST_COLS, 100),
            r_vis2: Grid::filled(TEST_ROWS, TEST_COLS, 100),
            r_swir: Grid::filled(TEST_ROWS, TEST_COLS, 100),
            land_mask: Grid::filled(TEST_ROWS, TEST_COLS, 1),
            sol_zen: Grid::filled(TEST_ROWS, TEST_COLS, 1000.0),
            sol_az: Grid::filled(TEST_ROWS, TEST_COLS, 0.0),
            sen_zen: Grid::filled(TEST_ROWS, TEST_COLS, 0.0),
            sen_az: Grid::filled(TEST_ROWS, TEST_COLS, 0.0),
            lat,
            lon,
        }
    }

    /// Build a scene from the test granule after applying `edit` to it.
    pub fn scene_with(edit: impl FnOnce(&mut Granule)) -> Scene {
        let mut granule = test_granule();
        edit(&mut granule);
        granule
            .scene(&Config::default())
            .expect("test granule must crop to a scene")
    }
}

#[cfg(test)]
mod test {
    use super::test_support::*;
    use super::*;
    use crate::geo::{BoundingBox, Coord};

    #[test]
    fn test_crop_offsets_and_shape() {
        let granule = test_granule();
        let scene = granule.scene(&Config::default()).unwrap();

        // The heritage crop drops the last in-box row and column.
        assert_eq!(scene.rows(), TEST_ROWS - 1);
        assert_eq!(scene.cols(), TEST_COLS - 1);
        assert_eq!(scene.line_offset, 0);
        assert_eq!(scene.sample_offset, 0);
    }

    #[test]
    fn test_empty_crop() {
        let granule = test_granule();

        let mut config = Config::default();
        config.area = BoundingBox {
            ll: Coord { lat: 0.0, lon: 0.0 },
            ur: Coord { lat: 1.0, lon: 1.0 },
        };

        assert!(granule.scene(&config).is_none());
    }

    #[test]
    fn test_single_point_crop_is_empty() {
        let granule = test_granule();

        // A box tight around one pixel selects a single row and column.
        let mut config = Config::default();
        config.area = BoundingBox {
            ll: Coord {
                lat: 65.04,
                lon: -147.91,
            },
            ur: Coord {
                lat: 65.06,
                lon: -147.89,
            },
        };

        assert!(granule.scene(&config).is_none());
    }

    #[test]
    fn test_saturation_substitution() {
        let scene = scene_with(|granule| {
            granule.t_mid.set(4, 4, 335.0);
            granule.t_mid_alt.set(4, 4, 370.0);
        });

        assert_eq!(scene.t_mid.get(4, 4), 370.0);
        // Delta-T is built from the substituted value.
        assert!((scene.delta_t.get(4, 4) - 85.0).abs() < 1.0e-4);
    }

    #[test]
    fn test_below_saturation_not_substituted() {
        let scene = scene_with(|granule| {
            granule.t_mid.set(4, 4, 330.9);
            granule.t_mid_alt.set(4, 4, 370.0);
        });

        assert_eq!(scene.t_mid.get(4, 4), 330.9);
    }
}
