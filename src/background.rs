/*!
Adaptive variable-radius background statistics.

For every pixel the filters look for "enough" valid neighbors inside a
hollow-cross window, starting with the smallest window size and growing by
two cells per side at a time. A pixel keeps the statistics of the smallest
window that succeeds; a pixel no window satisfies keeps the unset sentinel.
The context counters follow the same fill-from-the-next-window rule.

Heterogeneous scenes often leave the small, fast window starved of valid
background. Widening the window recovers signal, while the exclusion cross
keeps the candidate pixel and its along-scan neighbors from contaminating
their own background estimate.
*/

use crate::{
    config::Config,
    flags::{self, Flag},
    footprint::footprint,
    grid::Grid,
};

/// Counter cells where no window size produced an answer.
pub const UNSET_COUNT: i32 = -4;

/// Per-pixel mean and mean absolute deviation of the valid background.
#[derive(Debug, Clone)]
pub struct BackgroundStats {
    pub mean: Grid<f32>,
    pub mad: Grid<f32>,
}

/// Compute the mean and MAD of the valid neighbors around every pixel.
///
/// A pixel whose own value carries the water or cloud sentinel is not
/// processed at all; background-candidate pixels are (fires still need a
/// background estimated around them). A window succeeds when it holds
/// strictly more than `min_ncount` valid neighbors and strictly more than
/// `min_nfrac` of the window area. Both outputs stay at the unset sentinel
/// wherever every window fails, and one output is unset exactly when the
/// other is.
pub fn mean_mad_filter(field: &Grid<f32>, config: &Config) -> BackgroundStats {
    let rows = field.rows();
    let cols = field.cols();

    let mut mean = Grid::filled(rows, cols, flags::UNSET);
    let mut mad = Grid::filled(rows, cols, flags::UNSET);

    let mut neighbors: Vec<f32> = Vec::with_capacity(config.max_ksize * config.max_ksize);

    for ksize in config.window_sizes() {
        let fp = footprint(ksize);
        let half = (ksize / 2) as isize;
        let min_frac_count = config.min_nfrac * (ksize * ksize) as f32;

        for row in 0..rows {
            for col in 0..cols {
                let center = field.get(row, col);
                if center == flags::WATER || center == flags::CLOUD {
                    continue;
                }
                if !flags::is_unset(mean.get(row, col)) {
                    // A smaller window already succeeded here.
                    continue;
                }

                neighbors.clear();
                for dr in -half..=half {
                    for dc in -half..=half {
                        if fp.is_excluded((dr + half) as usize, (dc + half) as usize) {
                            continue;
                        }

                        let val = field.get_reflect(row as isize + dr, col as isize + dc);
                        if flags::is_valid(val) {
                            neighbors.push(val);
                        }
                    }
                }

                if neighbors.len() > config.min_ncount
                    && neighbors.len() as f32 > min_frac_count
                {
                    let bg_mean = neighbors.iter().map(|&v| v as f64).sum::<f64>()
                        / neighbors.len() as f64;
                    let bg_mad = neighbors
                        .iter()
                        .map(|&v| (v as f64 - bg_mean).abs())
                        .sum::<f64>()
                        / neighbors.len() as f64;

                    mean.set(row, col, bg_mean as f32);
                    mad.set(row, col, bg_mad as f32);
                }
            }
        }
    }

    BackgroundStats { mean, mad }
}

/// Count of valid background neighbors inside the footprint.
pub fn valid_neighbor_counts(field: &Grid<f32>, config: &Config) -> Grid<i32> {
    adaptive_counts(field, config, true, |_| false, flags::is_valid)
}

/// Count of neighbors carrying `flag`, the window center included.
pub fn flagged_neighbor_counts(field: &Grid<f32>, flag: f32, config: &Config) -> Grid<i32> {
    adaptive_counts(field, config, false, |_| false, move |v| v == flag)
}

/// Count of unmasked-water neighbors.
///
/// Pixels already classified water, cloud, or background candidate are not
/// counted for and stay at the unset sentinel.
pub fn unmasked_water_counts(field: &Grid<f32>, config: &Config) -> Grid<i32> {
    adaptive_counts(
        field,
        config,
        false,
        |center| {
            matches!(
                flags::flag_of(center),
                Some(Flag::Water | Flag::Cloud | Flag::BgCandidate)
            )
        },
        |v| v == flags::UNMASKED_WATER,
    )
}

fn adaptive_counts(
    field: &Grid<f32>,
    config: &Config,
    use_footprint: bool,
    skip_center: impl Fn(f32) -> bool,
    counted: impl Fn(f32) -> bool,
) -> Grid<i32> {
    let rows = field.rows();
    let cols = field.cols();

    let mut counts = Grid::filled(rows, cols, UNSET_COUNT);

    for ksize in config.window_sizes() {
        let fp = footprint(ksize);
        let half = (ksize / 2) as isize;

        for row in 0..rows {
            for col in 0..cols {
                if counts.get(row, col) != UNSET_COUNT {
                    continue;
                }
                if skip_center(field.get(row, col)) {
                    continue;
                }

                let mut n = 0;
                for dr in -half..=half {
                    for dc in -half..=half {
                        if use_footprint
                            && fp.is_excluded((dr + half) as usize, (dc + half) as usize)
                        {
                            continue;
                        }

                        if counted(field.get_reflect(row as isize + dr, col as isize + dc)) {
                            n += 1;
                        }
                    }
                }

                counts.set(row, col, n);
            }
        }
    }

    counts
}

/// 8-neighborhood counts of set cells in a binary mask, the center excluded.
pub fn adjacent_counts(mask: &Grid<bool>) -> Grid<i32> {
    let rows = mask.rows();
    let cols = mask.cols();

    let mut counts = Grid::filled(rows, cols, 0_i32);

    for row in 0..rows {
        for col in 0..cols {
            let mut n = 0;
            for dr in -1_isize..=1 {
                for dc in -1_isize..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }

                    if mask.get_reflect(row as isize + dr, col as isize + dc) {
                        n += 1;
                    }
                }
            }

            counts.set(row, col, n);
        }
    }

    counts
}

#[cfg(test)]
mod test {
    use super::*;

    fn uniform_field(rows: usize, cols: usize, value: f32) -> Grid<f32> {
        Grid::filled(rows, cols, value)
    }

    #[test]
    fn test_mean_mad_uniform() {
        let field = uniform_field(9, 9, 300.0);
        let stats = mean_mad_filter(&field, &Config::default());

        for row in 0..9 {
            for col in 0..9 {
                assert!((stats.mean.get(row, col) - 300.0).abs() < 1.0e-4);
                assert!(stats.mad.get(row, col).abs() < 1.0e-4);
            }
        }
    }

    #[test]
    fn test_mean_mad_values() {
        // 22 valid neighbors inside the 5×5 footprint around the center of a
        // 7×7 grid, one of them warmer than the rest.
        let mut field = uniform_field(7, 7, 290.0);
        field.set(3, 3, flags::BG_CANDIDATE);
        field.set(1, 1, 310.0);

        let stats = mean_mad_filter(&field, &Config::default());

        let expected_mean = (21.0 * 290.0 + 310.0) / 22.0;
        let expected_mad =
            ((310.0_f64 - expected_mean).abs() + 21.0 * (290.0_f64 - expected_mean).abs()) / 22.0;

        assert!((stats.mean.get(3, 3) as f64 - expected_mean).abs() < 1.0e-3);
        assert!((stats.mad.get(3, 3) as f64 - expected_mad).abs() < 1.0e-3);
    }

    #[test]
    fn test_water_and_cloud_centers_skipped() {
        let mut field = uniform_field(9, 9, 300.0);
        field.set(4, 4, flags::WATER);
        field.set(2, 2, flags::CLOUD);

        let stats = mean_mad_filter(&field, &Config::default());

        assert!(flags::is_unset(stats.mean.get(4, 4)));
        assert!(flags::is_unset(stats.mad.get(4, 4)));
        assert!(flags::is_unset(stats.mean.get(2, 2)));
        assert!(flags::is_unset(stats.mad.get(2, 2)));

        // A background-candidate center is still processed.
        let mut field = uniform_field(9, 9, 300.0);
        field.set(4, 4, flags::BG_CANDIDATE);
        let stats = mean_mad_filter(&field, &Config::default());
        assert!((stats.mean.get(4, 4) - 300.0).abs() < 1.0e-4);
    }

    #[test]
    fn test_starved_pixel_stays_unset() {
        // Nothing valid anywhere, so no window can ever succeed.
        let mut field = uniform_field(9, 9, flags::CLOUD);
        field.set(4, 4, flags::BG_CANDIDATE);

        let stats = mean_mad_filter(&field, &Config::default());

        assert!(flags::is_unset(stats.mean.get(4, 4)));
        assert!(flags::is_unset(stats.mad.get(4, 4)));
    }

    #[test]
    fn test_smallest_successful_window_wins() {
        // The 5×5 window around the center sees only water; the 7×7 ring is
        // fully valid, so the statistics must come from the 7×7 pass.
        let mut field = uniform_field(11, 11, flags::WATER);
        field.set(5, 5, flags::BG_CANDIDATE);
        for row in 2..=8 {
            for col in 2..=8 {
                let on_ring = row == 2 || row == 8 || col == 2 || col == 8;
                if on_ring {
                    field.set(row, col, 300.0);
                }
            }
        }

        let stats = mean_mad_filter(&field, &Config::default());

        assert!((stats.mean.get(5, 5) - 300.0).abs() < 1.0e-4);
        assert!(stats.mad.get(5, 5).abs() < 1.0e-4);
    }

    #[test]
    fn test_mean_unset_iff_mad_unset() {
        let mut field = uniform_field(9, 9, flags::CLOUD);
        for col in 0..9 {
            field.set(0, col, 295.0);
        }
        field.set(4, 4, flags::BG_CANDIDATE);

        let stats = mean_mad_filter(&field, &Config::default());

        for row in 0..9 {
            for col in 0..9 {
                assert_eq!(
                    flags::is_unset(stats.mean.get(row, col)),
                    flags::is_unset(stats.mad.get(row, col))
                );
            }
        }
    }

    #[test]
    fn test_valid_neighbor_counts() {
        let field = uniform_field(9, 9, 300.0);
        let counts = valid_neighbor_counts(&field, &Config::default());

        // Full 5×5 window minus the 3-cell exclusion cross.
        assert_eq!(counts.get(4, 4), 22);
    }

    #[test]
    fn test_flagged_neighbor_counts() {
        let mut field = uniform_field(9, 9, 0.0);
        field.set(4, 4, flags::BG_CANDIDATE);
        field.set(4, 5, flags::BG_CANDIDATE);

        let counts = flagged_neighbor_counts(&field, flags::BG_CANDIDATE, &Config::default());

        // The center is included in its own count.
        assert_eq!(counts.get(4, 4), 2);
        assert_eq!(counts.get(0, 0), 0);
    }

    #[test]
    fn test_unmasked_water_counts_skips_classified_centers() {
        let mut field = uniform_field(9, 9, 0.0);
        field.set(4, 4, flags::BG_CANDIDATE);
        field.set(4, 5, flags::UNMASKED_WATER);

        let counts = unmasked_water_counts(&field, &Config::default());

        assert_eq!(counts.get(4, 4), UNSET_COUNT);
        assert_eq!(counts.get(3, 3), 1);
    }

    #[test]
    fn test_adjacent_counts() {
        let mut mask = Grid::filled(5, 5, false);
        for dr in -1_isize..=1 {
            for dc in -1_isize..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                mask.set((2 + dr) as usize, (2 + dc) as usize, true);
            }
        }

        let counts = adjacent_counts(&mask);

        assert_eq!(counts.get(2, 2), 8);
        // A ring member sees its ring neighbors but not itself.
        assert_eq!(counts.get(1, 1), 2);
    }
}
