/*!
Hollow-cross background footprints.

A footprint selects which cells of a `k×k` window may contribute to the
background statistics. The center cell and its immediate left and right
neighbors are excluded: the candidate pixel and its two along-scan
neighbors may themselves be fire contaminated.
*/

use crate::config::{MAX_KSIZE, MIN_KSIZE};
use once_cell::sync::Lazy;

/// The inclusion mask for one window size: `+1` contributes, `−1` marks
/// the exclusion cross.
pub struct Footprint {
    size: usize,
    mask: Vec<i8>,
}

impl Footprint {
    /// Build the mask for an odd window size of at least 5.
    pub fn new(size: usize) -> Self {
        assert!(
            size >= 5 && size % 2 == 1,
            "footprint size must be odd and at least 5"
        );

        let mut mask = vec![1_i8; size * size];
        let center = (size - 1) / 2;
        for col in (center - 1)..=(center + 1) {
            mask[center * size + col] = -1;
        }

        Footprint { size, mask }
    }

    /// Cells per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Is this window cell part of the exclusion cross?
    #[inline]
    pub fn is_excluded(&self, row: usize, col: usize) -> bool {
        self.mask[row * self.size + col] < 0
    }

    /// How many cells of the window may contribute.
    pub fn contributing_cells(&self) -> usize {
        self.mask.iter().filter(|&&m| m > 0).count()
    }
}

static FOOTPRINTS: Lazy<Vec<Footprint>> = Lazy::new(|| {
    (MIN_KSIZE..=MAX_KSIZE)
        .step_by(2)
        .map(Footprint::new)
        .collect()
});

/// The cached footprint for a window size in the algorithm's fixed range.
pub fn footprint(size: usize) -> &'static Footprint {
    assert!(
        (MIN_KSIZE..=MAX_KSIZE).contains(&size) && size % 2 == 1,
        "window size outside the supported range"
    );

    &FOOTPRINTS[(size - MIN_KSIZE) / 2]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_footprint_shape() {
        for size in (5..=21).step_by(2) {
            let fp = Footprint::new(size);

            assert_eq!(fp.contributing_cells(), size * size - 3);

            let center = (size - 1) / 2;
            let mut excluded = vec![];
            for row in 0..size {
                for col in 0..size {
                    if fp.is_excluded(row, col) {
                        excluded.push((row, col));
                    }
                }
            }

            assert_eq!(
                excluded,
                vec![
                    (center, center - 1),
                    (center, center),
                    (center, center + 1)
                ]
            );
        }
    }

    #[test]
    fn test_cached_footprints() {
        for size in (5..=21).step_by(2) {
            assert_eq!(footprint(size).size(), size);
        }
    }

    #[test]
    #[should_panic]
    fn test_even_size_rejected() {
        let _ = Footprint::new(6);
    }

    #[test]
    #[should_panic]
    fn test_tiny_size_rejected() {
        let _ = Footprint::new(3);
    }
}
