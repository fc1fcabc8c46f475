/*!
Algorithm configuration.

One immutable record passed by reference through every stage; there is no
process-wide mutable state. The window-size range is fixed by the
algorithm, the sensitivity knobs are the reduction factor and the mid-IR
saturation threshold.
*/

use crate::geo::{BoundingBox, Coord};
use static_assertions::const_assert;

/// Smallest background window, cells per side.
pub const MIN_KSIZE: usize = 5;

/// Largest background window tried before a pixel is given up on.
pub const MAX_KSIZE: usize = 21;

// Window sizes must be odd and the range non-empty.
const_assert!(MIN_KSIZE % 2 == 1);
const_assert!(MAX_KSIZE % 2 == 1);
const_assert!(MIN_KSIZE >= 5);
const_assert!(MIN_KSIZE <= MAX_KSIZE);

/// The knobs of the detection algorithm.
#[derive(Debug, Clone)]
pub struct Config {
    /// Smallest window tried by the adaptive background filter.
    pub min_ksize: usize,

    /// Largest window tried before giving up on a pixel.
    pub max_ksize: usize,

    /// A window succeeds only with strictly more than this many valid neighbors...
    pub min_ncount: usize,

    /// ...and strictly more than this fraction of the window area.
    pub min_nfrac: f32,

    /// Threshold tightening knob. 1.0 is the published algorithm; smaller
    /// values lower every temperature threshold proportionally.
    pub reduction_factor: f32,

    /// Mid-IR (BAND22) brightness temperatures at or above this are
    /// replaced with the BAND21 value.
    pub mid_ir_saturation: f32,

    /// Detection bounding box. Granule pixels outside it are cropped away.
    pub area: BoundingBox,
}

impl Config {
    /// The loosening counterpart of the reduction factor, `2 − r`.
    ///
    /// Both knobs are 1 at the default reduction factor.
    pub fn increase_factor(&self) -> f32 {
        2.0 - self.reduction_factor
    }

    /// Odd window sizes from smallest to largest.
    pub fn window_sizes(&self) -> impl Iterator<Item = usize> {
        (self.min_ksize..=self.max_ksize).step_by(2)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_ksize: MIN_KSIZE,
            max_ksize: MAX_KSIZE,
            min_ncount: 8,
            min_nfrac: 0.25,
            reduction_factor: 1.0,
            mid_ir_saturation: 331.0,
            area: BoundingBox {
                ll: Coord {
                    lat: 65.0,
                    lon: -148.0,
                },
                ur: Coord {
                    lat: 65.525,
                    lon: -146.0,
                },
            },
        }
    }
}
