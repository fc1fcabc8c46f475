/*!
Geographic types shared across the crate.
*/

use std::fmt::{self, Display};

/// A point on the Earth, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// A latitude/longitude box described by its lower-left and upper-right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub ll: Coord,
    pub ur: Coord,
}

impl BoundingBox {
    /// Strictly-interior containment, the same rule the granule crop uses.
    ///
    /// NaN coordinates are never contained.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.ll.lat < lat && lat < self.ur.lat && self.ll.lon < lon && lon < self.ur.lon
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "({}, {}) to ({}, {})",
            self.ll.lat, self.ll.lon, self.ur.lat, self.ur.lon
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bounding_box_contains() {
        let bb = BoundingBox {
            ll: Coord {
                lat: 65.0,
                lon: -148.0,
            },
            ur: Coord {
                lat: 65.525,
                lon: -146.0,
            },
        };

        assert!(bb.contains(65.25, -147.0));

        // The boundary itself is out.
        assert!(!bb.contains(65.0, -147.0));
        assert!(!bb.contains(65.525, -147.0));
        assert!(!bb.contains(65.25, -148.0));
        assert!(!bb.contains(65.25, -146.0));

        assert!(!bb.contains(40.0, -147.0));
        assert!(!bb.contains(f64::NAN, -147.0));
        assert!(!bb.contains(65.25, f64::NAN));
    }
}
