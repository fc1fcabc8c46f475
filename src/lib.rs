/*!
Contextual active-fire detection and fire radiative power estimation from
polar-orbiter swath imagery.

Each granule is processed independently: the grids are cropped to the
configured bounding box, classified into day/water/cloud/background masks,
compared against an adaptive variable-radius background, and every fire
pixel that survives the false-alarm rejections is reported with its
radiative power in megawatts and a detection confidence in [0, 1].
*/

// Public API
pub use crate::{
    background::{
        adjacent_counts, flagged_neighbor_counts, mean_mad_filter, unmasked_water_counts,
        valid_neighbor_counts, BackgroundStats, UNSET_COUNT,
    },
    cascade::{detect, Detection},
    config::{Config, MAX_KSIZE, MIN_KSIZE},
    confidence::{detection_confidence, geometric_mean, ramp},
    database::{FireDatabase, FireDatabaseAdd},
    error::DecodeError,
    footprint::{footprint, Footprint},
    geo::{BoundingBox, Coord},
    granule::{Granule, Scene},
    grid::Grid,
    masks::Masks,
    output::{save_csv, write_csv, FireRecord, CSV_HEADER},
    pipeline::{detect_scene, process_granule},
    power::{fire_radiative_power, is_credible_power, pixel_area_km2, MAX_CREDIBLE_POWER_MW},
    swathfile::{granule_name_of, is_container_path, Layer},
};

pub mod flags;

/// A generic error type.
pub type SwathFireError = Box<dyn Error + Send + Sync>;

/// A generic result type.
pub type SwathFireResult<T> = Result<T, SwathFireError>;

/// Parse a granule file name and find the scan start time.
///
/// Heritage granule names carry the acquisition day and time as
/// `*.AYYYYDDD.HHMM.*`.
pub fn scan_time_from_file_name(fname: &str) -> Option<NaiveDateTime> {
    let start_idx = fname.find(".A")? + 2;
    let slice = fname.get(start_idx..)?;
    if slice.len() < 12 || slice.as_bytes()[7] != b'.' {
        return None;
    }

    let date_part = slice.get(..7)?;
    let time_part = slice.get(8..12)?;

    NaiveDateTime::parse_from_str(&format!("{}{}", date_part, time_part), "%Y%j%H%M").ok()
}

// Private API
mod background;
mod cascade;
mod config;
mod confidence;
mod database;
mod error;
mod footprint;
mod geo;
mod granule;
mod grid;
mod masks;
mod output;
mod pipeline;
mod power;
mod swathfile;

use chrono::NaiveDateTime;
use std::error::Error;

// test
#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_scan_time_from_file_name() {
        const CASE1: &str = "MOD021KM.A2016257.2055.006.2016258072024.swt";

        let scan_time = scan_time_from_file_name(CASE1).unwrap();
        assert_eq!(
            scan_time,
            NaiveDate::from_yo_opt(2016, 257)
                .and_then(|d| d.and_hms_opt(20, 55, 0))
                .unwrap()
        );

        assert!(scan_time_from_file_name("granule.swt").is_none());
        assert!(scan_time_from_file_name("MOD021KM.A2016").is_none());
        assert!(scan_time_from_file_name("MOD021KM.A20162572055").is_none());
    }
}
