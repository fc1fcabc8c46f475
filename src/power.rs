/*!
Fire radiative power and the along-scan pixel-area term.
*/

use crate::flags;

/// Coefficient of the eighth-power radiative power proxy, MW · K⁻⁸.
pub const FRP_COEFF: f64 = 4.34e-19;

/// Detections at or above this power (MW) are not credible and are dropped.
pub const MAX_CREDIBLE_POWER_MW: f64 = 3900.0;

/// Radiative power of a fire pixel against its background, in megawatts.
///
/// The eighth-power blackbody proxy `4.34e-19 · (T⁸ − T_bg⁸)`. Pixels that
/// did not pass the potential-fire test carry no power, and neither do
/// pixels whose background mean never resolved (no window produced enough
/// valid neighbors).
pub fn fire_radiative_power(t_mid: f32, bg_mean: f32, potential: bool) -> f64 {
    if !potential || !flags::is_valid(bg_mean) {
        return 0.0;
    }

    FRP_COEFF * ((t_mid as f64).powi(8) - (bg_mean as f64).powi(8))
}

/// The emission gate: `0 < FRP < 3900` MW. NaN is not credible.
pub fn is_credible_power(power: f64) -> bool {
    power > 0.0 && power < MAX_CREDIBLE_POWER_MW
}

/// Along-track × along-scan pixel area in km², from the along-scan column
/// index.
///
/// The scan geometry: `S` is the scan angle of the column from nadir (a
/// radian quantity by construction), `Z` the corresponding zenith angle on
/// an Earth whose radius-to-orbit ratio is 1.111. Off-nadir pixels grow in
/// both directions.
pub fn pixel_area_km2(sample: usize) -> f64 {
    // Half the zero-based scan width and the altitude-to-pixel-size ratio.
    const HALF_SCAN: f64 = 676.6;
    const ALTITUDE_RATIO: f64 = 700.0;

    let s = (sample as f64 - HALF_SCAN) / ALTITUDE_RATIO;
    let z = (1.111 * s.sin()).asin();

    let along_track = 9.0 * (z - s).sin() / s.sin();
    let along_scan = along_track / z.cos();

    along_track * along_scan
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fire_radiative_power() {
        // A 380 K fire over a 290 K background.
        let power = fire_radiative_power(380.0, 290.0, true);
        assert!((power - 167.0).abs() < 2.0);
        assert!(is_credible_power(power));

        // Warmer background, less power.
        assert!(fire_radiative_power(380.0, 300.0, true) < power);
    }

    #[test]
    fn test_power_requires_potential() {
        assert_eq!(fire_radiative_power(380.0, 290.0, false), 0.0);
    }

    #[test]
    fn test_power_requires_background() {
        assert_eq!(fire_radiative_power(380.0, flags::UNSET, true), 0.0);
        assert_eq!(fire_radiative_power(380.0, f32::NAN, true), 0.0);
    }

    #[test]
    fn test_credible_power_gate() {
        assert!(is_credible_power(1.0));
        assert!(is_credible_power(3899.9));

        assert!(!is_credible_power(0.0));
        assert!(!is_credible_power(-5.0));
        assert!(!is_credible_power(3900.0));
        assert!(!is_credible_power(f64::NAN));
    }

    #[test]
    fn test_pixel_area_near_nadir() {
        // A "1 km" pixel is very nearly 1 km² at nadir.
        let area = pixel_area_km2(677);
        assert!((area - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_pixel_area_grows_off_nadir() {
        let nadir = pixel_area_km2(677);
        let edge = pixel_area_km2(0);

        assert!(edge > 5.0 * nadir);
        assert!(pixel_area_km2(1353) > 5.0 * nadir);
    }
}
