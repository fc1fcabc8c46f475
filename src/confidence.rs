/*!
Detection confidence.

Five ramp sub-scores measure how unambiguous a detection is; the combined
confidence is their geometric mean, so one hard zero zeroes the whole
score. Day pixels use all five sub-scores, night pixels the three that do
not depend on reflected sunlight.
*/

/// Day C1 ramp bounds (K) for the masked mid-IR temperature.
const C1_DAY: (f32, f32) = (310.0, 340.0);

/// Night C1 ramp bounds (K).
const C1_NIGHT: (f32, f32) = (305.0, 320.0);

/// The standard ramp: 0 at or below `ramp_min`, 1 at or above `ramp_max`,
/// linear in between. NaN ramps to 0.
pub fn ramp(value: f32, ramp_min: f32, ramp_max: f32) -> f64 {
    if value >= ramp_max {
        1.0
    } else if value > ramp_min {
        ((value - ramp_min) / (ramp_max - ramp_min)) as f64
    } else {
        0.0
    }
}

/// Geometric mean of a set of scores in [0, 1].
///
/// Any zero (or invalid) score forces the result to 0.
pub fn geometric_mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let product: f64 = scores.iter().product();
    if product > 0.0 {
        product.powf(1.0 / scores.len() as f64)
    } else {
        0.0
    }
}

/// Combined detection confidence for one fire pixel, in [0, 1].
///
/// * C1 ramps the masked mid-IR temperature (day and night bounds differ).
/// * C2 ramps the mid-IR z-score against the background, `(T − T̄)/MAD`.
/// * C3 ramps the ΔT z-score the same way.
/// * C4 and C5 (day only) penalize adjacent cloud and water pixels.
pub fn detection_confidence(
    day: bool,
    t_mid_masked: f32,
    z_mid: f32,
    z_delta_t: f32,
    n_cloud_adj: i32,
    n_water_adj: i32,
) -> f64 {
    let c2 = ramp(z_mid, 2.5, 6.0);
    let c3 = ramp(z_delta_t, 3.0, 6.0);

    if day {
        let c1 = ramp(t_mid_masked, C1_DAY.0, C1_DAY.1);
        let c4 = 1.0 - ramp(n_cloud_adj as f32, 0.0, 6.0);
        let c5 = 1.0 - ramp(n_water_adj as f32, 0.0, 6.0);
        geometric_mean(&[c1, c2, c3, c4, c5])
    } else {
        let c1 = ramp(t_mid_masked, C1_NIGHT.0, C1_NIGHT.1);
        geometric_mean(&[c1, c2, c3])
    }
}
