//! Seismic magnitude estimate and fixed-medium wave velocities.
//!
//! The velocities come from textbook granite parameters, not from the
//! sensor. The magnitude is a log-ratio heuristic against gravity.

use beacon_types::{EarthquakeMetrics, Intensity, MagnitudeSource};
use rand::Rng;

use crate::normalize::{round_to, GRAVITY};

/// Bulk modulus K (Pa)
pub const BULK_MODULUS: f64 = 2.5e10;
/// Shear modulus μ (Pa)
pub const SHEAR_MODULUS: f64 = 1.5e10;
/// Density ρ (kg/m³)
pub const ROCK_DENSITY: f64 = 2700.0;

/// `sqrt((K + 4μ/3) / ρ)`, ≈ 4082 m/s
pub fn p_wave_velocity() -> f64 {
    ((BULK_MODULUS + 4.0 * SHEAR_MODULUS / 3.0) / ROCK_DENSITY).sqrt()
}

/// `sqrt(μ / ρ)`, ≈ 2357 m/s
pub fn s_wave_velocity() -> f64 {
    (SHEAR_MODULUS / ROCK_DENSITY).sqrt()
}

/// `log10(a / g) + 3`, clamped at zero, one decimal.
pub fn magnitude_from_acceleration(peak: f64) -> f64 {
    if !(peak > 0.0) {
        return 0.0;
    }
    round_to(((peak / GRAVITY).log10() + 3.0).max(0.0), 1)
}

/// Magnitude estimate, only for shakes above `threshold`.
pub fn estimate_magnitude(peak: f64, threshold: f64) -> Option<f64> {
    (peak > threshold).then(|| magnitude_from_acceleration(peak))
}

/// Half-open buckets: `[5, 6)` is Light, `[6, 7)` Moderate, and so on.
pub fn intensity_for(magnitude: f64) -> Intensity {
    match magnitude {
        m if m >= 9.0 => Intensity::Great,
        m if m >= 8.0 => Intensity::Major,
        m if m >= 7.0 => Intensity::Strong,
        m if m >= 6.0 => Intensity::Moderate,
        m if m >= 5.0 => Intensity::Light,
        m if m >= 4.0 => Intensity::Minor,
        m if m >= 2.0 => Intensity::Micro,
        _ => Intensity::None,
    }
}

pub fn metrics_for(magnitude: f64, source: MagnitudeSource) -> EarthquakeMetrics {
    EarthquakeMetrics {
        magnitude,
        p_wave_velocity: p_wave_velocity().round(),
        s_wave_velocity: s_wave_velocity().round(),
        intensity: intensity_for(magnitude),
        source,
    }
}

/// Metrics from the measured peak acceleration.
pub fn measured_metrics(peak: f64) -> EarthquakeMetrics {
    metrics_for(magnitude_from_acceleration(peak), MagnitudeSource::Measured)
}

/// Metrics from a magnitude drawn uniformly from `[min, max)`.
pub fn simulated_metrics(rng: &mut impl Rng, min: f64, max: f64) -> EarthquakeMetrics {
    let magnitude = round_to(rng.gen_range(min..max), 1);
    metrics_for(magnitude, MagnitudeSource::Simulated)
}
