//! Environmental estimate from the current sample plus random draws.

use beacon_types::{AirQuality, DebrisType, EnvironmentalEstimate, SensorSample, StructuralStability};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::normalize::round_to;

/// Ambient oxygen, %
const AMBIENT_OXYGEN_PCT: f64 = 21.0;
const MIN_OXYGEN_PCT: f64 = 15.0;
/// A quiet microphone suggests a sealed pocket.
const MUFFLED_AMPLITUDE: u8 = 20;
const MUFFLED_OXYGEN_DROP: f64 = 3.0;

pub fn structural_stability(acceleration_magnitude: f64) -> StructuralStability {
    match acceleration_magnitude {
        a if a > 10.0 => StructuralStability::Unstable,
        a if a > 5.0 => StructuralStability::Moderate,
        _ => StructuralStability::Stable,
    }
}

pub fn oxygen_level(amplitude: u8) -> f64 {
    let drop = if amplitude < MUFFLED_AMPLITUDE { MUFFLED_OXYGEN_DROP } else { 0.0 };
    round_to((AMBIENT_OXYGEN_PCT - drop).max(MIN_OXYGEN_PCT), 1)
}

pub fn air_quality(oxygen_pct: f64) -> AirQuality {
    match oxygen_pct {
        o if o > 19.0 => AirQuality::Good,
        o if o > 17.0 => AirQuality::Fair,
        _ => AirQuality::Poor,
    }
}

/// Draw order is debris, temperature, humidity; a seeded source replays exactly.
pub fn estimate(sample: &SensorSample, rng: &mut impl Rng) -> EnvironmentalEstimate {
    let debris_type = DebrisType::ALL.choose(rng).copied();
    let temperature_c = f64::from(rng.gen_range(20..=34));
    let humidity_pct = f64::from(rng.gen_range(40..=79));
    let oxygen_level_pct = oxygen_level(sample.audio.amplitude);

    EnvironmentalEstimate {
        temperature_c,
        humidity_pct,
        oxygen_level_pct,
        air_quality: air_quality(oxygen_level_pct),
        structural_stability: structural_stability(sample.acceleration.magnitude),
        debris_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stability_thresholds_are_exclusive() {
        assert_eq!(structural_stability(10.0), StructuralStability::Moderate);
        assert_eq!(structural_stability(10.01), StructuralStability::Unstable);
        assert_eq!(structural_stability(5.0), StructuralStability::Stable);
        assert_eq!(structural_stability(9.81), StructuralStability::Moderate);
    }

    #[test]
    fn quiet_microphone_lowers_oxygen() {
        assert_eq!(oxygen_level(5), 18.0);
        assert_eq!(oxygen_level(20), 21.0);
        assert_eq!(air_quality(18.0), AirQuality::Fair);
        assert_eq!(air_quality(21.0), AirQuality::Good);
        assert_eq!(air_quality(17.0), AirQuality::Poor);
    }

    #[test]
    fn random_fields_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let sample = SensorSample::default();
        for _ in 0..300 {
            let env = estimate(&sample, &mut rng);
            assert!((20.0..=34.0).contains(&env.temperature_c));
            assert!((40.0..=79.0).contains(&env.humidity_pct));
            assert_eq!(env.temperature_c.fract(), 0.0);
            assert!(env.debris_type.is_some());
        }
    }

    #[test]
    fn seeded_estimate_replays() {
        let sample = SensorSample::default();
        let a = estimate(&sample, &mut StdRng::seed_from_u64(3));
        let b = estimate(&sample, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
