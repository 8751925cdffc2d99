//! Display-only physics readouts, recomputed on the 1 s physics tick.

use beacon_types::{
    AcousticReadout, ElectromagneticReadout, EnvironmentalEstimate, MaterialDensity, PhysicsReadouts, Resonance,
    SeismicReadout, SensorSample, SignalBand, ThermalReadout, VitalSigns,
};
use rand::Rng;

use crate::normalize::{magnitude, round_to};
use crate::seismic::p_wave_velocity;

/// Speed of sound in air, m/s
const SPEED_OF_SOUND: f64 = 343.0;
const RESTING_BODY_HEAT_C: f64 = 36.5;
const INTERFERENCE_PROBABILITY: f64 = 0.3;

pub fn seismic_band(acceleration_magnitude: f64) -> SignalBand {
    match acceleration_magnitude {
        a if a > 12.0 => SignalBand::High,
        a if a > 6.0 => SignalBand::Medium,
        _ => SignalBand::Low,
    }
}

pub fn acoustic(amplitude: u8) -> AcousticReadout {
    let wavelength_m = if amplitude > 0 {
        round_to(SPEED_OF_SOUND / (f64::from(amplitude) * 10.0), 2)
    } else {
        0.0
    };
    AcousticReadout {
        wavelength_m,
        air_pockets: u32::from(amplitude / 20),
        resonance: if amplitude > 50 { Resonance::Strong } else { Resonance::Weak },
    }
}

pub fn body_heat(vitals: Option<&VitalSigns>) -> f64 {
    match vitals {
        Some(v) if v.heart_rate > 0 => round_to(36.0 + f64::from(v.heart_rate) * 0.01, 1),
        _ => RESTING_BODY_HEAT_C,
    }
}

/// One draw from `rng` (interference).
pub fn readouts(
    sample: &SensorSample,
    env: &EnvironmentalEstimate,
    vitals: Option<&VitalSigns>,
    rng: &mut impl Rng,
) -> PhysicsReadouts {
    let a = &sample.acceleration;
    let interference = if rng.gen_bool(INTERFERENCE_PROBABILITY) { SignalBand::High } else { SignalBand::Low };

    PhysicsReadouts {
        seismic: SeismicReadout {
            p_wave_speed: p_wave_velocity().round(),
            band: seismic_band(a.magnitude),
            frequency: round_to(a.magnitude, 1),
        },
        acoustic: acoustic(sample.audio.amplitude),
        electromagnetic: ElectromagneticReadout {
            penetration: round_to(2.0 * magnitude(a.x, a.y, 0.0), 1),
            material_density: if a.z > 10.0 { MaterialDensity::Dense } else { MaterialDensity::Light },
            interference,
        },
        thermal: ThermalReadout {
            body_heat_c: body_heat(vitals),
            environment_c: env.temperature_c,
            gradient_c: round_to((env.temperature_c - RESTING_BODY_HEAT_C).abs(), 1),
        },
    }
}
