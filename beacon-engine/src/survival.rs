//! Survival probability, rescue ETA, threat level and recommended actions.
//!
//! A fixed deduction table, applied in order, then clamped. Pure: the same
//! sample, environment and elapsed time always give the same analysis.

use beacon_types::{AiAnalysis, EnvironmentalEstimate, SensorSample, ThreatLevel};

pub const CONSERVE_BATTERY: &str = "Conserve battery - disable non-essential features";
pub const MAKE_NOISE: &str = "Make noise periodically to signal location";
pub const SEND_SOS: &str = "Send immediate SOS signal";
pub const CONTROL_BREATHING: &str = "Control breathing - slow, deep breaths";

/// ETA bounds, minutes
pub const MIN_RESCUE_MINUTES: u32 = 30;
pub const MAX_RESCUE_MINUTES: u32 = 240;

// ── Deductions ────────────────────────────────────────────────────────────────

const LOW_BATTERY_PCT: u8 = 20;
const QUIET_AMPLITUDE: u8 = 10;
const VIOLENT_SHAKE_MPS2: f64 = 15.0;
const LOW_OXYGEN_PCT: f64 = 18.0;
const SAFE_TEMPERATURE_C: std::ops::RangeInclusive<f64> = 5.0..=35.0;
const DECAY_PER_HOUR: f64 = 5.0;

/// Unclamped probability after every deduction.
///
/// `hours_since_trigger` is `None` until an emergency is active.
fn raw_probability(sample: &SensorSample, env: &EnvironmentalEstimate, hours_since_trigger: Option<f64>) -> f64 {
    let mut p = 100.0;
    if sample.battery_level_pct < LOW_BATTERY_PCT {
        p -= 30.0;
    }
    if sample.audio.amplitude < QUIET_AMPLITUDE {
        p -= 20.0;
    }
    if sample.acceleration.magnitude > VIOLENT_SHAKE_MPS2 {
        p -= 25.0;
    }
    if !sample.has_fix() {
        p -= 15.0;
    }
    if env.oxygen_level_pct < LOW_OXYGEN_PCT {
        p -= 35.0;
    }
    if !SAFE_TEMPERATURE_C.contains(&env.temperature_c) {
        p -= 20.0;
    }
    if let Some(hours) = hours_since_trigger {
        p -= hours.max(0.0) * DECAY_PER_HOUR;
    }
    p
}

/// Probability after deductions, clamped to `[0, 100]` but not rounded.
///
/// Thresholds and the ETA work on this value; only the reported percentage
/// is rounded.
pub fn clamped_probability(
    sample: &SensorSample,
    env: &EnvironmentalEstimate,
    hours_since_trigger: Option<f64>,
) -> f64 {
    let p = raw_probability(sample, env, hours_since_trigger);
    if p.is_nan() {
        return 0.0;
    }
    p.clamp(0.0, 100.0)
}

/// Reported survival percentage.
pub fn survival_probability(
    sample: &SensorSample,
    env: &EnvironmentalEstimate,
    hours_since_trigger: Option<f64>,
) -> u8 {
    clamped_probability(sample, env, hours_since_trigger).round() as u8
}

/// `max(30, 240 − 2p)` minutes, rounded.
pub fn rescue_eta_minutes(probability: f64) -> u32 {
    let eta = (MAX_RESCUE_MINUTES as f64 - 2.0 * probability.clamp(0.0, 100.0)).round();
    (eta as u32).clamp(MIN_RESCUE_MINUTES, MAX_RESCUE_MINUTES)
}

pub fn threat_level(probability: f64) -> ThreatLevel {
    match probability {
        p if p > 70.0 => ThreatLevel::Low,
        p if p > 40.0 => ThreatLevel::Medium,
        _ => ThreatLevel::High,
    }
}

pub fn recommended_actions(sample: &SensorSample, env: &EnvironmentalEstimate, probability: f64) -> Vec<String> {
    let mut actions = Vec::new();
    if sample.battery_level_pct < 30 {
        actions.push(CONSERVE_BATTERY.to_string());
    }
    if sample.audio.amplitude < 20 {
        actions.push(MAKE_NOISE.to_string());
    }
    if probability < 50.0 {
        actions.push(SEND_SOS.to_string());
    }
    if env.oxygen_level_pct < 19.0 {
        actions.push(CONTROL_BREATHING.to_string());
    }
    actions
}

pub fn analyze(sample: &SensorSample, env: &EnvironmentalEstimate, hours_since_trigger: Option<f64>) -> AiAnalysis {
    let p = clamped_probability(sample, env, hours_since_trigger);
    AiAnalysis {
        survival_probability: p.round() as u8,
        rescue_time_estimate_minutes: rescue_eta_minutes(p),
        threat_level: threat_level(p),
        recommended_actions: recommended_actions(sample, env, p),
    }
}
