//! motion.rs - Phone sensor physics
//!
//! Simulates one phone lying somewhere in a building:
//! - Accelerometer: gravity on z with a slow sway, plus Gaussian shaking
//!   scaled by the earthquake envelope
//! - Orientation: a fixed heading with small tilt wobble
//! - Microphone: analyser frames with room tone, a voice-band bump and a
//!   low-frequency rumble while the ground moves
//! - Battery: linear drain
//! - Location: a base position with accuracy depending on the request
//!
//! Pure math over a seeded RNG. The adapter owns the clock and calls `tick`.

use beacon_engine::normalize::GRAVITY;
use beacon_engine::LocationAccuracy;
use beacon_types::{RawAudioFrame, RawBattery, RawMotion, RawOrientation, RawPosition, RawRotationRate, RawVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::scenarios::{ScenarioConfig, ScenarioType};

/// Metres per degree of latitude
const METERS_PER_DEG: f64 = 111_320.0;

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub base_lat: f64,
    pub base_lng: f64,
    /// Accuracy of a good high-accuracy fix (m)
    pub fix_accuracy_m: f64,
    /// Time the platform takes to answer a location request
    pub fix_latency_ms: u64,
    pub motion_interval_ms: u64,
    pub orientation_interval_ms: u64,
    pub location_watch_ms: u64,
    pub battery_interval_ms: u64,
    pub sample_rate_hz: f64,
    /// Starting battery level (0..1)
    pub battery_level: f64,
    /// Percentage points lost per minute
    pub battery_drain_per_min: f64,
    pub heading_deg: f64,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            base_lat: 37.7749,
            base_lng: -122.4194,
            fix_accuracy_m: 12.0,
            fix_latency_ms: 800,
            motion_interval_ms: 100,
            orientation_interval_ms: 200,
            location_watch_ms: 1000,
            battery_interval_ms: 5000,
            sample_rate_hz: 44_100.0,
            battery_level: 0.87,
            battery_drain_per_min: 0.5,
            heading_deg: 135.0,
            seed: None,
        }
    }
}

// ── Phone state ───────────────────────────────────────────────────────────────

pub struct PhoneSim {
    cfg: SimConfig,
    scenario: ScenarioConfig,
    rng: StdRng,
    /// Seconds since the simulator started
    pub t_elapsed: f64,
    scenario_loaded_at: f64,
    battery_level: f64,
    lat: f64,
    lng: f64,
    coarse_served: bool,
}

impl PhoneSim {
    pub fn new(cfg: SimConfig, scenario: ScenarioConfig) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut sim = Self {
            rng,
            t_elapsed: 0.0,
            scenario_loaded_at: 0.0,
            battery_level: cfg.battery_level.clamp(0.0, 1.0),
            lat: cfg.base_lat,
            lng: cfg.base_lng,
            coarse_served: false,
            scenario: ScenarioConfig::default(),
            cfg,
        };
        sim.set_scenario(scenario);
        sim
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    /// Load a scenario; its timeline restarts now.
    pub fn set_scenario(&mut self, scenario: ScenarioConfig) {
        self.scenario_loaded_at = self.t_elapsed;
        self.coarse_served = false;
        if scenario.has(ScenarioType::LowBattery) {
            self.battery_level = self.battery_level.min(scenario.low_battery_level);
        }
        self.scenario = scenario;
    }

    fn scenario_time(&self) -> f64 {
        self.t_elapsed - self.scenario_loaded_at
    }

    pub fn quake_envelope(&self) -> f64 {
        self.scenario.quake_envelope(self.scenario_time())
    }

    fn timestamp_ms(&self) -> i64 {
        (self.t_elapsed * 1000.0) as i64
    }

    /// Advance the phone by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.t_elapsed += dt;

        let drain = if self.scenario.has(ScenarioType::LowBattery) { 4.0 } else { 1.0 };
        let per_second = self.cfg.battery_drain_per_min * drain / 100.0 / 60.0;
        self.battery_level = (self.battery_level - per_second * dt).max(0.0);

        if self.scenario.has(ScenarioType::GpsDrift) {
            let step = self.scenario.drift_mps * dt / METERS_PER_DEG;
            let heading = self.cfg.heading_deg.to_radians();
            self.lat += step * heading.cos();
            self.lng += step * heading.sin() / self.lat.to_radians().cos();
        }
    }

    // ── Readings ──────────────────────────────────────────────────────────────

    pub fn motion(&mut self) -> RawMotion {
        let t = self.t_elapsed;
        let shake = self.quake_envelope() * self.scenario.quake_peak_mps2;
        let sigma = 0.02 + shake * 0.15;
        let (nx, ny, nz) = match Normal::new(0.0, sigma) {
            Ok(n) => (n.sample(&mut self.rng), n.sample(&mut self.rng), n.sample(&mut self.rng)),
            Err(_) => (0.0, 0.0, 0.0),
        };

        let tau = std::f64::consts::TAU;
        let lin_x = (t * 0.1).sin() * 0.1 + shake * (tau * 2.5 * t).sin() + nx;
        let lin_y = (t * 0.1).cos() * 0.1 + shake * (tau * 3.1 * t).cos() + ny;
        let lin_z = (t * 0.5).sin() * 0.05 + shake * 0.5 * (tau * 1.7 * t).sin() + nz;

        let wobble = self.quake_envelope() * 90.0;
        RawMotion {
            acceleration_including_gravity: Some(RawVector::new(lin_x, lin_y, GRAVITY + lin_z)),
            acceleration: Some(RawVector::new(lin_x, lin_y, lin_z)),
            rotation_rate: Some(RawRotationRate {
                alpha: Some(wobble * (tau * 0.9 * t).sin()),
                beta: Some(wobble * (tau * 1.3 * t).cos()),
                gamma: Some(wobble * 0.5 * (tau * 0.7 * t).sin()),
            }),
            timestamp_ms: self.timestamp_ms(),
        }
    }

    pub fn orientation(&mut self) -> RawOrientation {
        let t = self.t_elapsed;
        let tilt = 2.0 + self.quake_envelope() * 25.0;
        let jitter: f64 = self.rng.gen_range(-0.5..0.5);
        RawOrientation {
            alpha: Some((self.cfg.heading_deg + jitter).rem_euclid(360.0)),
            beta: Some((t * 0.3).sin() * tilt),
            gamma: Some((t * 0.2).cos() * tilt),
            timestamp_ms: self.timestamp_ms(),
        }
    }

    /// One analyser frame of `bin_count` byte magnitudes.
    pub fn audio_frame(&mut self, bin_count: usize) -> RawAudioFrame {
        let sample_rate = self.cfg.sample_rate_hz;
        let bin_width = sample_rate / (2.0 * bin_count.max(1) as f64);
        let muffled = self.scenario.has(ScenarioType::Muffled);
        let rumble = self.quake_envelope() * 160.0;

        let bins = (0..bin_count)
            .map(|i| {
                let freq = i as f64 * bin_width;
                let level = if muffled {
                    self.rng.gen_range(0.0..6.0)
                } else {
                    let room = 45.0 * (1.0 - 0.7 * i as f64 / bin_count as f64);
                    let voice = if (250.0..=350.0).contains(&freq) { 60.0 } else { 0.0 };
                    room + voice + self.rng.gen_range(-8.0..8.0)
                };
                let level = if freq < 120.0 { level + rumble } else { level };
                level.round().clamp(0.0, 255.0) as u8
            })
            .collect();

        RawAudioFrame { bins, sample_rate_hz: sample_rate, timestamp_ms: self.timestamp_ms() }
    }

    pub fn battery(&self) -> RawBattery {
        RawBattery {
            level: Some((self.battery_level * 100.0).round() / 100.0),
            charging: Some(false),
        }
    }

    /// A location answer, or `None` when the platform never responds.
    pub fn position(&mut self, accuracy: LocationAccuracy) -> Option<RawPosition> {
        if self.scenario.has(ScenarioType::NoGps) {
            return None;
        }
        let accuracy_m = match accuracy {
            LocationAccuracy::High if self.scenario.has(ScenarioType::CoarseGps) && !self.coarse_served => {
                self.coarse_served = true;
                self.scenario.coarse_accuracy_m
            }
            LocationAccuracy::High => self.cfg.fix_accuracy_m,
            LocationAccuracy::Relaxed => (self.cfg.fix_accuracy_m * 5.0).max(80.0),
        };
        let spread = accuracy_m / 5.0 / METERS_PER_DEG;
        let lat = self.lat + self.rng.gen_range(-spread..=spread);
        let lng = self.lng + self.rng.gen_range(-spread..=spread);
        Some(RawPosition { latitude: lat, longitude: lng, accuracy_m, timestamp_ms: self.timestamp_ms() })
    }

    /// The current position as a watch update (no fix jitter).
    pub fn watch_position(&self) -> RawPosition {
        RawPosition {
            latitude: self.lat,
            longitude: self.lng,
            accuracy_m: self.cfg.fix_accuracy_m,
            timestamp_ms: self.timestamp_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios;
    use beacon_engine::normalize::{normalize_audio, normalize_motion};

    fn seeded(scenario: ScenarioConfig) -> PhoneSim {
        PhoneSim::new(SimConfig { seed: Some(7), ..Default::default() }, scenario)
    }

    #[test]
    fn resting_phone_reads_about_one_g() {
        let mut phone = seeded(ScenarioConfig::default());
        for _ in 0..50 {
            phone.tick(0.1);
            let a = normalize_motion(&phone.motion(), 4);
            assert!((a.magnitude - GRAVITY).abs() < 0.5, "{}", a.magnitude);
        }
    }

    #[test]
    fn quake_peak_crosses_the_detection_threshold() {
        let mut phone = seeded(scenarios::preset_earthquake());
        let mut peak = 0.0f64;
        for _ in 0..300 {
            phone.tick(0.1);
            peak = peak.max(normalize_motion(&phone.motion(), 4).magnitude);
        }
        assert!(peak > 12.0, "peak {peak}");
    }

    #[test]
    fn muffled_audio_is_quiet() {
        let mut phone = seeded(ScenarioConfig { active: vec![ScenarioType::Muffled], ..Default::default() });
        let level = normalize_audio(&phone.audio_frame(1024)).unwrap();
        assert!(level.amplitude < 20);
    }

    #[test]
    fn room_tone_is_audible_with_a_voice_peak() {
        let mut phone = seeded(ScenarioConfig::default());
        let frame = phone.audio_frame(1024);
        assert_eq!(frame.bins.len(), 1024);
        let level = normalize_audio(&frame).unwrap();
        assert!(level.amplitude >= 20);
        assert!((250.0..=350.0).contains(&level.dominant_frequency_hz), "{}", level.dominant_frequency_hz);
    }

    #[test]
    fn low_battery_starts_low_and_drains() {
        let mut phone = seeded(ScenarioConfig { active: vec![ScenarioType::LowBattery], ..Default::default() });
        assert_eq!(phone.battery().level, Some(0.15));
        phone.tick(600.0);
        let level = phone.battery().level.unwrap();
        assert!(level < 0.15);
        assert!(level >= 0.0);
    }

    #[test]
    fn coarse_gps_serves_one_coarse_fix_then_fine_ones() {
        let mut phone = seeded(ScenarioConfig { active: vec![ScenarioType::CoarseGps], ..Default::default() });
        assert_eq!(phone.position(LocationAccuracy::High).unwrap().accuracy_m, 450.0);
        assert_eq!(phone.position(LocationAccuracy::High).unwrap().accuracy_m, 12.0);
    }

    #[test]
    fn no_gps_never_answers() {
        let mut phone = seeded(scenarios::preset_no_gps());
        assert!(phone.position(LocationAccuracy::High).is_none());
        assert!(phone.position(LocationAccuracy::Relaxed).is_none());
    }

    #[test]
    fn drift_moves_the_watch_position() {
        let mut phone = seeded(scenarios::preset_drift());
        let before = phone.watch_position();
        phone.tick(10.0);
        let after = phone.watch_position();
        assert!(after.latitude != before.latitude || after.longitude != before.longitude);
    }
}
