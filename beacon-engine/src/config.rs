//! # config
//!
//! Engine configuration, read from the `[engine]` table of a TOML file.
//! Every field has a default so an empty table is a valid configuration.
//!
//! Environment overrides (applied after parsing):
//! - `BEACON_SEED`: fixes the session random source
//! - `BEACON_EARTHQUAKE_THRESHOLD`: detection threshold in m/s²

use std::time::Duration;

use beacon_types::MagnitudeSource;
use serde::{Deserialize, Serialize};

use crate::error::{BeaconError, BeaconResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detection: DetectionConfig,
    pub ticks: TickConfig,
    pub location: LocationConfig,
    pub audio: AudioConfig,
    pub precision: PrecisionConfig,
    pub simulation: SimulationConfig,
}

// ── Detection ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Peak acceleration above which a shake counts as seismic (m/s²)
    pub earthquake_threshold_mps2: f64,
    /// Trigger automatically when a motion sample crosses the threshold
    pub automatic: bool,
    /// Where the manual trigger takes its magnitude from
    pub manual_magnitude_source: MagnitudeSource,
    /// Range of the simulated magnitude, `[min, max)`
    pub simulated_magnitude_min: f64,
    pub simulated_magnitude_max: f64,
    /// SOS broadcasts counted as already sent when an emergency starts
    pub auto_sos_signals: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            earthquake_threshold_mps2: 12.0,
            automatic: true,
            manual_magnitude_source: MagnitudeSource::Simulated,
            simulated_magnitude_min: 5.5,
            simulated_magnitude_max: 7.5,
            auto_sos_signals: 3,
        }
    }
}

// ── Tick periods ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// AI analysis, mesh, vitals, environment, rescue, communications
    pub analysis_ms: u64,
    /// Physics readouts
    pub physics_ms: u64,
    /// Quiet period after the last location change before the map refreshes
    pub map_debounce_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { analysis_ms: 2000, physics_ms: 1000, map_debounce_ms: 1000 }
    }
}

impl TickConfig {
    pub fn analysis(&self) -> Duration {
        Duration::from_millis(self.analysis_ms)
    }

    pub fn physics(&self) -> Duration {
        Duration::from_millis(self.physics_ms)
    }

    pub fn map_debounce(&self) -> Duration {
        Duration::from_millis(self.map_debounce_ms)
    }
}

// ── Location ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Fixes coarser than this trigger one high-accuracy re-request
    pub refine_accuracy_m: f64,
    /// Wait before the re-request
    pub refine_delay_ms: u64,
    /// Deadline for a single fix request
    pub fix_timeout_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self { refine_accuracy_m: 100.0, refine_delay_ms: 5000, fix_timeout_ms: 30_000 }
    }
}

impl LocationConfig {
    pub fn refine_delay(&self) -> Duration {
        Duration::from_millis(self.refine_delay_ms)
    }

    pub fn fix_timeout(&self) -> Duration {
        Duration::from_millis(self.fix_timeout_ms)
    }
}

// ── Audio ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Analyser FFT size; frames carry `fft_size / 2` bins
    pub fft_size: usize,
    /// Period of the frame chain while the audio resource is running
    pub frame_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { fft_size: 2048, frame_interval_ms: 50 }
    }
}

impl AudioConfig {
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

// ── Precision ─────────────────────────────────────────────────────────────────

/// Decimal places kept when normalizing raw readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionConfig {
    pub acceleration_decimals: u32,
    pub orientation_decimals: u32,
    pub location_decimals: u32,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self { acceleration_decimals: 4, orientation_decimals: 3, location_decimals: 6 }
    }
}

// ── Simulation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the session random source; entropy when absent
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> BeaconResult<Self> {
        let cfg: EngineConfig = toml::from_str(raw).map_err(|e| BeaconError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> BeaconResult<()> {
        let d = &self.detection;
        if !(d.earthquake_threshold_mps2 > 0.0) {
            return Err(BeaconError::Config(format!(
                "earthquake_threshold_mps2 must be positive, got {}",
                d.earthquake_threshold_mps2
            )));
        }
        if !(d.simulated_magnitude_min < d.simulated_magnitude_max) || d.simulated_magnitude_min < 0.0 {
            return Err(BeaconError::Config(format!(
                "simulated magnitude range [{}, {}) is empty or negative",
                d.simulated_magnitude_min, d.simulated_magnitude_max
            )));
        }
        let t = &self.ticks;
        if t.analysis_ms == 0 || t.physics_ms == 0 || t.map_debounce_ms == 0 {
            return Err(BeaconError::Config("tick periods must be non-zero".into()));
        }
        if !self.audio.fft_size.is_power_of_two() || self.audio.fft_size < 32 || self.audio.frame_interval_ms == 0 {
            return Err(BeaconError::Config(format!(
                "audio fft_size must be a power of two >= 32, got {}",
                self.audio.fft_size
            )));
        }
        if self.location.fix_timeout_ms == 0 {
            return Err(BeaconError::Config("fix_timeout_ms must be non-zero".into()));
        }
        Ok(())
    }

    /// Apply `BEACON_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(seed) = std::env::var("BEACON_SEED").ok().and_then(|v| v.parse().ok()) {
            self.simulation.seed = Some(seed);
        }
        if let Some(t) = std::env::var("BEACON_EARTHQUAKE_THRESHOLD").ok().and_then(|v| v.parse().ok()) {
            self.detection.earthquake_threshold_mps2 = t;
        }
        self
    }
}
