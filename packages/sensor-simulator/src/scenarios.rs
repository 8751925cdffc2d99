//! scenarios.rs - Injectable situations for the phone simulator
//!
//! Each scenario reproduces something a real phone does during (or after)
//! a disaster: violent shaking, a dying battery, a buried microphone, no
//! satellites, a user who taps "deny". Scenarios are switchable at runtime
//! through the control WebSocket.

use beacon_types::{Capability, CapabilityCheck};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioType {
    /// Ground shaking that ramps up, peaks and dies down
    Earthquake,
    /// Battery starts near empty and drains fast
    LowBattery,
    /// Microphone covered by debris, near-silent frames
    Muffled,
    /// Location requests never resolve
    NoGps,
    /// First high-accuracy fix is a coarse network fix
    CoarseGps,
    /// Position keeps moving (phone carried or sliding)
    GpsDrift,
    /// User denies the motion sensors prompt
    DeniedMotion,
    /// User denies the location prompt
    DeniedLocation,
    /// No sensor hardware reachable at all
    SensorBlackout,
    /// The platform bridge itself is down
    BridgeOffline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub active: Vec<ScenarioType>,
    /// Seconds after the scenario is loaded before shaking starts
    pub quake_delay_s: f64,
    pub quake_duration_s: f64,
    /// Peak added acceleration at the height of the shaking (m/s²)
    pub quake_peak_mps2: f64,
    /// Battery level the LowBattery scenario starts from (0..1)
    pub low_battery_level: f64,
    /// Walking-pace drift for GpsDrift (m/s)
    pub drift_mps: f64,
    /// Accuracy of the coarse first fix in CoarseGps (m)
    pub coarse_accuracy_m: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            active: vec![],
            quake_delay_s: 3.0,
            quake_duration_s: 20.0,
            quake_peak_mps2: 25.0,
            low_battery_level: 0.15,
            drift_mps: 1.2,
            coarse_accuracy_m: 450.0,
        }
    }
}

impl ScenarioConfig {
    pub fn has(&self, s: ScenarioType) -> bool {
        self.active.contains(&s)
    }

    /// Shaking envelope in 0..1 at `t` seconds since the scenario loaded.
    pub fn quake_envelope(&self, t: f64) -> f64 {
        if !self.has(ScenarioType::Earthquake) || self.quake_duration_s <= 0.0 {
            return 0.0;
        }
        let phase = (t - self.quake_delay_s) / self.quake_duration_s;
        if !(0.0..=1.0).contains(&phase) {
            return 0.0;
        }
        (phase * std::f64::consts::PI).sin()
    }

    /// What the simulated platform answers when `capability` is requested.
    pub fn capability_check(&self, capability: Capability) -> CapabilityCheck {
        if self.has(ScenarioType::SensorBlackout) {
            return CapabilityCheck::Unavailable { reason: format!("{} not present", capability.label()) };
        }
        match capability {
            Capability::Accelerometer | Capability::Gyroscope if self.has(ScenarioType::DeniedMotion) => {
                CapabilityCheck::Denied { reason: "Motion access denied by user".into() }
            }
            Capability::Geolocation if self.has(ScenarioType::DeniedLocation) => {
                CapabilityCheck::Denied { reason: "Location access denied by user".into() }
            }
            // The simulator has no camera; report the simulated fallback
            Capability::Camera => CapabilityCheck::Available { simulated: true },
            _ => CapabilityCheck::Available { simulated: false },
        }
    }
}

/// Predefined scenario presets selectable from the control panel
pub fn preset_earthquake() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::Earthquake],
        ..Default::default()
    }
}

/// A short violent shake, then a buried phone with a dying battery.
pub fn preset_trapped() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::Earthquake, ScenarioType::Muffled, ScenarioType::LowBattery, ScenarioType::CoarseGps],
        quake_delay_s: 1.0,
        quake_duration_s: 8.0,
        quake_peak_mps2: 30.0,
        ..Default::default()
    }
}

pub fn preset_no_gps() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::NoGps],
        ..Default::default()
    }
}

pub fn preset_denied() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::DeniedMotion, ScenarioType::DeniedLocation],
        ..Default::default()
    }
}

pub fn preset_blackout() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::SensorBlackout],
        ..Default::default()
    }
}

pub fn preset_drift() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::GpsDrift],
        ..Default::default()
    }
}

/// Look a preset up by its control-panel name.
pub fn preset(name: &str) -> Option<ScenarioConfig> {
    let sc = match name {
        "calm" | "default" => ScenarioConfig::default(),
        "earthquake" => preset_earthquake(),
        "trapped" => preset_trapped(),
        "no_gps" => preset_no_gps(),
        "denied" => preset_denied(),
        "blackout" => preset_blackout(),
        "drift" => preset_drift(),
        _ => return None,
    };
    Some(sc)
}
