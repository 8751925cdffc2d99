//! # beacon-types
//!
//! Shared data model for the LifeBeacon emergency beacon.
//!
//! These types are used by:
//! - `beacon-engine`: normalizing raw adapter events and deriving metrics
//! - `packages/sensor-simulator`: producing raw events and relaying snapshots
//! - presentation clients: JSON snapshots over the control WebSocket
//!
//! ## Units
//!
//! - Acceleration: m/s² (gravity included unless `source` says otherwise)
//! - Orientation: degrees (alpha 0..360 compass, beta/gamma tilt)
//! - Location: WGS84 degrees, accuracy in meters
//! - Audio amplitude: mean FFT byte magnitude, 0..255
//! - Battery: percent 0..100

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Capabilities ──────────────────────────────────────────────────────────────

/// A platform capability the beacon asks the adapter for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Accelerometer,
    Gyroscope,
    Geolocation,
    Microphone,
    Camera,
}

impl Capability {
    /// Every capability, in the order the session requests them.
    pub const ALL: [Capability; 5] = [
        Capability::Accelerometer,
        Capability::Gyroscope,
        Capability::Geolocation,
        Capability::Microphone,
        Capability::Camera,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Capability::Accelerometer => "Motion Sensor",
            Capability::Gyroscope => "Orientation",
            Capability::Geolocation => "GPS Location",
            Capability::Microphone => "Audio Analysis",
            Capability::Camera => "Camera",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tagged outcome of probing one capability.
///
/// `Available { simulated: true }` means the platform API is absent and the
/// adapter substitutes generated readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CapabilityCheck {
    Available { simulated: bool },
    Denied { reason: String },
    Unavailable { reason: String },
}

impl CapabilityCheck {
    pub fn is_available(&self) -> bool {
        matches!(self, CapabilityCheck::Available { .. })
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, CapabilityCheck::Denied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityEntry {
    pub capability: Capability,
    pub check: CapabilityCheck,
}

// ── Raw adapter events ────────────────────────────────────────────────────────

/// Three optional axes, as platform motion events deliver them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawVector {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl RawVector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x: Some(x), y: Some(y), z: Some(z) }
    }

    /// All three axes present.
    pub fn complete(&self) -> Option<(f64, f64, f64)> {
        Some((self.x?, self.y?, self.z?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRotationRate {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

/// One device-motion callback. Any of the three groups may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMotion {
    pub acceleration_including_gravity: Option<RawVector>,
    pub acceleration: Option<RawVector>,
    pub rotation_rate: Option<RawRotationRate>,
    pub timestamp_ms: i64,
}

/// One device-orientation callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrientation {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

/// One analyser frame: byte magnitudes for `fft_size / 2` frequency bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAudioFrame {
    pub bins: Vec<u8>,
    pub sample_rate_hz: f64,
    pub timestamp_ms: i64,
}

/// Battery status. `level` is a fraction 0..1 as the platform reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBattery {
    pub level: Option<f64>,
    pub charging: Option<bool>,
}

/// Everything an adapter can push to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SensorEvent {
    Motion(RawMotion),
    Orientation(RawOrientation),
    Position(RawPosition),
    PositionError { kind: LocationErrorKind, message: String },
    Audio(RawAudioFrame),
    Battery(RawBattery),
}

impl SensorEvent {
    /// The capability this event is a reading of (battery has none).
    pub fn capability(&self) -> Option<Capability> {
        match self {
            SensorEvent::Motion(_) => Some(Capability::Accelerometer),
            SensorEvent::Orientation(_) => Some(Capability::Gyroscope),
            SensorEvent::Position(_) | SensorEvent::PositionError { .. } => Some(Capability::Geolocation),
            SensorEvent::Audio(_) => Some(Capability::Microphone),
            SensorEvent::Battery(_) => None,
        }
    }
}

// ── Normalized sample ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionSource {
    Gravity,
    Linear,
    Rotation,
    #[default]
    Simulated,
}

/// Acceleration vector. Invariant: `magnitude = sqrt(x² + y² + z²)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub magnitude: f64,
    pub timestamp_ms: i64,
    pub source: MotionSource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gyroscope {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub timestamp_ms: i64,
    /// Compass heading in degrees, when alpha was reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compass: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_meters: f64,
    pub timestamp_ms: i64,
}

/// Latest location slice: a fix, an error state, or nothing yet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationState {
    #[default]
    Pending,
    Fix(LocationFix),
    Error { reason: String },
}

impl LocationState {
    pub fn fix(&self) -> Option<&LocationFix> {
        match self {
            LocationState::Fix(fix) => Some(fix),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioLevel {
    /// Mean analyser byte magnitude, 0..255
    pub amplitude: u8,
    pub dominant_frequency_hz: f64,
}

/// Snapshot of the latest reading from every sensor slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSample {
    pub acceleration: Acceleration,
    pub gyroscope: Gyroscope,
    pub location: LocationState,
    pub audio: AudioLevel,
    pub battery_level_pct: u8,
    pub battery_charging: bool,
}

impl Default for SensorSample {
    fn default() -> Self {
        Self {
            acceleration: Acceleration::default(),
            gyroscope: Gyroscope::default(),
            location: LocationState::Pending,
            audio: AudioLevel::default(),
            battery_level_pct: 100,
            battery_charging: false,
        }
    }
}

impl SensorSample {
    pub fn has_fix(&self) -> bool {
        self.location.fix().is_some()
    }
}

// ── Seismic ───────────────────────────────────────────────────────────────────

/// Intensity label, a half-open step function of magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Intensity {
    #[default]
    None,
    Micro,
    Minor,
    Light,
    Moderate,
    Strong,
    Major,
    Great,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeSource {
    /// Derived from the measured acceleration magnitude
    Measured,
    /// Sampled from the configured range (manual simulation button)
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarthquakeMetrics {
    pub magnitude: f64,
    /// m/s
    pub p_wave_velocity: f64,
    /// m/s
    pub s_wave_velocity: f64,
    pub intensity: Intensity,
    pub source: MagnitudeSource,
}

// ── Survival analysis ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    /// 0..100
    pub survival_probability: u8,
    /// 30..240
    pub rescue_time_estimate_minutes: u32,
    pub threat_level: ThreatLevel,
    /// Only triggered recommendations, in fixed order
    pub recommended_actions: Vec<String>,
}

// ── Environment ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirQuality {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuralStability {
    Stable,
    Moderate,
    Unstable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebrisType {
    Concrete,
    Steel,
    Wood,
    Mixed,
}

impl DebrisType {
    pub const ALL: [DebrisType; 4] = [
        DebrisType::Concrete,
        DebrisType::Steel,
        DebrisType::Wood,
        DebrisType::Mixed,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalEstimate {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub oxygen_level_pct: f64,
    pub air_quality: AirQuality,
    pub structural_stability: StructuralStability,
    /// Unknown until the first analysis tick
    pub debris_type: Option<DebrisType>,
}

impl Default for EnvironmentalEstimate {
    fn default() -> Self {
        Self {
            temperature_c: 20.0,
            humidity_pct: 50.0,
            oxygen_level_pct: 21.0,
            air_quality: AirQuality::Good,
            structural_stability: StructuralStability::Stable,
            debris_type: None,
        }
    }
}

// ── Vitals & mesh ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    /// BPM
    pub heart_rate: u32,
    /// Breaths per minute
    pub breathing_rate: u32,
    pub stress_level: StressLevel,
    pub conscious: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshNetworkState {
    pub connected_devices: u32,
    pub network_strength_pct: u8,
    pub message_queue: Vec<String>,
    pub last_sync: Option<DateTime<Utc>>,
}

// ── Victims & rescue coordination ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VictimStatus {
    Trapped,
    Injured,
    Safe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VictimRecord {
    pub id: u32,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub status: VictimStatus,
    pub battery_pct: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamStatus {
    #[serde(rename = "En Route")]
    EnRoute,
    Standby,
    Deployed,
    Loading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueTeam {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: TeamStatus,
    pub eta_label: String,
    pub personnel: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub available: bool,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueCoordinationState {
    pub teams: Vec<RescueTeam>,
    pub resources: Vec<RescueResource>,
    pub eta_label: Option<String>,
    /// Victims ordered by descending rescue priority
    pub priority_queue: Vec<VictimRecord>,
}

// ── Communications ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyMessage {
    pub id: String,
    pub from: String,
    pub message: String,
    pub time: DateTime<Utc>,
    pub priority: MessagePriority,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationState {
    /// Newest first
    pub emergency_messages: Vec<EmergencyMessage>,
    pub sos_signals: u32,
    pub last_contact: Option<DateTime<Utc>>,
    pub signal_strength_pct: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Emergency,
    Fire,
    Medical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub number: String,
    #[serde(rename = "type")]
    pub kind: ContactKind,
}

// ── Physics readouts ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalBand {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeismicReadout {
    pub p_wave_speed: f64,
    pub band: SignalBand,
    pub frequency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resonance {
    Weak,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcousticReadout {
    pub wavelength_m: f64,
    pub air_pockets: u32,
    pub resonance: Resonance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialDensity {
    Light,
    Dense,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectromagneticReadout {
    pub penetration: f64,
    pub material_density: MaterialDensity,
    pub interference: SignalBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalReadout {
    pub body_heat_c: f64,
    pub environment_c: f64,
    pub gradient_c: f64,
}

/// Illustrative estimates for display, not physical measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsReadouts {
    pub seismic: SeismicReadout,
    pub acoustic: AcousticReadout,
    pub electromagnetic: ElectromagneticReadout,
    pub thermal: ThermalReadout,
}

// ── System status ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    #[default]
    Initializing,
    RequestingPermissions,
    ActiveMonitoring,
    LimitedFunctionality,
    SensorError,
    PermissionDenied,
    EarthquakeDetected,
    Error,
}

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Initializing => "initializing",
            SystemStatus::RequestingPermissions => "requesting_permissions",
            SystemStatus::ActiveMonitoring => "active_monitoring",
            SystemStatus::LimitedFunctionality => "limited_functionality",
            SystemStatus::SensorError => "sensor_error",
            SystemStatus::PermissionDenied => "permission_denied",
            SystemStatus::EarthquakeDetected => "earthquake_detected",
            SystemStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Map ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub position: LatLng,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VictimStatus>,
}

/// What the map provider needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub center: LatLng,
    pub accuracy_meters: f64,
    /// Own marker is drawn in the alert color once an emergency is active
    pub alert: bool,
    pub own_marker: MapMarker,
    pub victim_markers: Vec<MapMarker>,
}

// ── Snapshot (Engine → Presentation) ──────────────────────────────────────────

/// Read-only view of the whole session, rebuilt on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconSnapshot {
    pub tick: u64,
    pub generated_at: DateTime<Utc>,
    pub status: SystemStatus,
    pub earthquake_detected: bool,
    pub sample: SensorSample,
    pub capabilities: Vec<CapabilityEntry>,
    pub earthquake: Option<EarthquakeMetrics>,
    pub analysis: Option<AiAnalysis>,
    pub environment: EnvironmentalEstimate,
    pub vitals: Option<VitalSigns>,
    pub mesh: MeshNetworkState,
    pub rescue: RescueCoordinationState,
    pub communications: CommunicationState,
    pub contacts: Vec<EmergencyContact>,
    pub physics: Option<PhysicsReadouts>,
    pub map: Option<MapView>,
}

impl BeaconSnapshot {
    /// The state presented before any tick has run.
    pub fn initial(generated_at: DateTime<Utc>) -> Self {
        Self {
            tick: 0,
            generated_at,
            status: SystemStatus::Initializing,
            earthquake_detected: false,
            sample: SensorSample::default(),
            capabilities: Vec::new(),
            earthquake: None,
            analysis: None,
            environment: EnvironmentalEstimate::default(),
            vitals: None,
            mesh: MeshNetworkState::default(),
            rescue: RescueCoordinationState::default(),
            communications: CommunicationState::default(),
            contacts: Vec::new(),
            physics: None,
            map: None,
        }
    }
}
