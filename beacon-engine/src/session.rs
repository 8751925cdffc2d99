//! # session
//!
//! One beacon session as a single owned container: the latest sensor
//! sample, the status machine, every derived metric, the journal and the
//! random source every simulation draws from.
//!
//! `Session` is synchronous and clock-free; callers pass `now`. The async
//! runtime wraps it in `Arc<RwLock<_>>` and drives it from its tick tasks.
//! Given the same seed, events and timestamps, two sessions produce the
//! same snapshots.

use beacon_types::{
    AiAnalysis, BeaconSnapshot, CapabilityEntry, CommunicationState, EarthquakeMetrics, EmergencyContact,
    EnvironmentalEstimate, LatLng, LocationState, MagnitudeSource, MapMarker, MapView, MeshNetworkState,
    PhysicsReadouts, RescueCoordinationState, SensorEvent, SensorSample, SystemStatus, VictimRecord, VictimStatus,
    VitalSigns,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::journal::Journal;
use crate::normalize::{
    location_error, normalize_audio, normalize_battery, normalize_motion, normalize_orientation, normalize_position,
};
use crate::status::{StatusMachine, Transition};
use crate::{environment, physics, seismic, simulation, survival};

/// What one ingested event changed, for the runtime to act on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// A new fix replaced the previous location
    pub location_changed: bool,
    /// This event crossed the detection threshold
    pub auto_triggered: bool,
}

pub struct Session {
    config: EngineConfig,
    machine: StatusMachine,
    rng: StdRng,
    tick: u64,

    sample: SensorSample,
    capabilities: Vec<CapabilityEntry>,

    earthquake: Option<EarthquakeMetrics>,
    emergency_started_at: Option<DateTime<Utc>>,
    analysis: Option<AiAnalysis>,
    environment: EnvironmentalEstimate,
    vitals: Option<VitalSigns>,
    mesh: MeshNetworkState,
    rescue: RescueCoordinationState,
    communications: CommunicationState,
    contacts: Vec<EmergencyContact>,
    victims: Vec<VictimRecord>,
    physics: Option<PhysicsReadouts>,
    map: Option<MapView>,

    journal: Journal,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let rng = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            machine: StatusMachine::new(),
            rng,
            tick: 0,
            sample: SensorSample::default(),
            capabilities: Vec::new(),
            earthquake: None,
            emergency_started_at: None,
            analysis: None,
            environment: EnvironmentalEstimate::default(),
            vitals: None,
            mesh: MeshNetworkState::default(),
            rescue: RescueCoordinationState::default(),
            communications: CommunicationState::default(),
            contacts: Vec::new(),
            victims: Vec::new(),
            physics: None,
            map: None,
            journal: Journal::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> SystemStatus {
        self.machine.status()
    }

    pub fn earthquake_detected(&self) -> bool {
        self.machine.earthquake_detected()
    }

    pub fn sample(&self) -> &SensorSample {
        &self.sample
    }

    pub fn earthquake(&self) -> Option<&EarthquakeMetrics> {
        self.earthquake.as_ref()
    }

    pub fn analysis(&self) -> Option<&AiAnalysis> {
        self.analysis.as_ref()
    }

    pub fn communications(&self) -> &CommunicationState {
        &self.communications
    }

    pub fn victims(&self) -> &[VictimRecord] {
        &self.victims
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    fn record(&mut self, transition: Option<Transition>, now: DateTime<Utc>) {
        if let Some(t) = transition {
            self.journal.log_transition(now, t);
        }
    }

    // ── Initialization ────────────────────────────────────────────────────────

    pub fn begin_initialization(&mut self, now: DateTime<Utc>) {
        let t = self.machine.reset();
        self.record(t, now);
        let t = self.machine.begin_permissions();
        self.record(t, now);
    }

    pub fn record_capabilities(&mut self, entries: Vec<CapabilityEntry>, now: DateTime<Utc>) -> SystemStatus {
        for entry in &entries {
            if !entry.check.is_available() {
                warn!("Capability {} not granted: {:?}", entry.capability, entry.check);
            }
        }
        let t = self.machine.resolve_capabilities(&entries);
        self.capabilities = entries;
        self.record(t, now);
        self.status()
    }

    pub fn initialization_failed(&mut self, reason: &str, now: DateTime<Utc>) {
        warn!("Sensor initialization failed: {reason}");
        let t = self.machine.adapter_failed();
        self.record(t, now);
    }

    // ── Ingest ────────────────────────────────────────────────────────────────

    /// Overwrite the slice this event belongs to. Gaps keep the old value.
    pub fn ingest(&mut self, event: SensorEvent, now: DateTime<Utc>) -> IngestOutcome {
        let precision = &self.config.precision;
        let mut outcome = IngestOutcome::default();
        match event {
            SensorEvent::Motion(raw) => {
                self.sample.acceleration = normalize_motion(&raw, precision.acceleration_decimals);
                let detection = &self.config.detection;
                if detection.automatic
                    && !self.earthquake_detected()
                    && self.sample.acceleration.magnitude > detection.earthquake_threshold_mps2
                {
                    info!(
                        "Acceleration {:.2} m/s² above {:.1} threshold",
                        self.sample.acceleration.magnitude, detection.earthquake_threshold_mps2
                    );
                    self.trigger_emergency(false, now);
                    outcome.auto_triggered = true;
                }
            }
            SensorEvent::Orientation(raw) => match normalize_orientation(&raw, precision.orientation_decimals) {
                Ok(g) => self.sample.gyroscope = g,
                Err(e) => debug!("{e}"),
            },
            SensorEvent::Position(raw) => match normalize_position(&raw, precision.location_decimals) {
                Ok(fix) => {
                    outcome.location_changed = self.sample.location.fix() != Some(&fix);
                    self.sample.location = LocationState::Fix(fix);
                }
                Err(e) => debug!("{e}"),
            },
            SensorEvent::PositionError { kind, message } => {
                warn!("Location watch error: {message}");
                self.sample.location = location_error(kind);
            }
            SensorEvent::Audio(frame) => match normalize_audio(&frame) {
                Ok(level) => self.sample.audio = level,
                Err(e) => debug!("{e}"),
            },
            SensorEvent::Battery(raw) => {
                let (pct, charging) =
                    normalize_battery(&raw, self.sample.battery_level_pct, self.sample.battery_charging);
                self.sample.battery_level_pct = pct;
                self.sample.battery_charging = charging;
            }
        }
        outcome
    }

    /// Result of a one-shot location acquisition. Returns whether a new fix arrived.
    pub fn set_location(&mut self, location: LocationState, now: DateTime<Utc>) -> bool {
        self.journal.log_gps_refresh(now, &location);
        let changed = match &location {
            LocationState::Fix(fix) => self.sample.location.fix() != Some(fix),
            _ => false,
        };
        self.sample.location = location;
        changed
    }

    // ── User actions ──────────────────────────────────────────────────────────

    /// Enter (or re-enter) the emergency. The manual path always re-derives
    /// the metrics; the first trigger also seeds contacts and communications.
    pub fn trigger_emergency(&mut self, manual: bool, now: DateTime<Utc>) -> EarthquakeMetrics {
        let detection = self.config.detection.clone();
        let source = if manual { detection.manual_magnitude_source } else { MagnitudeSource::Measured };
        let metrics = match source {
            MagnitudeSource::Measured => seismic::measured_metrics(self.sample.acceleration.magnitude),
            MagnitudeSource::Simulated => seismic::simulated_metrics(
                &mut self.rng,
                detection.simulated_magnitude_min,
                detection.simulated_magnitude_max,
            ),
        };
        info!(
            "Emergency {} trigger: magnitude {:.1} ({:?}, {:?})",
            if manual { "manual" } else { "automatic" },
            metrics.magnitude,
            metrics.intensity,
            metrics.source
        );

        let t = self.machine.trigger();
        self.record(t, now);
        self.earthquake = Some(metrics);
        self.journal.log_trigger(now, manual, &metrics);

        if self.emergency_started_at.is_none() {
            self.emergency_started_at = Some(now);
            self.contacts = simulation::emergency_contacts();
            self.communications = simulation::seed_communications(now, detection.auto_sos_signals, &mut self.rng);
        }
        self.place_victims();
        metrics
    }

    /// Prepend an outgoing SOS to the feed. Returns the new counter.
    pub fn send_sos(&mut self, now: DateTime<Utc>) -> u32 {
        simulation::record_sos(&mut self.communications, now, &mut self.rng);
        let count = self.communications.sos_signals;
        info!("SOS signal sent ({count} total)");
        self.journal.log_sos(now, count);
        count
    }

    // ── Ticks ─────────────────────────────────────────────────────────────────

    /// The 2 s cycle: environment, survival analysis, vitals, and while an
    /// emergency is active mesh and rescue coordination.
    pub fn analysis_tick(&mut self, now: DateTime<Utc>) {
        self.tick += 1;

        self.environment = environment::estimate(&self.sample, &mut self.rng);
        let hours = self
            .emergency_started_at
            .map(|t| (now - t).num_milliseconds().max(0) as f64 / 3_600_000.0);
        let analysis = survival::analyze(&self.sample, &self.environment, hours);
        self.vitals = Some(simulation::vital_signs(analysis.survival_probability, &mut self.rng));
        self.analysis = Some(analysis);

        if self.earthquake_detected() {
            self.mesh = simulation::mesh_network(now, &mut self.rng);
            self.rescue = simulation::rescue_coordination(&self.victims);
        }
        self.communications.signal_strength_pct = simulation::signal_strength(&mut self.rng);
        debug!("Analysis tick {}: status {}", self.tick, self.status());
    }

    /// The 1 s cycle.
    pub fn physics_tick(&mut self, _now: DateTime<Utc>) {
        self.physics = Some(physics::readouts(
            &self.sample,
            &self.environment,
            self.vitals.as_ref(),
            &mut self.rng,
        ));
    }

    /// Rebuild the map view around the current fix. No fix, no map.
    pub fn refresh_map(&mut self, _now: DateTime<Utc>) -> bool {
        let Some(fix) = self.sample.location.fix().copied() else {
            return false;
        };
        self.place_victims();
        let center = LatLng { lat: fix.lat, lng: fix.lng };
        self.map = Some(MapView {
            center,
            accuracy_meters: fix.accuracy_meters,
            alert: self.earthquake_detected(),
            own_marker: MapMarker {
                position: center,
                label: format!("Your Location - Battery: {}%", self.sample.battery_level_pct),
                status: None,
            },
            victim_markers: self
                .victims
                .iter()
                .map(|v| MapMarker {
                    position: LatLng { lat: v.lat, lng: v.lng },
                    label: format!("{} - {} - Battery: {}%", v.name, victim_label(v.status), v.battery_pct),
                    status: Some(v.status),
                })
                .collect(),
        });
        true
    }

    /// Nearby victims appear once an emergency is active and we know where we are.
    fn place_victims(&mut self) {
        if !self.earthquake_detected() {
            return;
        }
        if let Some(fix) = self.sample.location.fix() {
            self.victims = simulation::nearby_victims(LatLng { lat: fix.lat, lng: fix.lng });
        }
    }

    // ── Snapshot ──────────────────────────────────────────────────────────────

    pub fn snapshot(&self, now: DateTime<Utc>) -> BeaconSnapshot {
        BeaconSnapshot {
            tick: self.tick,
            generated_at: now,
            status: self.status(),
            earthquake_detected: self.earthquake_detected(),
            sample: self.sample.clone(),
            capabilities: self.capabilities.clone(),
            earthquake: self.earthquake,
            analysis: self.analysis.clone(),
            environment: self.environment,
            vitals: self.vitals,
            mesh: self.mesh.clone(),
            rescue: self.rescue.clone(),
            communications: self.communications.clone(),
            contacts: self.contacts.clone(),
            physics: self.physics,
            map: self.map.clone(),
        }
    }
}

fn victim_label(status: VictimStatus) -> &'static str {
    match status {
        VictimStatus::Trapped => "trapped",
        VictimStatus::Injured => "injured",
        VictimStatus::Safe => "safe",
    }
}
