//! adapter.rs - Simulated sensor platform
//!
//! `SimulatedAdapter` implements the engine's `SensorAdapter` over a
//! `PhoneSim`. It is a cheap clonable handle: the runtime owns one clone,
//! the control panel keeps another to pause, resume and swap scenarios.
//!
//! Streams (one task each, all stopped by `teardown`):
//!   clock        every motion interval, advances the phone
//!   motion       100 ms
//!   orientation  200 ms
//!   location     1 s watch, only emits while the position moves
//!   audio        one analyser frame per frame interval
//!   battery      5 s, always on

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use beacon_engine::config::AudioConfig;
use beacon_engine::{BeaconError, BeaconResult, LocationAccuracy, SensorAdapter};
use beacon_types::{Capability, CapabilityCheck, RawPosition, SensorEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::motion::{PhoneSim, SimConfig};
use crate::scenarios::{ScenarioConfig, ScenarioType};

#[derive(Clone)]
pub struct SimulatedAdapter {
    phone: Arc<Mutex<PhoneSim>>,
    audio: AudioConfig,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl SimulatedAdapter {
    pub fn new(cfg: SimConfig, audio: AudioConfig, scenario: ScenarioConfig) -> Self {
        Self {
            phone: Arc::new(Mutex::new(PhoneSim::new(cfg, scenario))),
            audio,
            running: Arc::new(AtomicBool::new(true)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    fn phone(&self) -> MutexGuard<'_, PhoneSim> {
        self.phone.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Control ───────────────────────────────────────────────────────────────

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn scenario(&self) -> ScenarioConfig {
        self.phone().scenario().clone()
    }

    pub fn set_scenario(&self, scenario: ScenarioConfig) {
        self.phone().set_scenario(scenario);
    }

    /// Simulated seconds since start.
    pub fn elapsed_s(&self) -> f64 {
        self.phone().t_elapsed
    }

    fn spawn_stream<F>(
        &self,
        name: &'static str,
        period: Duration,
        sink: mpsc::Sender<SensorEvent>,
        mut next: F,
    ) -> JoinHandle<()>
    where
        F: FnMut(&mut PhoneSim) -> Option<SensorEvent> + Send + 'static,
    {
        let phone = self.phone.clone();
        let running = self.running.clone();
        let paused = self.paused.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                if paused.load(Ordering::Relaxed) {
                    continue;
                }
                let event = {
                    let mut phone = phone.lock().unwrap_or_else(|e| e.into_inner());
                    next(&mut phone)
                };
                if let Some(event) = event {
                    if sink.send(event).await.is_err() {
                        break;
                    }
                }
            }
            debug!("{name} stream stopped");
        })
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v.max(1))
}

impl SensorAdapter for SimulatedAdapter {
    async fn open(&self) -> BeaconResult<()> {
        if self.phone().scenario().has(ScenarioType::BridgeOffline) {
            return Err(BeaconError::AdapterUnavailable("sensor bridge offline".into()));
        }
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn request(&self, capability: Capability) -> CapabilityCheck {
        self.phone().scenario().capability_check(capability)
    }

    fn start_streams(&self, granted: &[Capability], sink: mpsc::Sender<SensorEvent>) -> Vec<JoinHandle<()>> {
        let cfg = self.phone().config().clone();
        if self.phone().scenario().has(ScenarioType::BridgeOffline) {
            return Vec::new();
        }

        let dt = cfg.motion_interval_ms as f64 / 1000.0;
        let mut handles = vec![self.spawn_stream("clock", ms(cfg.motion_interval_ms), sink.clone(), move |p| {
            p.tick(dt);
            None
        })];

        for capability in granted {
            let handle = match capability {
                Capability::Accelerometer => self.spawn_stream("motion", ms(cfg.motion_interval_ms), sink.clone(), |p| {
                    Some(SensorEvent::Motion(p.motion()))
                }),
                Capability::Gyroscope => {
                    self.spawn_stream("orientation", ms(cfg.orientation_interval_ms), sink.clone(), |p| {
                        Some(SensorEvent::Orientation(p.orientation()))
                    })
                }
                Capability::Geolocation => {
                    self.spawn_stream("location", ms(cfg.location_watch_ms), sink.clone(), |p| {
                        let moving = p.scenario().has(ScenarioType::GpsDrift) && !p.scenario().has(ScenarioType::NoGps);
                        moving.then(|| SensorEvent::Position(p.watch_position()))
                    })
                }
                Capability::Microphone => {
                    let bins = self.audio.bin_count();
                    self.spawn_stream("audio", self.audio.frame_interval(), sink.clone(), move |p| {
                        Some(SensorEvent::Audio(p.audio_frame(bins)))
                    })
                }
                Capability::Camera => continue,
            };
            handles.push(handle);
        }

        handles.push(self.spawn_stream("battery", ms(cfg.battery_interval_ms), sink, |p| {
            Some(SensorEvent::Battery(p.battery()))
        }));
        info!("📱 {} simulated streams started", handles.len());
        handles
    }

    async fn request_location(&self, accuracy: LocationAccuracy) -> BeaconResult<RawPosition> {
        let (check, latency) = {
            let phone = self.phone();
            (phone.scenario().capability_check(Capability::Geolocation), phone.config().fix_latency_ms)
        };
        match check {
            CapabilityCheck::Denied { .. } => {
                return Err(BeaconError::PermissionDenied { capability: Capability::Geolocation })
            }
            CapabilityCheck::Unavailable { reason } => return Err(BeaconError::AdapterUnavailable(reason)),
            CapabilityCheck::Available { .. } => {}
        }

        tokio::time::sleep(Duration::from_millis(latency)).await;
        let answer = self.phone().position(accuracy);
        match answer {
            Some(position) => Ok(position),
            // No satellites: the platform just never calls back
            None => std::future::pending().await,
        }
    }

    async fn teardown(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("📱 Simulated sensors released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios;

    fn adapter(scenario: ScenarioConfig) -> SimulatedAdapter {
        let cfg = SimConfig { seed: Some(11), ..Default::default() };
        SimulatedAdapter::new(cfg, AudioConfig::default(), scenario)
    }

    fn drain(rx: &mut mpsc::Receiver<SensorEvent>) -> Vec<SensorEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn granted_streams_deliver_events() {
        let sim = adapter(ScenarioConfig::default());
        sim.open().await.unwrap();
        let (tx, mut rx) = mpsc::channel(1024);
        let handles = sim.start_streams(&Capability::ALL, tx);
        // clock, motion, orientation, location, audio, battery
        assert_eq!(handles.len(), 6);

        tokio::time::sleep(Duration::from_millis(1050)).await;
        let events = drain(&mut rx);
        let motion = events.iter().filter(|e| matches!(e, SensorEvent::Motion(_))).count();
        let audio = events.iter().filter(|e| matches!(e, SensorEvent::Audio(_))).count();
        assert!(motion >= 10, "{motion}");
        assert!(audio >= 20, "{audio}");
        assert!(events.iter().any(|e| matches!(e, SensorEvent::Orientation(_))));
        assert!(events.iter().any(|e| matches!(e, SensorEvent::Battery(_))));
        // standing still: no watch updates
        assert!(!events.iter().any(|e| matches!(e, SensorEvent::Position(_))));
        assert!(sim.elapsed_s() > 0.9);
    }

    #[tokio::test(start_paused = true)]
    async fn only_granted_capabilities_stream() {
        let sim = adapter(ScenarioConfig::default());
        let (tx, mut rx) = mpsc::channel(1024);
        sim.start_streams(&[Capability::Microphone], tx);
        tokio::time::sleep(Duration::from_millis(500)).await;
        let events = drain(&mut rx);
        assert!(events.iter().all(|e| matches!(e, SensorEvent::Audio(_) | SensorEvent::Battery(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_silences_streams_until_resume() {
        let sim = adapter(ScenarioConfig::default());
        let (tx, mut rx) = mpsc::channel(1024);
        sim.start_streams(&[Capability::Accelerometer], tx);
        tokio::time::sleep(Duration::from_millis(300)).await;
        sim.pause();
        drain(&mut rx);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(drain(&mut rx).is_empty());
        sim.resume();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_every_stream() {
        let sim = adapter(ScenarioConfig::default());
        let (tx, _rx) = mpsc::channel(4096);
        let handles = sim.start_streams(&Capability::ALL, tx);
        sim.teardown().await;
        assert!(!sim.is_running());
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(10), handle).await.unwrap().unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drifting_phone_emits_watch_updates() {
        let sim = adapter(scenarios::preset_drift());
        let (tx, mut rx) = mpsc::channel(1024);
        sim.start_streams(&[Capability::Geolocation], tx);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let positions = drain(&mut rx).into_iter().filter(|e| matches!(e, SensorEvent::Position(_))).count();
        assert!(positions >= 2, "{positions}");
    }

    #[tokio::test(start_paused = true)]
    async fn location_request_answers_after_latency() {
        let sim = adapter(ScenarioConfig::default());
        let started = tokio::time::Instant::now();
        let fix = sim.request_location(LocationAccuracy::High).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(800));
        assert_eq!(fix.accuracy_m, 12.0);
        assert!((fix.latitude - 37.7749).abs() < 0.001);
    }

    #[tokio::test(start_paused = true)]
    async fn denied_location_is_a_permission_error() {
        let sim = adapter(scenarios::preset_denied());
        let err = sim.request_location(LocationAccuracy::High).await.unwrap_err();
        assert!(matches!(err, BeaconError::PermissionDenied { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn no_gps_request_never_resolves() {
        let sim = adapter(scenarios::preset_no_gps());
        let waited = tokio::time::timeout(Duration::from_secs(60), sim.request_location(LocationAccuracy::High)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn offline_bridge_fails_open() {
        let sim = adapter(ScenarioConfig { active: vec![ScenarioType::BridgeOffline], ..Default::default() });
        assert!(matches!(sim.open().await, Err(BeaconError::AdapterUnavailable(_))));
        let (tx, _rx) = mpsc::channel(8);
        assert!(sim.start_streams(&Capability::ALL, tx).is_empty());
    }
}
