//! Full engine sessions against the simulated phone, on paused tokio time.

use std::time::Duration;

use beacon_engine::config::AudioConfig;
use beacon_engine::{BeaconRuntime, EngineConfig};
use beacon_types::{MagnitudeSource, SystemStatus};
use sensor_simulator::{scenarios, ScenarioConfig, SimConfig, SimulatedAdapter};

fn seeded_config() -> EngineConfig {
    let mut cfg = EngineConfig::default();
    cfg.simulation.seed = Some(42);
    cfg
}

fn phone(scenario: ScenarioConfig) -> SimulatedAdapter {
    let cfg = SimConfig { seed: Some(42), ..Default::default() };
    SimulatedAdapter::new(cfg, AudioConfig::default(), scenario)
}

#[tokio::test(start_paused = true)]
async fn calm_phone_monitors_without_triggering() {
    let runtime = BeaconRuntime::start(seeded_config(), phone(ScenarioConfig::default())).await.unwrap();
    assert_eq!(runtime.status().await, SystemStatus::ActiveMonitoring);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = runtime.latest();
    assert!(!snapshot.earthquake_detected);
    assert!(snapshot.sample.has_fix());
    assert!(snapshot.sample.audio.amplitude >= 20);
    assert!(snapshot.map.is_some());
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shaking_phone_detects_the_earthquake() {
    let runtime = BeaconRuntime::start(seeded_config(), phone(scenarios::preset_earthquake())).await.unwrap();

    tokio::time::sleep(Duration::from_secs(16)).await;
    let snapshot = runtime.latest();
    assert_eq!(snapshot.status, SystemStatus::EarthquakeDetected);
    let quake = snapshot.earthquake.expect("metrics after detection");
    assert_eq!(quake.source, MagnitudeSource::Measured);
    assert!(quake.magnitude > 0.0);
    assert_eq!(snapshot.communications.sos_signals, 3);
    assert!(snapshot.analysis.is_some());
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn trapped_phone_reports_a_poor_outlook() {
    let runtime = BeaconRuntime::start(seeded_config(), phone(scenarios::preset_trapped())).await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = runtime.latest();
    assert!(snapshot.earthquake_detected);
    assert!(snapshot.sample.battery_level_pct <= 15);
    assert!(snapshot.sample.audio.amplitude < 20);
    assert_eq!(snapshot.environment.oxygen_level_pct, 18.0);
    // the coarse first fix was refined
    let fix = snapshot.sample.location.fix().expect("refined fix");
    assert!(fix.accuracy_meters <= 100.0);
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn denied_prompts_block_the_session() {
    let runtime = BeaconRuntime::start(seeded_config(), phone(scenarios::preset_denied())).await.unwrap();
    assert_eq!(runtime.status().await, SystemStatus::PermissionDenied);

    // the manual trigger still works
    let snapshot = runtime.trigger_emergency().await;
    assert!(snapshot.earthquake_detected);
    assert_eq!(snapshot.earthquake.map(|q| q.source), Some(MagnitudeSource::Simulated));
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn paused_sensors_and_swapped_scenarios() {
    let sim = phone(ScenarioConfig::default());
    let control = sim.clone();
    let runtime = BeaconRuntime::start(seeded_config(), sim).await.unwrap();

    control.pause();
    control.set_scenario(scenarios::preset_earthquake());
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(!runtime.latest().earthquake_detected);

    control.resume();
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(runtime.latest().earthquake_detected);
    runtime.shutdown().await;
    assert_eq!(runtime.active_tasks(), 0);
}
