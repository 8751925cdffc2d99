//! main.rs - LifeBeacon phone simulator entry point
//!
//! Runs two things side by side:
//!   1. A beacon engine session fed by the simulated phone sensors
//!   2. A WebSocket control panel (default port 9191) that streams every
//!      snapshot and accepts commands: trigger, sos, refresh_gps, preset,
//!      set_scenario, pause, resume, status
//!
//! Commands are JSON: { "cmd": "...", "args": {...} }

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use beacon_engine::{BeaconRuntime, EngineConfig};
use beacon_types::{BeaconSnapshot, MagnitudeSource};
use clap::Parser;
use serde_json::json;
use sensor_simulator::{scenarios, ScenarioConfig, SimConfig, SimulatedAdapter};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "beacon-sim", about = "LifeBeacon phone sensor simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Seed for both the phone and the engine RNG (reproducible runs)
    #[arg(long)]
    seed: Option<u64>,
    /// Scenario preset to load on startup (earthquake, trapped, no_gps, ...)
    #[arg(long)]
    preset: Option<String>,
    /// Control panel WebSocket port
    #[arg(long, default_value = "9191")]
    ctrl_port: u16,
    /// Where the manual trigger takes its magnitude from
    #[arg(long, value_parser = ["simulated", "measured"])]
    magnitude_source: Option<String>,
    /// Disable automatic detection; only the manual trigger fires
    #[arg(long)]
    no_auto_detect: bool,
}

// ── Shared state ──────────────────────────────────────────────────────────────

struct AppState {
    runtime: BeaconRuntime<SimulatedAdapter>,
    /// Control handle onto the same phone the runtime reads
    sim: SimulatedAdapter,
}

type SharedState = Arc<AppState>;

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_sim=info,sensor_simulator=info,beacon_engine=info".into()),
        )
        .init();

    let args = Args::parse();

    // Load config
    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let cfg: FullConfig = toml::from_str(&config_str).context("Invalid config.toml")?;

    let mut engine = cfg.engine.with_env_overrides();
    let mut phone = cfg.simulator;
    if let Some(seed) = args.seed {
        engine.simulation.seed = Some(seed);
        phone.seed = Some(seed);
    }
    if args.no_auto_detect {
        engine.detection.automatic = false;
    }
    match args.magnitude_source.as_deref() {
        Some("measured") => engine.detection.manual_magnitude_source = MagnitudeSource::Measured,
        Some("simulated") => engine.detection.manual_magnitude_source = MagnitudeSource::Simulated,
        _ => {}
    }

    let scenario = match &args.preset {
        Some(name) => scenarios::preset(name).with_context(|| format!("Unknown preset: {name}"))?,
        None => cfg.scenario,
    };

    info!(
        "📱 LifeBeacon simulator starting at {:.4}, {:.4}, scenario {:?}",
        phone.base_lat, phone.base_lng, scenario.active
    );

    let sim = SimulatedAdapter::new(phone, engine.audio.clone(), scenario);
    let runtime = BeaconRuntime::start(engine, sim.clone())
        .await
        .context("Engine failed to start")?;
    info!("Beacon status: {}", runtime.status().await);

    let state: SharedState = Arc::new(AppState { runtime, sim });

    // Control WebSocket server
    let ctrl_addr = format!("0.0.0.0:{}", args.ctrl_port);
    info!("🖥  Control panel WebSocket at ws://{ctrl_addr}/ws");

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/health", get(|| async { "beacon-sim ok" }))
        .with_state(state.clone())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let listener = tokio::net::TcpListener::bind(&ctrl_addr)
        .await
        .with_context(|| format!("Failed to bind {ctrl_addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Control server failed")?;

    state.runtime.shutdown().await;
    info!("👋 Simulator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl-C handler failed: {e}");
        std::future::pending::<()>().await;
    }
}

// ── HTTP / WebSocket ──────────────────────────────────────────────────────────

async fn snapshot_handler(State(state): State<SharedState>) -> Json<BeaconSnapshot> {
    Json(state.runtime.latest().as_ref().clone())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

fn snapshot_message(snapshot: &BeaconSnapshot) -> String {
    json!({"type": "snapshot", "data": snapshot}).to_string()
}

async fn handle_ws(mut socket: WebSocket, state: SharedState) {
    let mut snapshots = state.runtime.subscribe();

    // Send current state immediately on connect
    let current = snapshot_message(&state.runtime.latest());
    if socket.send(Message::Text(current)).await.is_err() {
        return;
    }
    let scenario = json!({"type": "scenario", "data": state.sim.scenario()}).to_string();
    let _ = socket.send(Message::Text(scenario)).await;

    loop {
        tokio::select! {
            // Relay snapshots to client
            changed = snapshots.changed() => {
                if changed.is_err() { break; }
                let msg = snapshot_message(&snapshots.borrow_and_update());
                if socket.send(Message::Text(msg)).await.is_err() { break; }
            }
            // Handle commands from the control panel
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(cmd))) => {
                    if let Some(reply) = handle_command(&state, &cmd).await {
                        if socket.send(Message::Text(reply)).await.is_err() { break; }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Handle one control command; returns the acknowledgement to send back.
async fn handle_command(state: &SharedState, raw: &str) -> Option<String> {
    let v: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Malformed control message: {e}");
            return None;
        }
    };
    let cmd = v["cmd"].as_str().unwrap_or("");
    let detail = match cmd {
        "trigger" => {
            let snapshot = state.runtime.trigger_emergency().await;
            info!("🚨 Emergency protocol triggered from control panel");
            json!({ "earthquake": snapshot.earthquake })
        }
        "sos" => {
            let count = state.runtime.send_sos().await;
            info!("📡 SOS broadcast #{count}");
            json!({ "sosSignalsSent": count })
        }
        "refresh_gps" => {
            state.runtime.refresh_gps();
            json!({})
        }
        "pause" => {
            state.sim.pause();
            info!("⏸ Sensors paused");
            json!({})
        }
        "resume" => {
            state.sim.resume();
            info!("▶ Sensors resumed");
            json!({})
        }
        "status" => json!({ "status": state.runtime.status().await, "paused": state.sim.is_paused() }),
        "set_scenario" => match serde_json::from_value::<ScenarioConfig>(v["args"].clone()) {
            Ok(sc) => {
                state.sim.set_scenario(sc);
                info!("🎭 Scenario updated");
                json!({ "scenario": state.sim.scenario() })
            }
            Err(e) => {
                warn!("Bad scenario: {e}");
                return Some(json!({"type": "error", "cmd": cmd, "message": e.to_string()}).to_string());
            }
        },
        "preset" => {
            let name = v["args"]["name"].as_str().unwrap_or("");
            match scenarios::preset(name) {
                Some(sc) => {
                    state.sim.set_scenario(sc);
                    info!("🎭 Preset '{name}' loaded");
                    json!({ "scenario": state.sim.scenario() })
                }
                None => {
                    warn!("Unknown preset: {name}");
                    return Some(json!({"type": "error", "cmd": cmd, "message": "unknown preset"}).to_string());
                }
            }
        }
        _ => {
            warn!("Unknown control command: {cmd}");
            return None;
        }
    };
    Some(json!({"type": "ack", "cmd": cmd, "data": detail}).to_string())
}

// ── Config structs ────────────────────────────────────────────────────────────

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct FullConfig {
    engine: EngineConfig,
    simulator: SimConfig,
    scenario: ScenarioConfig,
}
