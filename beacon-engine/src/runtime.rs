//! # runtime
//!
//! Async driver around a [`Session`].
//!
//! `BeaconRuntime::start` probes the adapter, starts its streams and spawns:
//! - the ingest loop (adapter mpsc → session slices)
//! - the analysis tick (2 s) and physics tick (1 s)
//! - the debounced map refresh, woken by location changes
//! - location acquisitions (initial and on `refresh_gps`)
//!
//! Every task handle is kept. `shutdown` tears the adapter down and aborts
//! them all; dropping the runtime aborts whatever is left.

use std::sync::{Arc, Mutex};

use beacon_types::{BeaconSnapshot, Capability, CapabilityEntry, SystemStatus};
use chrono::Utc;
use tokio::sync::{mpsc, watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::adapter::{acquire_location, SensorAdapter};
use crate::config::EngineConfig;
use crate::error::BeaconResult;
use crate::session::Session;

pub type SharedSession = Arc<RwLock<Session>>;
type SnapshotTx = Arc<watch::Sender<Arc<BeaconSnapshot>>>;

/// Capacity of the adapter → engine event channel.
const EVENT_BUFFER: usize = 256;

pub struct BeaconRuntime<A: SensorAdapter> {
    session: SharedSession,
    adapter: Arc<A>,
    snapshots: SnapshotTx,
    location_changed: Arc<Notify>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

async fn publish(session: &SharedSession, tx: &SnapshotTx) {
    let snapshot = session.read().await.snapshot(Utc::now());
    tx.send_replace(Arc::new(snapshot));
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

async fn run_ingest(
    session: SharedSession,
    mut events: mpsc::Receiver<beacon_types::SensorEvent>,
    location_changed: Arc<Notify>,
    snapshots: SnapshotTx,
) {
    while let Some(event) = events.recv().await {
        let outcome = session.write().await.ingest(event, Utc::now());
        if outcome.location_changed {
            location_changed.notify_one();
        }
        if outcome.auto_triggered {
            location_changed.notify_one();
            publish(&session, &snapshots).await;
        }
    }
    warn!("Sensor streams closed, ingest loop exiting");
}

async fn run_analysis_tick(session: SharedSession, snapshots: SnapshotTx) {
    let period = session.read().await.config().ticks.analysis();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        session.write().await.analysis_tick(Utc::now());
        publish(&session, &snapshots).await;
    }
}

async fn run_physics_tick(session: SharedSession, snapshots: SnapshotTx) {
    let period = session.read().await.config().ticks.physics();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        session.write().await.physics_tick(Utc::now());
        publish(&session, &snapshots).await;
    }
}

/// Refresh the map once the location has been quiet for the debounce period.
async fn run_map_debounce(
    session: SharedSession,
    location_changed: Arc<Notify>,
    snapshots: SnapshotTx,
) {
    let quiet = session.read().await.config().ticks.map_debounce();
    loop {
        location_changed.notified().await;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(quiet) => break,
                _ = location_changed.notified() => continue,
            }
        }
        if session.write().await.refresh_map(Utc::now()) {
            debug!("Map refreshed");
            publish(&session, &snapshots).await;
        }
    }
}

async fn run_location_fix<A: SensorAdapter>(
    adapter: Arc<A>,
    session: SharedSession,
    location_changed: Arc<Notify>,
    snapshots: SnapshotTx,
) {
    let (location_cfg, decimals) = {
        let s = session.read().await;
        (s.config().location.clone(), s.config().precision.location_decimals)
    };
    let state = acquire_location(adapter.as_ref(), &location_cfg, decimals).await;
    match state.fix() {
        Some(fix) => info!("Location fix {:.6}, {:.6} ±{} m", fix.lat, fix.lng, fix.accuracy_meters),
        None => warn!("No location fix: {state:?}"),
    }
    if session.write().await.set_location(state, Utc::now()) {
        location_changed.notify_one();
    }
    publish(&session, &snapshots).await;
}

// ── Runtime ───────────────────────────────────────────────────────────────────

impl<A: SensorAdapter> BeaconRuntime<A> {
    /// Initialize a session against `adapter` and start every periodic task.
    ///
    /// Only an invalid configuration is an error. Adapter failures degrade
    /// the status and the runtime still runs so manual actions work.
    pub async fn start(config: EngineConfig, adapter: A) -> BeaconResult<Self> {
        config.validate()?;
        let adapter = Arc::new(adapter);
        let session: SharedSession = Arc::new(RwLock::new(Session::new(config)));
        let (snapshots, _) = watch::channel(Arc::new(BeaconSnapshot::initial(Utc::now())));
        let snapshots = Arc::new(snapshots);

        let runtime = Self {
            session: session.clone(),
            adapter: adapter.clone(),
            snapshots,
            location_changed: Arc::new(Notify::new()),
            tasks: Mutex::new(Vec::new()),
        };

        session.write().await.begin_initialization(Utc::now());
        publish(&session, &runtime.snapshots).await;

        let granted = match adapter.open().await {
            Ok(()) => runtime.probe_capabilities().await,
            Err(e) => {
                session.write().await.initialization_failed(&e.to_string(), Utc::now());
                Vec::new()
            }
        };
        info!("Session status: {}", session.read().await.status());

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let mut handles = adapter.start_streams(&granted, tx);
        handles.push(tokio::spawn(run_ingest(
            session.clone(),
            rx,
            runtime.location_changed.clone(),
            runtime.snapshots.clone(),
        )));
        handles.push(tokio::spawn(run_analysis_tick(session.clone(), runtime.snapshots.clone())));
        handles.push(tokio::spawn(run_physics_tick(session.clone(), runtime.snapshots.clone())));
        handles.push(tokio::spawn(run_map_debounce(
            session.clone(),
            runtime.location_changed.clone(),
            runtime.snapshots.clone(),
        )));
        runtime.track(handles);

        if granted.contains(&Capability::Geolocation) {
            runtime.refresh_gps();
        }
        publish(&session, &runtime.snapshots).await;
        Ok(runtime)
    }

    async fn probe_capabilities(&self) -> Vec<Capability> {
        let mut entries = Vec::with_capacity(Capability::ALL.len());
        for capability in Capability::ALL {
            let check = self.adapter.request(capability).await;
            debug!("{capability}: {check:?}");
            entries.push(CapabilityEntry { capability, check });
        }
        let granted = entries.iter().filter(|e| e.check.is_available()).map(|e| e.capability).collect();
        self.session.write().await.record_capabilities(entries, Utc::now());
        granted
    }

    fn track(&self, handles: Vec<JoinHandle<()>>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|h| !h.is_finished());
        tasks.extend(handles);
    }

    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<BeaconSnapshot>> {
        self.snapshots.subscribe()
    }

    pub fn latest(&self) -> Arc<BeaconSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub async fn status(&self) -> SystemStatus {
        self.session.read().await.status()
    }

    // ── User actions ──────────────────────────────────────────────────────────

    /// Manual emergency protocol. Works in every status, including degraded ones.
    pub async fn trigger_emergency(&self) -> Arc<BeaconSnapshot> {
        self.session.write().await.trigger_emergency(true, Utc::now());
        self.location_changed.notify_one();
        publish(&self.session, &self.snapshots).await;
        self.latest()
    }

    pub async fn send_sos(&self) -> u32 {
        let count = self.session.write().await.send_sos(Utc::now());
        publish(&self.session, &self.snapshots).await;
        count
    }

    /// Start a location acquisition in the background.
    pub fn refresh_gps(&self) {
        let handle = tokio::spawn(run_location_fix(
            self.adapter.clone(),
            self.session.clone(),
            self.location_changed.clone(),
            self.snapshots.clone(),
        ));
        self.track(vec![handle]);
    }

    /// Tear the adapter down and cancel every task.
    pub async fn shutdown(&self) {
        info!("Shutting down beacon runtime");
        self.adapter.teardown().await;
        let handles: Vec<_> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain(..).collect()
        };
        for handle in handles {
            handle.abort();
        }
    }

    /// Tasks not yet finished or aborted.
    pub fn active_tasks(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.iter().filter(|h| !h.is_finished()).count()
    }
}

impl<A: SensorAdapter> Drop for BeaconRuntime<A> {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(|e| e.into_inner());
        for handle in tasks.drain(..) {
            handle.abort();
        }
    }
}
