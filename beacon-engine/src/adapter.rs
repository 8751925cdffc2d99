//! # adapter
//!
//! The seam between the engine and whatever produces raw readings: a
//! platform bridge on a real device, or the simulator.
//!
//! Adapters push [`SensorEvent`]s into an mpsc sink from streams they own and
//! return the task handles so the runtime can cancel them. One-shot location
//! requests go through [`acquire_location`], which applies the timeout,
//! relaxed retry and accuracy refinement policy.

use std::future::Future;

use beacon_types::{Capability, CapabilityCheck, LocationErrorKind, LocationState, RawPosition, SensorEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::LocationConfig;
use crate::error::{BeaconError, BeaconResult};
use crate::normalize::{location_error, normalize_position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationAccuracy {
    /// GPS-grade fix, slower and more power hungry
    High,
    /// Network or cached fix
    Relaxed,
}

pub trait SensorAdapter: Send + Sync + 'static {
    /// Check the adapter is reachable at all. An error here means the
    /// whole initialization failed.
    fn open(&self) -> impl Future<Output = BeaconResult<()>> + Send;

    /// Probe (and if needed prompt for) one capability.
    fn request(&self, capability: Capability) -> impl Future<Output = CapabilityCheck> + Send;

    /// Start one stream per granted capability plus the battery stream.
    /// Each returned handle is the stream's cancellation path.
    fn start_streams(&self, granted: &[Capability], sink: mpsc::Sender<SensorEvent>) -> Vec<JoinHandle<()>>;

    /// One position fix. Callers wrap this in their own timeout.
    fn request_location(&self, accuracy: LocationAccuracy) -> impl Future<Output = BeaconResult<RawPosition>> + Send;

    /// Release platform resources (audio context, location watch).
    fn teardown(&self) -> impl Future<Output = ()> + Send;
}

// ── Location acquisition ──────────────────────────────────────────────────────

async fn fix_with_timeout<A: SensorAdapter>(
    adapter: &A,
    accuracy: LocationAccuracy,
    cfg: &LocationConfig,
) -> BeaconResult<RawPosition> {
    match tokio::time::timeout(cfg.fix_timeout(), adapter.request_location(accuracy)).await {
        Ok(result) => result,
        Err(_) => Err(BeaconError::AcquisitionTimeout {
            capability: Capability::Geolocation,
            waited_ms: cfg.fix_timeout_ms,
        }),
    }
}

/// Location state after one acquisition attempt.
///
/// A high-accuracy request is tried first. Anything but a permission denial
/// gets one relaxed retry. A fix coarser than `refine_accuracy_m` gets one
/// high-accuracy re-request after `refine_delay`; the finer of the two wins.
pub async fn acquire_location<A: SensorAdapter>(adapter: &A, cfg: &LocationConfig, decimals: u32) -> LocationState {
    let first = match fix_with_timeout(adapter, LocationAccuracy::High, cfg).await {
        Ok(raw) => Ok(raw),
        Err(BeaconError::PermissionDenied { .. }) => {
            warn!("Location permission denied");
            return location_error(LocationErrorKind::PermissionDenied);
        }
        Err(e) => {
            warn!("High-accuracy fix failed ({e}), retrying relaxed");
            fix_with_timeout(adapter, LocationAccuracy::Relaxed, cfg).await
        }
    };

    let raw = match first {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Location unavailable: {e}");
            let kind = match e {
                BeaconError::PermissionDenied { .. } => LocationErrorKind::PermissionDenied,
                BeaconError::AcquisitionTimeout { .. } => LocationErrorKind::Timeout,
                _ => LocationErrorKind::PositionUnavailable,
            };
            return location_error(kind);
        }
    };

    let raw = if raw.accuracy_m > cfg.refine_accuracy_m {
        info!("Fix accuracy {:.0} m is coarse, refining in {} ms", raw.accuracy_m, cfg.refine_delay_ms);
        tokio::time::sleep(cfg.refine_delay()).await;
        match fix_with_timeout(adapter, LocationAccuracy::High, cfg).await {
            Ok(refined) if refined.accuracy_m < raw.accuracy_m => refined,
            Ok(_) => raw,
            Err(e) => {
                warn!("Refinement failed ({e}), keeping coarse fix");
                raw
            }
        }
    } else {
        raw
    };

    match normalize_position(&raw, decimals) {
        Ok(fix) => LocationState::Fix(fix),
        Err(e) => {
            warn!("Discarding malformed fix: {e}");
            location_error(LocationErrorKind::PositionUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays a fixed list of location responses; `None` never resolves.
    struct ScriptedFixes {
        responses: Mutex<VecDeque<Option<BeaconResult<RawPosition>>>>,
        requested: Mutex<Vec<LocationAccuracy>>,
    }

    impl ScriptedFixes {
        fn new(responses: Vec<Option<BeaconResult<RawPosition>>>) -> Self {
            Self { responses: Mutex::new(responses.into()), requested: Mutex::new(Vec::new()) }
        }

        fn requested(&self) -> Vec<LocationAccuracy> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl SensorAdapter for ScriptedFixes {
        async fn open(&self) -> BeaconResult<()> {
            Ok(())
        }

        async fn request(&self, _capability: Capability) -> CapabilityCheck {
            CapabilityCheck::Available { simulated: false }
        }

        fn start_streams(&self, _granted: &[Capability], _sink: mpsc::Sender<SensorEvent>) -> Vec<JoinHandle<()>> {
            Vec::new()
        }

        async fn request_location(&self, accuracy: LocationAccuracy) -> BeaconResult<RawPosition> {
            self.requested.lock().unwrap().push(accuracy);
            let next = self.responses.lock().unwrap().pop_front().flatten();
            match next {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }

        async fn teardown(&self) {}
    }

    fn pos(accuracy_m: f64) -> RawPosition {
        RawPosition { latitude: 37.7749, longitude: -122.4194, accuracy_m, timestamp_ms: 0 }
    }

    fn cfg() -> LocationConfig {
        LocationConfig::default()
    }

    #[tokio::test(start_paused = true)]
    async fn accurate_fix_is_used_directly() {
        let adapter = ScriptedFixes::new(vec![Some(Ok(pos(12.0)))]);
        let state = acquire_location(&adapter, &cfg(), 6).await;
        assert_eq!(state.fix().map(|f| f.accuracy_meters), Some(12.0));
        assert_eq!(adapter.requested(), vec![LocationAccuracy::High]);
    }

    #[tokio::test(start_paused = true)]
    async fn coarse_fix_is_refined_once() {
        let adapter = ScriptedFixes::new(vec![Some(Ok(pos(450.0))), Some(Ok(pos(15.0)))]);
        let started = tokio::time::Instant::now();
        let state = acquire_location(&adapter, &cfg(), 6).await;
        assert_eq!(state.fix().map(|f| f.accuracy_meters), Some(15.0));
        assert!(started.elapsed() >= Duration::from_millis(5000));
        assert_eq!(adapter.requested(), vec![LocationAccuracy::High, LocationAccuracy::High]);
    }

    #[tokio::test(start_paused = true)]
    async fn refinement_never_makes_it_worse() {
        let adapter = ScriptedFixes::new(vec![Some(Ok(pos(150.0))), Some(Ok(pos(900.0)))]);
        let state = acquire_location(&adapter, &cfg(), 6).await;
        assert_eq!(state.fix().map(|f| f.accuracy_meters), Some(150.0));
        assert_eq!(adapter.requested().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_retries_relaxed_then_gives_up() {
        let adapter = ScriptedFixes::new(vec![None, None]);
        let state = acquire_location(&adapter, &cfg(), 6).await;
        assert_eq!(state, LocationState::Error { reason: "Location Unavailable".into() });
        assert_eq!(adapter.requested(), vec![LocationAccuracy::High, LocationAccuracy::Relaxed]);
    }

    #[tokio::test(start_paused = true)]
    async fn relaxed_retry_can_succeed() {
        let unavailable = BeaconError::AdapterUnavailable("no satellites".into());
        let adapter = ScriptedFixes::new(vec![Some(Err(unavailable)), Some(Ok(pos(60.0)))]);
        let state = acquire_location(&adapter, &cfg(), 6).await;
        assert!(state.fix().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn denial_is_not_retried() {
        let denied = BeaconError::PermissionDenied { capability: Capability::Geolocation };
        let adapter = ScriptedFixes::new(vec![Some(Err(denied))]);
        let state = acquire_location(&adapter, &cfg(), 6).await;
        assert_eq!(state, LocationState::Error { reason: "Permission Required".into() });
        assert_eq!(adapter.requested().len(), 1);
    }
}
