//! # status
//!
//! Emergency state machine for `SystemStatus` and the detected flag.
//!
//! ```text
//! initializing → requesting_permissions → active_monitoring
//!                                       | limited_functionality
//!                                       | sensor_error
//!                                       | permission_denied
//!                                       | error
//!          (any state) → earthquake_detected   (terminal)
//! ```
//!
//! Every step returns the [`Transition`] it made so the session can journal
//! and log it. A step that would not change anything returns `None`.

use beacon_types::{CapabilityEntry, SystemStatus};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: SystemStatus,
    pub to: SystemStatus,
}

/// Minimum granted capabilities for full monitoring: `ceil(n / 2)`.
pub fn quorum(requested: usize) -> usize {
    requested.div_ceil(2)
}

/// Status implied by a finished round of capability checks.
pub fn classify(entries: &[CapabilityEntry]) -> SystemStatus {
    if entries.iter().any(|e| e.check.is_denied()) {
        return SystemStatus::PermissionDenied;
    }
    let granted = entries.iter().filter(|e| e.check.is_available()).count();
    if granted == 0 {
        SystemStatus::SensorError
    } else if granted >= quorum(entries.len()) {
        SystemStatus::ActiveMonitoring
    } else {
        SystemStatus::LimitedFunctionality
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusMachine {
    status: SystemStatus,
    earthquake_detected: bool,
}

impl StatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SystemStatus {
        self.status
    }

    pub fn earthquake_detected(&self) -> bool {
        self.earthquake_detected
    }

    /// Back to `initializing` for a fresh session.
    pub fn reset(&mut self) -> Option<Transition> {
        self.earthquake_detected = false;
        self.set(SystemStatus::Initializing)
    }

    /// The adapter is about to be probed.
    pub fn begin_permissions(&mut self) -> Option<Transition> {
        self.set_unless_detected(SystemStatus::RequestingPermissions)
    }

    /// All capability checks are back.
    pub fn resolve_capabilities(&mut self, entries: &[CapabilityEntry]) -> Option<Transition> {
        let granted = entries.iter().filter(|e| e.check.is_available()).count();
        info!("Capabilities resolved: {granted}/{} granted (quorum {})", entries.len(), quorum(entries.len()));
        self.set_unless_detected(classify(entries))
    }

    /// Initialization failed as a whole.
    pub fn adapter_failed(&mut self) -> Option<Transition> {
        self.set_unless_detected(SystemStatus::Error)
    }

    /// Manual or threshold trigger. Always succeeds; a repeat trigger
    /// changes nothing here but the caller still re-derives metrics.
    pub fn trigger(&mut self) -> Option<Transition> {
        self.earthquake_detected = true;
        self.set(SystemStatus::EarthquakeDetected)
    }

    fn set_unless_detected(&mut self, to: SystemStatus) -> Option<Transition> {
        if self.earthquake_detected {
            return None;
        }
        self.set(to)
    }

    fn set(&mut self, to: SystemStatus) -> Option<Transition> {
        if self.status == to {
            return None;
        }
        let from = std::mem::replace(&mut self.status, to);
        info!("Status: {from} → {to}");
        Some(Transition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::{Capability, CapabilityCheck};

    fn entries(checks: &[CapabilityCheck]) -> Vec<CapabilityEntry> {
        Capability::ALL
            .iter()
            .zip(checks)
            .map(|(c, check)| CapabilityEntry { capability: *c, check: check.clone() })
            .collect()
    }

    fn ok() -> CapabilityCheck {
        CapabilityCheck::Available { simulated: false }
    }

    fn missing() -> CapabilityCheck {
        CapabilityCheck::Unavailable { reason: "absent".into() }
    }

    #[test]
    fn quorum_is_half_rounded_up() {
        assert_eq!(quorum(5), 3);
        assert_eq!(quorum(4), 2);
        assert_eq!(quorum(1), 1);
        assert_eq!(quorum(0), 0);
    }

    #[test]
    fn classify_by_granted_count() {
        assert_eq!(classify(&entries(&[ok(), ok(), ok(), missing(), missing()])), SystemStatus::ActiveMonitoring);
        assert_eq!(classify(&entries(&[ok(), ok(), missing(), missing(), missing()])), SystemStatus::LimitedFunctionality);
        assert_eq!(classify(&entries(&[ok(), ok(), missing(), missing()])), SystemStatus::ActiveMonitoring);
        assert_eq!(classify(&entries(&[missing(), missing(), missing(), missing(), missing()])), SystemStatus::SensorError);
        assert_eq!(classify(&[]), SystemStatus::SensorError);
    }

    #[test]
    fn simulated_fallback_counts_as_granted() {
        let sim = CapabilityCheck::Available { simulated: true };
        assert_eq!(classify(&entries(&[sim.clone(), sim.clone(), sim, missing(), missing()])), SystemStatus::ActiveMonitoring);
    }

    #[test]
    fn any_denial_wins() {
        let denied = CapabilityCheck::Denied { reason: "user".into() };
        assert_eq!(classify(&entries(&[ok(), ok(), ok(), ok(), denied])), SystemStatus::PermissionDenied);
    }

    #[test]
    fn lifecycle_transitions() {
        let mut m = StatusMachine::new();
        assert_eq!(m.status(), SystemStatus::Initializing);
        assert_eq!(
            m.begin_permissions(),
            Some(Transition { from: SystemStatus::Initializing, to: SystemStatus::RequestingPermissions })
        );
        let t = m.resolve_capabilities(&entries(&[missing(), missing(), missing(), missing(), missing()]));
        assert_eq!(t.map(|t| t.to), Some(SystemStatus::SensorError));

        let t = m.trigger();
        assert_eq!(t, Some(Transition { from: SystemStatus::SensorError, to: SystemStatus::EarthquakeDetected }));
        assert!(m.earthquake_detected());
    }

    #[test]
    fn detected_is_terminal() {
        let mut m = StatusMachine::new();
        m.trigger();
        assert_eq!(m.resolve_capabilities(&entries(&[ok(), ok(), ok(), ok(), ok()])), None);
        assert_eq!(m.adapter_failed(), None);
        assert_eq!(m.trigger(), None);
        assert_eq!(m.status(), SystemStatus::EarthquakeDetected);

        m.reset();
        assert_eq!(m.status(), SystemStatus::Initializing);
        assert!(!m.earthquake_detected());
    }
}
