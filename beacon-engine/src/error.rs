//! Error taxonomy for adapter-layer failures.
//!
//! None of these escape a tick loop: the session maps each one to a degraded
//! [`SystemStatus`](beacon_types::SystemStatus) or a retained reading.

use beacon_types::Capability;
use thiserror::Error;

pub type BeaconResult<T> = Result<T, BeaconError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BeaconError {
    /// The user (or platform policy) rejected a permission prompt
    #[error("{capability} permission denied")]
    PermissionDenied { capability: Capability },

    /// Platform API absent; the adapter falls back to simulated data
    #[error("{capability} not supported on this platform")]
    UnsupportedCapability { capability: Capability },

    /// No reading arrived before the deadline
    #[error("{capability} acquisition timed out after {waited_ms} ms")]
    AcquisitionTimeout { capability: Capability, waited_ms: u64 },

    /// A single reading was missing; the previous value is kept
    #[error("{capability} reading missing, keeping previous value")]
    TransientSensorGap { capability: Capability },

    /// The adapter went away (stream closed, task aborted)
    #[error("sensor adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BeaconError {
    pub fn capability(&self) -> Option<Capability> {
        match self {
            BeaconError::PermissionDenied { capability }
            | BeaconError::UnsupportedCapability { capability }
            | BeaconError::AcquisitionTimeout { capability, .. }
            | BeaconError::TransientSensorGap { capability } => Some(*capability),
            BeaconError::AdapterUnavailable(_) | BeaconError::Config(_) => None,
        }
    }
}
