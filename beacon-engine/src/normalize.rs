//! Raw adapter events → normalized sample slices.
//!
//! Platforms deliver partial readings: motion events with null axes,
//! orientation events with no angles, empty analyser frames. Motion falls
//! back through gravity → linear → rotation-rate → a simulated resting
//! vector. Other slices report a [`BeaconError::TransientSensorGap`] so the
//! caller keeps the previous value.

use beacon_types::{
    Acceleration, AudioLevel, Capability, Gyroscope, LocationErrorKind, LocationFix, LocationState,
    MotionSource, RawAudioFrame, RawBattery, RawMotion, RawOrientation, RawPosition,
};

use crate::error::{BeaconError, BeaconResult};

/// Standard gravity, m/s²
pub const GRAVITY: f64 = 9.81;

/// Rotation rate (deg/s) is scaled by this to stand in for acceleration.
const ROTATION_PROXY_SCALE: f64 = 0.1;

/// Resting vector used when a motion event carries no usable axes.
const RESTING_VECTOR: (f64, f64, f64) = (0.0001, 0.0001, GRAVITY);

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn magnitude(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

pub fn normalize_motion(raw: &RawMotion, decimals: u32) -> Acceleration {
    let picked = raw
        .acceleration_including_gravity
        .and_then(|v| v.complete())
        .map(|v| (v, MotionSource::Gravity))
        .or_else(|| raw.acceleration.and_then(|v| v.complete()).map(|v| (v, MotionSource::Linear)))
        .or_else(|| {
            raw.rotation_rate
                .filter(|r| r.alpha.is_some() || r.beta.is_some() || r.gamma.is_some())
                .map(|r| {
                    (
                        (
                            r.alpha.unwrap_or(0.0) * ROTATION_PROXY_SCALE,
                            r.beta.unwrap_or(0.0) * ROTATION_PROXY_SCALE,
                            r.gamma.unwrap_or(0.0) * ROTATION_PROXY_SCALE,
                        ),
                        MotionSource::Rotation,
                    )
                })
        });

    let ((x, y, z), source) = picked.unwrap_or((RESTING_VECTOR, MotionSource::Simulated));
    Acceleration {
        x: round_to(x, decimals),
        y: round_to(y, decimals),
        z: round_to(z, decimals),
        magnitude: round_to(magnitude(x, y, z), decimals),
        timestamp_ms: raw.timestamp_ms,
        source,
    }
}

pub fn normalize_orientation(raw: &RawOrientation, decimals: u32) -> BeaconResult<Gyroscope> {
    if raw.alpha.is_none() && raw.beta.is_none() && raw.gamma.is_none() {
        return Err(BeaconError::TransientSensorGap { capability: Capability::Gyroscope });
    }
    Ok(Gyroscope {
        alpha: round_to(raw.alpha.unwrap_or(0.0), decimals),
        beta: round_to(raw.beta.unwrap_or(0.0), decimals),
        gamma: round_to(raw.gamma.unwrap_or(0.0), decimals),
        timestamp_ms: raw.timestamp_ms,
        compass: raw.alpha.map(|a| round_to(a, 1)),
    })
}

pub fn normalize_position(raw: &RawPosition, decimals: u32) -> BeaconResult<LocationFix> {
    if !raw.latitude.is_finite() || !raw.longitude.is_finite() || !raw.accuracy_m.is_finite() {
        return Err(BeaconError::TransientSensorGap { capability: Capability::Geolocation });
    }
    Ok(LocationFix {
        lat: round_to(raw.latitude, decimals),
        lng: round_to(raw.longitude, decimals),
        accuracy_meters: raw.accuracy_m.round(),
        timestamp_ms: raw.timestamp_ms,
    })
}

/// The error state shown in place of coordinates.
pub fn location_error(kind: LocationErrorKind) -> LocationState {
    let reason = match kind {
        LocationErrorKind::PermissionDenied => "Permission Required",
        LocationErrorKind::PositionUnavailable | LocationErrorKind::Timeout => "Location Unavailable",
    };
    LocationState::Error { reason: reason.to_string() }
}

/// Mean bin magnitude and the centre frequency of the loudest bin.
pub fn normalize_audio(frame: &RawAudioFrame) -> BeaconResult<AudioLevel> {
    if frame.bins.is_empty() {
        return Err(BeaconError::TransientSensorGap { capability: Capability::Microphone });
    }
    let sum: u64 = frame.bins.iter().map(|&b| b as u64).sum();
    let mean = sum as f64 / frame.bins.len() as f64;

    // fft_size = 2 × bin count, so bin width = sample_rate / fft_size
    let bin_width_hz = frame.sample_rate_hz / (2.0 * frame.bins.len() as f64);
    let dominant_frequency_hz = frame
        .bins
        .iter()
        .enumerate()
        .filter(|(_, &b)| b > 0)
        .max_by_key(|(_, &b)| b)
        .map(|(i, _)| i as f64 * bin_width_hz)
        .unwrap_or(0.0);

    Ok(AudioLevel {
        amplitude: mean.round().clamp(0.0, 255.0) as u8,
        dominant_frequency_hz,
    })
}

/// Battery percent and charging flag, keeping previous values for missing fields.
pub fn normalize_battery(raw: &RawBattery, previous_pct: u8, previous_charging: bool) -> (u8, bool) {
    let pct = raw
        .level
        .filter(|l| l.is_finite())
        .map(|l| (l * 100.0).round().clamp(0.0, 100.0) as u8)
        .unwrap_or(previous_pct);
    (pct, raw.charging.unwrap_or(previous_charging))
}
