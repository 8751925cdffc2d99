//! Simulated collaborators: vital signs, mesh peers, rescue teams,
//! the communications feed, emergency contacts and nearby victims.
//!
//! None of these has a real data source. Every random draw goes through the
//! session's injected `Rng` so a seeded session replays exactly.

use beacon_types::{
    CommunicationState, ContactKind, EmergencyContact, EmergencyMessage, LatLng, MeshNetworkState, MessagePriority,
    RescueCoordinationState, RescueResource, RescueTeam, StressLevel, TeamStatus, VictimRecord, VictimStatus,
    VitalSigns,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::ranking;

// ── Vital signs ───────────────────────────────────────────────────────────────

pub fn stress_level(survival_probability: u8) -> StressLevel {
    match survival_probability {
        p if p < 50 => StressLevel::High,
        p if p < 70 => StressLevel::Medium,
        _ => StressLevel::Low,
    }
}

/// Heart rate is base ± 10 BPM; breathing is fixed per stress level.
pub fn vital_signs(survival_probability: u8, rng: &mut impl Rng) -> VitalSigns {
    let stress_level = stress_level(survival_probability);
    let (base_hr, breathing_boost) = match stress_level {
        StressLevel::High => (90, 6),
        StressLevel::Medium => (75, 3),
        StressLevel::Low => (65, 0),
    };
    let jitter: i32 = rng.gen_range(-10..=9);
    VitalSigns {
        heart_rate: (base_hr + jitter).max(0) as u32,
        breathing_rate: (16 + breathing_boost).clamp(10, 25),
        stress_level,
        conscious: true,
    }
}

// ── Mesh network ──────────────────────────────────────────────────────────────

pub const MESH_MESSAGES: [&str; 5] = [
    "Emergency beacon active - coordinates shared",
    "Rescue team ETA: 45 minutes",
    "Safe zone identified 200m northwest",
    "Medical team dispatched to sector 7",
    "All units: prioritize thermal signatures",
];

/// Messages kept in the outgoing queue each sync.
const MESH_QUEUE_LEN: usize = 3;

pub fn mesh_network(now: DateTime<Utc>, rng: &mut impl Rng) -> MeshNetworkState {
    let connected_devices: u32 = rng.gen_range(2..=9);
    MeshNetworkState {
        connected_devices,
        network_strength_pct: (connected_devices * 10).min(100) as u8,
        message_queue: MESH_MESSAGES[..MESH_QUEUE_LEN].iter().map(|m| m.to_string()).collect(),
        last_sync: Some(now),
    }
}

// ── Rescue coordination ───────────────────────────────────────────────────────

pub const RESCUE_ETA_LABEL: &str = "20-60 min";

pub fn rescue_teams() -> Vec<RescueTeam> {
    [
        (1, "Search & Rescue", TeamStatus::EnRoute, "35 min", 6),
        (2, "Medical", TeamStatus::Standby, "45 min", 4),
        (3, "K-9 Unit", TeamStatus::Deployed, "20 min", 3),
        (4, "Heavy Equipment", TeamStatus::Loading, "60 min", 8),
    ]
    .into_iter()
    .map(|(id, kind, status, eta, personnel)| RescueTeam {
        id,
        kind: kind.to_string(),
        status,
        eta_label: eta.to_string(),
        personnel,
    })
    .collect()
}

pub fn rescue_resources() -> Vec<RescueResource> {
    [
        ("Thermal Camera", true, "Unit 1"),
        ("Ground Radar", true, "Unit 3"),
        ("Medical Kit", true, "Unit 2"),
        ("Hydraulic Tools", false, "En Route"),
    ]
    .into_iter()
    .map(|(kind, available, location)| RescueResource {
        kind: kind.to_string(),
        available,
        location: location.to_string(),
    })
    .collect()
}

pub fn rescue_coordination(victims: &[VictimRecord]) -> RescueCoordinationState {
    RescueCoordinationState {
        teams: rescue_teams(),
        resources: ranking::rank_resources(&rescue_resources()),
        eta_label: Some(RESCUE_ETA_LABEL.to_string()),
        priority_queue: ranking::rank_victims(victims),
    }
}

// ── Victims ───────────────────────────────────────────────────────────────────

/// Three nearby beacons at fixed offsets from our own position.
pub fn nearby_victims(center: LatLng) -> Vec<VictimRecord> {
    [
        (1, "Victim Alpha", 0.001, 0.001, VictimStatus::Trapped, 45),
        (2, "Victim Beta", -0.0015, 0.0008, VictimStatus::Injured, 78),
        (3, "Victim Gamma", 0.0008, -0.0012, VictimStatus::Safe, 92),
    ]
    .into_iter()
    .map(|(id, name, dlat, dlng, status, battery_pct)| VictimRecord {
        id,
        name: name.to_string(),
        lat: center.lat + dlat,
        lng: center.lng + dlng,
        status,
        battery_pct,
    })
    .collect()
}

// ── Communications ────────────────────────────────────────────────────────────

pub const SOS_SENDER: &str = "YOU";
pub const SOS_TEXT: &str = "SOS Signal Sent - Location Confirmed";

fn message(from: &str, text: &str, priority: MessagePriority, time: DateTime<Utc>, rng: &mut impl Rng) -> EmergencyMessage {
    EmergencyMessage {
        id: Uuid::from_bytes(rng.gen::<[u8; 16]>()).to_string(),
        from: from.to_string(),
        message: text.to_string(),
        time,
        priority,
    }
}

/// Feed state at the moment an emergency starts.
pub fn seed_communications(
    now: DateTime<Utc>,
    auto_sos_signals: u32,
    rng: &mut impl Rng,
) -> CommunicationState {
    let emergency_messages = [
        ("Emergency Control", "Your location has been confirmed", MessagePriority::High),
        ("Rescue Team Alpha", "ETA 35 minutes to your position", MessagePriority::Medium),
        ("Medical Unit", "Vitals monitoring activated", MessagePriority::Low),
    ]
    .into_iter()
    .map(|(from, text, priority)| message(from, text, priority, now, rng))
    .collect();

    CommunicationState {
        emergency_messages,
        sos_signals: auto_sos_signals,
        last_contact: Some(now),
        signal_strength_pct: signal_strength(rng),
    }
}

/// Prepend the outgoing SOS and bump the counter.
pub fn record_sos(comms: &mut CommunicationState, now: DateTime<Utc>, rng: &mut impl Rng) {
    let sos = message(SOS_SENDER, SOS_TEXT, MessagePriority::Critical, now, rng);
    comms.emergency_messages.insert(0, sos);
    comms.sos_signals += 1;
    comms.last_contact = Some(now);
}

pub fn signal_strength(rng: &mut impl Rng) -> u8 {
    rng.gen_range(0..=99)
}

// ── Contacts ──────────────────────────────────────────────────────────────────

pub const EMERGENCY_NUMBER: &str = "911";

pub fn emergency_contacts() -> Vec<EmergencyContact> {
    [
        ("Emergency Services", ContactKind::Emergency),
        ("Local Fire Dept", ContactKind::Fire),
        ("Medical Emergency", ContactKind::Medical),
    ]
    .into_iter()
    .map(|(name, kind)| EmergencyContact {
        name: name.to_string(),
        number: EMERGENCY_NUMBER.to_string(),
        kind,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn vitals_follow_stress() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let high = vital_signs(30, &mut rng);
            assert_eq!(high.stress_level, StressLevel::High);
            assert!((80..=99).contains(&high.heart_rate));
            assert_eq!(high.breathing_rate, 22);

            let low = vital_signs(90, &mut rng);
            assert_eq!(low.stress_level, StressLevel::Low);
            assert!((55..=74).contains(&low.heart_rate));
            assert_eq!(low.breathing_rate, 16);
            assert!(low.conscious);
        }
        assert_eq!(stress_level(50), StressLevel::Medium);
        assert_eq!(stress_level(70), StressLevel::Low);
    }

    #[test]
    fn mesh_strength_tracks_device_count() {
        let mut rng = StdRng::seed_from_u64(8);
        let now = Utc::now();
        for _ in 0..200 {
            let mesh = mesh_network(now, &mut rng);
            assert!((2..=9).contains(&mesh.connected_devices));
            assert_eq!(u32::from(mesh.network_strength_pct), mesh.connected_devices * 10);
            assert_eq!(mesh.message_queue.len(), 3);
            assert_eq!(mesh.last_sync, Some(now));
        }
    }

    #[test]
    fn coordination_ranks_victims_and_resources() {
        let victims = nearby_victims(LatLng { lat: 10.0, lng: 20.0 });
        let state = rescue_coordination(&victims);
        assert_eq!(state.teams.len(), 4);
        assert_eq!(state.eta_label.as_deref(), Some("20-60 min"));
        assert_eq!(state.priority_queue[0].name, "Victim Alpha");
        assert_eq!(state.resources.last().map(|r| r.kind.as_str()), Some("Hydraulic Tools"));
    }

    #[test]
    fn victims_sit_around_our_position() {
        let victims = nearby_victims(LatLng { lat: 10.0, lng: 20.0 });
        assert_eq!(victims.len(), 3);
        assert!((victims[1].lat - 9.9985).abs() < 1e-9);
        assert!((victims[2].lng - 19.9988).abs() < 1e-9);
    }

    #[test]
    fn sos_is_prepended_and_counted() {
        let mut rng = StdRng::seed_from_u64(2);
        let now = Utc::now();
        let mut comms = seed_communications(now, 3, &mut rng);
        assert_eq!(comms.emergency_messages.len(), 3);
        assert_eq!(comms.sos_signals, 3);

        record_sos(&mut comms, now, &mut rng);
        assert_eq!(comms.sos_signals, 4);
        assert_eq!(comms.emergency_messages[0].from, SOS_SENDER);
        assert_eq!(comms.emergency_messages[0].priority, MessagePriority::Critical);
        assert_eq!(comms.emergency_messages[1].from, "Emergency Control");
    }

    #[test]
    fn three_contacts_all_911() {
        let contacts = emergency_contacts();
        assert_eq!(contacts.len(), 3);
        assert!(contacts.iter().all(|c| c.number == "911"));
    }
}
