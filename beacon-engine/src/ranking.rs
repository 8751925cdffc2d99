//! Rescue priority ranking.
//!
//! Victims are scored by status weight plus a low-battery bonus, then sorted
//! descending. The sort is stable: equal scores keep their input order.

use beacon_types::{RescueResource, VictimRecord, VictimStatus};

/// A beacon below this charge may go dark before help arrives.
const LOW_BATTERY_PCT: u8 = 30;
const LOW_BATTERY_BONUS: u32 = 5;

pub fn status_weight(status: VictimStatus) -> u32 {
    match status {
        VictimStatus::Trapped => 10,
        VictimStatus::Injured => 7,
        VictimStatus::Safe => 3,
    }
}

pub fn priority_score(victim: &VictimRecord) -> u32 {
    let bonus = if victim.battery_pct < LOW_BATTERY_PCT { LOW_BATTERY_BONUS } else { 0 };
    status_weight(victim.status) + bonus
}

pub fn rank_victims(victims: &[VictimRecord]) -> Vec<VictimRecord> {
    let mut scored: Vec<(u32, &VictimRecord)> = victims.iter().map(|v| (priority_score(v), v)).collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, v)| v.clone()).collect()
}

/// Available resources first; order within each group is kept.
pub fn rank_resources(resources: &[RescueResource]) -> Vec<RescueResource> {
    let mut ranked = resources.to_vec();
    ranked.sort_by_key(|r| !r.available);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn victim(id: u32, status: VictimStatus, battery_pct: u8) -> VictimRecord {
        VictimRecord { id, name: format!("v{id}"), lat: 0.0, lng: 0.0, status, battery_pct }
    }

    #[test]
    fn ranking_is_stable_for_equal_scores() {
        // trapped/10 → 15, injured/50 → 7, trapped/90 → 10
        let input = vec![
            victim(1, VictimStatus::Trapped, 10),
            victim(2, VictimStatus::Injured, 50),
            victim(3, VictimStatus::Trapped, 90),
        ];
        let ranked: Vec<u32> = rank_victims(&input).iter().map(|v| v.id).collect();
        assert_eq!(ranked, vec![1, 3, 2]);

        let ties = vec![
            victim(7, VictimStatus::Injured, 80),
            victim(8, VictimStatus::Injured, 60),
            victim(9, VictimStatus::Injured, 40),
        ];
        let ranked: Vec<u32> = rank_victims(&ties).iter().map(|v| v.id).collect();
        assert_eq!(ranked, vec![7, 8, 9]);
    }

    #[test]
    fn low_battery_can_outrank_status() {
        // injured/20 → 12 beats trapped/95 → 10
        let ranked = rank_victims(&[victim(1, VictimStatus::Trapped, 95), victim(2, VictimStatus::Injured, 20)]);
        assert_eq!(ranked[0].id, 2);
        assert_eq!(priority_score(&victim(3, VictimStatus::Safe, 29)), 8);
        assert_eq!(priority_score(&victim(3, VictimStatus::Safe, 30)), 3);
    }

    #[test]
    fn resources_available_first() {
        let r = |kind: &str, available| RescueResource { kind: kind.into(), available, location: String::new() };
        let ranked = rank_resources(&[r("a", false), r("b", true), r("c", false), r("d", true)]);
        let kinds: Vec<&str> = ranked.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn empty_input_ranks_empty() {
        assert!(rank_victims(&[]).is_empty());
    }
}
