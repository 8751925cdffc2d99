//! # journal
//!
//! SHA-256 chained session journal.
//!
//! Every critical session event (status change, emergency trigger, SOS, GPS
//! refresh) is appended as a block whose hash covers the previous block's
//! hash. Editing any block breaks the chain, which [`Journal::verify_chain`]
//! detects. The journal lives in memory for the lifetime of the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::status::Transition;

// ── Event kinds ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalKind {
    /// SystemStatus moved from one state to another
    StatusChange,
    /// Manual or threshold trigger, with the derived metrics
    EmergencyTriggered,
    /// User pressed SOS
    SosSent,
    /// Location refresh finished (fix or error state)
    GpsRefresh,
}

impl JournalKind {
    fn as_str(&self) -> &'static str {
        match self {
            JournalKind::StatusChange => "STATUS_CHANGE",
            JournalKind::EmergencyTriggered => "EMERGENCY_TRIGGERED",
            JournalKind::SosSent => "SOS_SENT",
            JournalKind::GpsRefresh => "GPS_REFRESH",
        }
    }
}

impl std::fmt::Display for JournalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Block ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalBlock {
    pub seq: u64,
    pub timestamp_ms: i64,
    /// Genesis block: 64 zeros
    pub prev_hash: String,
    pub kind: JournalKind,
    pub payload_json: String,
    /// SHA-256 of (prev_hash || timestamp_ms || kind || payload_json)
    pub block_hash: String,
}

impl JournalBlock {
    fn compute_hash(prev_hash: &str, timestamp_ms: i64, kind: JournalKind, payload_json: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(timestamp_ms.to_le_bytes());
        hasher.update(kind.as_str().as_bytes());
        hasher.update(payload_json.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn new(seq: u64, timestamp_ms: i64, prev_hash: String, kind: JournalKind, payload_json: String) -> Self {
        let block_hash = Self::compute_hash(&prev_hash, timestamp_ms, kind, &payload_json);
        Self { seq, timestamp_ms, prev_hash, kind, payload_json, block_hash }
    }

    pub fn verify(&self) -> bool {
        Self::compute_hash(&self.prev_hash, self.timestamp_ms, self.kind, &self.payload_json) == self.block_hash
    }
}

pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

// ── Journal ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Journal {
    blocks: Vec<JournalBlock>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[JournalBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn last_hash(&self) -> &str {
        self.blocks.last().map(|b| b.block_hash.as_str()).unwrap_or(GENESIS_HASH)
    }

    /// Append one block. This is the single write path.
    pub fn append(&mut self, at: DateTime<Utc>, kind: JournalKind, payload: serde_json::Value) -> &JournalBlock {
        let block = JournalBlock::new(
            self.blocks.len() as u64,
            at.timestamp_millis(),
            self.last_hash().to_string(),
            kind,
            payload.to_string(),
        );
        debug!("Journal[{}]: {} {}", block.seq, block.kind, block.block_hash);
        self.blocks.push(block);
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn log_transition(&mut self, at: DateTime<Utc>, transition: Transition) {
        self.append(
            at,
            JournalKind::StatusChange,
            serde_json::json!({ "from": transition.from, "to": transition.to }),
        );
    }

    pub fn log_trigger(&mut self, at: DateTime<Utc>, manual: bool, metrics: &beacon_types::EarthquakeMetrics) {
        self.append(
            at,
            JournalKind::EmergencyTriggered,
            serde_json::json!({ "manual": manual, "metrics": metrics }),
        );
    }

    pub fn log_sos(&mut self, at: DateTime<Utc>, sos_signals: u32) {
        self.append(at, JournalKind::SosSent, serde_json::json!({ "sosSignals": sos_signals }));
    }

    pub fn log_gps_refresh(&mut self, at: DateTime<Utc>, location: &beacon_types::LocationState) {
        self.append(at, JournalKind::GpsRefresh, serde_json::json!({ "location": location }));
    }

    /// Index of the first broken block, if any.
    pub fn first_broken(&self) -> Option<usize> {
        let mut prev = GENESIS_HASH;
        for (i, block) in self.blocks.iter().enumerate() {
            if block.prev_hash != prev || block.seq != i as u64 || !block.verify() {
                return Some(i);
            }
            prev = block.block_hash.as_str();
        }
        None
    }

    pub fn verify_chain(&self) -> bool {
        match self.first_broken() {
            None => true,
            Some(i) => {
                warn!("Journal chain broken at block {i}");
                false
            }
        }
    }
}
