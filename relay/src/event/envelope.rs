//! Event envelope: turn id, monotonic sequence number, wall-clock timestamp, kind.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::kind::EventKind;

/// One envelope in the per-turn event stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub turn_id: String,
    pub seq: u64,
    pub ts_ms: i64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(turn_id: impl Into<String>, seq: u64, kind: EventKind) -> Self {
        Self {
            turn_id: turn_id.into(),
            seq,
            ts_ms: Utc::now().timestamp_millis(),
            kind,
        }
    }
}
