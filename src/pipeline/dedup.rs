//! Per-subject last-seen timestamp tracking
//!
//! The tracker is owned by the pipeline task and lives exactly as long as
//! it does. State is process-local and lost on restart; the telemetry store
//! stays the durable source of truth, so a restart risks at most one
//! re-delivery, which the ledger's uniqueness constraint absorbs.

use std::collections::HashMap;

/// How a snapshot timestamp compares to the last one admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Strictly newer than anything seen; admit.
    Fresh,
    /// Exactly the last admitted timestamp. A distinct second event in the
    /// same second would land here and be lost - timestamp equality is the
    /// only dedup signal available.
    Duplicate,
    /// Older than the last admitted timestamp.
    Stale,
}

#[derive(Debug, Default)]
pub struct LastSeenTracker {
    seen: HashMap<i64, i64>,
}

impl LastSeenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a snapshot and, when fresh, record its timestamp as the new
    /// high-water mark for the subject.
    pub fn observe(&mut self, user_id: i64, timestamp: i64) -> Freshness {
        match self.seen.get(&user_id) {
            Some(&last) if timestamp == last => Freshness::Duplicate,
            Some(&last) if timestamp < last => Freshness::Stale,
            _ => {
                self.seen.insert(user_id, timestamp);
                Freshness::Fresh
            }
        }
    }
}
