//! IntervalTracker: remembers the last published interval per meter.
//!
//! Meters rebroadcast the same IDM message several times per interval.
//! A record is only worth publishing when its interval id differs from the
//! last one published for that meter. State is memory-resident and starts
//! empty on every run.

use std::collections::HashMap;

/// Dedup table: meter id -> last published interval id.
///
/// A meter without an entry has never been published, which is distinct
/// from having published interval 0.
#[derive(Debug, Clone, Default)]
pub struct IntervalTracker {
    last_interval: HashMap<u32, u32>,
}

impl IntervalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if this interval has not been published for this meter yet
    pub fn should_publish(&self, meter_id: u32, interval_id: u32) -> bool {
        self.last_interval.get(&meter_id) != Some(&interval_id)
    }

    /// Mark an interval as published, replacing any previous entry
    pub fn record_published(&mut self, meter_id: u32, interval_id: u32) {
        self.last_interval.insert(meter_id, interval_id);
    }

    /// Last published interval for a meter, if any
    pub fn last_interval(&self, meter_id: u32) -> Option<u32> {
        self.last_interval.get(&meter_id).copied()
    }

    /// Number of meters seen
    pub fn len(&self) -> usize {
        self.last_interval.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_interval.is_empty()
    }
}
