//! MeterFilter: meter id filtering node.
//!
//! Filters records based on meter id. When the watch set is empty,
//! every record passes through (passthrough mode). Otherwise, only records
//! whose meter id is in the watch set pass.

use crate::pipeline::error::SkipReason;
use crate::types::MeterRecord;
use std::collections::HashSet;

/// Filters records by meter id.
///
/// The watch set is fixed at construction and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct MeterFilter {
    /// Meters allowed to pass through. Empty = passthrough all.
    watched: HashSet<u32>,
}

impl MeterFilter {
    pub fn new(watched: impl IntoIterator<Item = u32>) -> Self {
        Self {
            watched: watched.into_iter().collect(),
        }
    }

    /// Whether records from this meter should be published
    pub fn accepts(&self, meter_id: u32) -> bool {
        self.watched.is_empty() || self.watched.contains(&meter_id)
    }

    /// Gate a record, returning the skip reason when it is filtered out
    pub fn check(&self, record: &MeterRecord) -> Result<(), SkipReason> {
        if self.accepts(record.meter_id) {
            Ok(())
        } else {
            Err(SkipReason::Unwatched(record.meter_id))
        }
    }

    /// Get the current watch set.
    pub fn watched(&self) -> &HashSet<u32> {
        &self.watched
    }

    /// Check if in passthrough mode (no filtering).
    pub fn is_passthrough(&self) -> bool {
        self.watched.is_empty()
    }
}
