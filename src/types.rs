//! Core data types for the AMR MQTT bridge
//!
//! This module contains the data structures that flow through the bridge
//! pipeline, from a decoded IDM record to the MQTT message that leaves it.
//!
//! # Main Types
//!
//! - [`MeterRecord`] - The four integer fields extracted from one decoder line
//! - [`MeterMetrics`] - Derived cumulative energy (kWh) and rate (W)
//! - [`Metric`] - Which of the two metrics a message carries
//! - [`PublishMessage`] - A topic/payload pair handed to the publisher
//! - [`BridgeStats`] - Running counters for the main loop
//!
//! # Payload Format
//!
//! Cumulative energy is always rendered as a real number (`10.0`, `12.34`),
//! rate as a plain integer (`960`). Subscribers that parsed the readings
//! as floats and the rate as an integer keep working unchanged.

use chrono::{DateTime, Utc};
use std::fmt;

/// One accepted IDM record, reduced to the fields the bridge needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeterRecord {
    /// Meter serial number (ERT id)
    pub meter_id: u32,
    /// Rolling interval counter; changes every reporting interval
    pub interval_id: u32,
    /// Cumulative register value, in hundredths of a kWh
    pub cumulative_register_value: u64,
    /// Usage during the most recent interval, in hundredths of a kWh
    pub interval_usage_value: u64,
}

/// The two metrics published for every accepted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Cumulative energy in kWh
    Reading,
    /// Estimated instantaneous rate in W
    Rate,
}

impl Metric {
    /// Last topic segment for this metric
    pub fn topic_suffix(&self) -> &'static str {
        match self {
            Metric::Reading => "meter_reading",
            Metric::Rate => "meter_rate",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic_suffix())
    }
}

/// Derived values for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterMetrics {
    /// Cumulative energy in kWh
    pub cumulative_kwh: f64,
    /// Average power over the last interval, in W
    pub rate_watts: u64,
}

impl MeterMetrics {
    /// Payload string for a metric
    pub fn payload(&self, metric: Metric) -> String {
        match metric {
            Metric::Reading => format_real(self.cumulative_kwh),
            Metric::Rate => self.rate_watts.to_string(),
        }
    }
}

/// Render a float the way a real-number payload is expected to look:
/// every finite integral value keeps a trailing `.0` regardless of
/// magnitude, everything else uses the shortest representation that
/// round-trips. Non-finite values (never produced from integer registers)
/// render as `inf`/`NaN`.
pub fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// A topic/payload pair ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishMessage {
    pub topic: String,
    pub payload: String,
}

impl PublishMessage {
    /// Build the message for one metric of one meter.
    ///
    /// The topic is `{base_topic}/{meter_id}/{metric}`. A trailing `/` on the
    /// base topic is ignored so `readings/` and `readings` are equivalent.
    pub fn for_metric(
        base_topic: &str,
        meter_id: u32,
        metric: Metric,
        payload: impl Into<String>,
    ) -> Self {
        let base = base_topic.trim_end_matches('/');
        Self {
            topic: format!("{}/{}/{}", base, meter_id, metric.topic_suffix()),
            payload: payload.into(),
        }
    }
}

/// Counters maintained by the main loop.
#[derive(Debug, Clone)]
pub struct BridgeStats {
    /// When the loop started reading
    pub started_at: DateTime<Utc>,
    /// Lines read from the decoder stream
    pub lines_read: u64,
    /// Lines rejected by the parser (field count, non-numeric, bad UTF-8)
    pub malformed_lines: u64,
    /// Records for meters outside the watch set
    pub unwatched_records: u64,
    /// Records whose interval was already published
    pub duplicate_intervals: u64,
    /// Records that passed every gate
    pub accepted_records: u64,
    /// Publishes acknowledged by the broker
    pub publishes_delivered: u64,
    /// Publishes that failed (logged and dropped)
    pub publish_failures: u64,
    /// Unexpected per-iteration faults
    pub faults: u64,
}

impl Default for BridgeStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            lines_read: 0,
            malformed_lines: 0,
            unwatched_records: 0,
            duplicate_intervals: 0,
            accepted_records: 0,
            publishes_delivered: 0,
            publish_failures: 0,
            faults: 0,
        }
    }
}

impl BridgeStats {
    /// Fraction of publishes that reached the broker, as a percentage
    pub fn delivery_rate(&self) -> f64 {
        let total = self.publishes_delivered + self.publish_failures;
        if total == 0 {
            100.0
        } else {
            (self.publishes_delivered as f64 / total as f64) * 100.0
        }
    }

    /// Time since the loop started
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

impl fmt::Display for BridgeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines ({} malformed), {} unwatched, {} duplicate, {} accepted, \
             {} published, {} failed ({:.1}% delivered), {} faults, up {}s",
            self.lines_read,
            self.malformed_lines,
            self.unwatched_records,
            self.duplicate_intervals,
            self.accepted_records,
            self.publishes_delivered,
            self.publish_failures,
            self.delivery_rate(),
            self.faults,
            self.uptime().num_seconds(),
        )
    }
}
