//! MetricCalculator: converts raw register values into kWh and W.
//!
//! IDM values are in hundredths of a kWh. With the usual calibration
//! (`wh_multiplier = 10`, `readings_per_hour = 12` for 5-minute intervals):
//!
//! ```text
//! rate_watts     = interval_usage × 10 × 12
//! cumulative_kwh = cumulative_register × 10 / 1000
//! ```

use crate::config::MeterSettings;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::types::{MeterMetrics, MeterRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricCalculator {
    wh_multiplier: u64,
    readings_per_hour: u64,
}

impl MetricCalculator {
    pub fn new(wh_multiplier: u64, readings_per_hour: u64) -> Self {
        Self {
            wh_multiplier,
            readings_per_hour,
        }
    }

    pub fn from_settings(settings: &MeterSettings) -> Self {
        Self::new(settings.wh_multiplier, settings.readings_per_hour)
    }

    /// Average power over the last interval, or `None` on overflow
    pub fn rate_watts(&self, interval_usage_value: u64) -> Option<u64> {
        interval_usage_value
            .checked_mul(self.wh_multiplier)?
            .checked_mul(self.readings_per_hour)
    }

    /// Cumulative energy in kWh, kept as a real number
    pub fn cumulative_kwh(&self, cumulative_register_value: u64) -> f64 {
        (cumulative_register_value as f64 * self.wh_multiplier as f64) / 1000.0
    }

    pub fn compute(&self, record: &MeterRecord) -> PipelineResult<MeterMetrics> {
        let rate_watts =
            self.rate_watts(record.interval_usage_value)
                .ok_or_else(|| PipelineError::Overflow {
                    meter_id: record.meter_id,
                    message: format!(
                        "rate for interval usage {} does not fit in 64 bits",
                        record.interval_usage_value
                    ),
                })?;

        Ok(MeterMetrics {
            cumulative_kwh: self.cumulative_kwh(record.cumulative_register_value),
            rate_watts,
        })
    }
}

impl Default for MetricCalculator {
    fn default() -> Self {
        Self::from_settings(&MeterSettings::default())
    }
}
