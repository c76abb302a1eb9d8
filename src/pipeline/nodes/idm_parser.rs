//! IdmParser: turns one decoder CSV line into a [`MeterRecord`].
//!
//! `rtlamr -msgtype=idm -format=csv` prints one record per line. A complete
//! IDM record has exactly [`IDM_FIELD_COUNT`] comma-separated fields; any
//! other count is a partial or foreign line and is skipped as a whole.

use crate::pipeline::error::SkipReason;
use crate::types::MeterRecord;

/// Number of fields in a complete IDM CSV record
pub const IDM_FIELD_COUNT: usize = 66;

/// Field index of the meter (ERT) id
pub const FIELD_METER_ID: usize = 9;
/// Field index of the rolling interval counter
pub const FIELD_INTERVAL_ID: usize = 10;
/// Field index of the cumulative register value
pub const FIELD_CUMULATIVE: usize = 15;
/// Field index of the last interval's usage
pub const FIELD_INTERVAL_USAGE: usize = 16;

/// Stateless parser for IDM CSV lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdmParser;

impl IdmParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw line as read from the decoder, including its terminator.
    pub fn parse_bytes(&self, line: &[u8]) -> Result<MeterRecord, SkipReason> {
        let text = std::str::from_utf8(line).map_err(|_| SkipReason::InvalidUtf8)?;
        self.parse_line(text)
    }

    /// Parse one line. Surrounding whitespace and line terminators are ignored.
    pub fn parse_line(&self, line: &str) -> Result<MeterRecord, SkipReason> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != IDM_FIELD_COUNT {
            return Err(SkipReason::FieldCount {
                expected: IDM_FIELD_COUNT,
                actual: fields.len(),
            });
        }

        Ok(MeterRecord {
            meter_id: field(&fields, FIELD_METER_ID, "meter id")?,
            interval_id: field(&fields, FIELD_INTERVAL_ID, "interval id")?,
            cumulative_register_value: field(&fields, FIELD_CUMULATIVE, "cumulative register")?,
            interval_usage_value: field(&fields, FIELD_INTERVAL_USAGE, "interval usage")?,
        })
    }
}

fn field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    name: &'static str,
) -> Result<T, SkipReason> {
    let raw = fields[index].trim();
    raw.parse::<T>().map_err(|_| SkipReason::NonNumeric {
        index,
        name,
        value: raw.to_string(),
    })
}
