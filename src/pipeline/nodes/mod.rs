//! Built-in pipeline node implementations.

pub mod idm_parser;
pub mod interval_tracker;
pub mod meter_filter;
pub mod metrics;
pub mod mqtt_sink;

pub use idm_parser::{IdmParser, IDM_FIELD_COUNT};
pub use interval_tracker::IntervalTracker;
pub use meter_filter::MeterFilter;
pub use metrics::MetricCalculator;
pub use mqtt_sink::{MqttSink, PUBLISH_ORDER};
