//! Record pipeline from decoder line to MQTT message.
//!
//! Lines flow through fixed stages: Parser → Filter → Dedup gate →
//! Metric calculation → Sink. The pipeline runs on a dedicated thread and
//! reports back to the main thread via a crossbeam channel.
//!
//! # Architecture
//!
//! ```text
//! [decoder stdout] ──► [IdmParser] ──► [MeterFilter] ──► [IntervalTracker]
//!                                                              │
//!                        [MqttSink] ◄── [MetricCalculator] ◄───┘
//! ```
//!
//! # Design
//!
//! - **Typed outcomes**: every stage returns `Ok` or a [`SkipReason`];
//!   unexpected failures are [`PipelineError`]s.
//! - **Single owner**: the worker owns the dedup table, so no locking is
//!   needed on the hot path.
//! - **Publisher seam**: the sink is generic over [`crate::mqtt::Publisher`].

pub mod error;
pub mod nodes;
pub mod worker;

pub use error::{PipelineError, PipelineResult, SkipReason};
pub use nodes::{IdmParser, IntervalTracker, MeterFilter, MetricCalculator, MqttSink};
pub use worker::{BridgeWorker, LineOutcome, StatsHandle, WorkerEvent};
