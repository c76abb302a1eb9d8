//! Bridge Worker Thread Implementation
//!
//! This module contains the main loop that runs in a separate thread and
//! turns the decoder's stdout into MQTT messages.
//!
//! # Responsibilities
//!
//! For every line read from the decoder, the worker runs:
//!
//! ```text
//! read ─► IdmParser ─► MeterFilter ─► IntervalTracker ─► MetricCalculator ─► MqttSink ×2
//!            │              │                │
//!         skip (bad)    skip (unwatched)  skip (duplicate)
//! ```
//!
//! then records the interval as published.
//!
//! # Error Handling
//!
//! - **Skips** are expected outcomes and only logged at trace level.
//! - **Publish failures** are logged by the sink and do not roll back the
//!   interval tracker.
//! - **Faults** (read errors, metric overflow) are logged at debug level and
//!   followed by a back-off pause, then the loop continues.
//!
//! The loop only ends when the stream reaches end-of-file.

use crate::config::BridgeConfig;
use crate::mqtt::Publisher;
use crate::pipeline::error::{PipelineError, PipelineResult, SkipReason};
use crate::pipeline::nodes::{IdmParser, IntervalTracker, MeterFilter, MetricCalculator, MqttSink};
use crate::types::BridgeStats;
use crossbeam_channel::Sender;
use std::io::{BufRead, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared view of the worker's counters
pub type StatsHandle = Arc<Mutex<BridgeStats>>;

/// What happened to one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Both metrics were handed to the publisher
    Published {
        meter_id: u32,
        interval_id: u32,
        /// How many of the two messages the broker acknowledged
        delivered: usize,
    },
    /// The line was dropped before publishing
    Skipped(SkipReason),
}

/// Notifications from the worker to the owning thread
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The decoder stream reached end-of-file
    StreamClosed(BridgeStats),
}

/// The worker that runs the read-parse-publish loop
pub struct BridgeWorker<P: Publisher> {
    parser: IdmParser,
    filter: MeterFilter,
    tracker: IntervalTracker,
    calculator: MetricCalculator,
    sink: MqttSink<P>,
    /// Pause after a fault
    error_backoff: Duration,
    stats: StatsHandle,
    event_tx: Option<Sender<WorkerEvent>>,
}

impl<P: Publisher> BridgeWorker<P> {
    /// Create a new worker from the configuration
    pub fn new(config: &BridgeConfig, publisher: P) -> Self {
        Self {
            parser: IdmParser::new(),
            filter: MeterFilter::new(config.meters.watched.iter().copied()),
            tracker: IntervalTracker::new(),
            calculator: MetricCalculator::from_settings(&config.meters),
            sink: MqttSink::new(publisher, config.mqtt.base_topic.clone()),
            error_backoff: config.timing.error_backoff(),
            stats: Arc::new(Mutex::new(BridgeStats::default())),
            event_tx: None,
        }
    }

    /// Report [`WorkerEvent`]s on this channel
    pub fn with_events(mut self, event_tx: Sender<WorkerEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Override the fault back-off
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Handle for reading the counters from another thread
    pub fn stats_handle(&self) -> StatsHandle {
        Arc::clone(&self.stats)
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> BridgeStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn tracker(&self) -> &IntervalTracker {
        &self.tracker
    }

    /// Run the main loop until the stream ends
    pub fn run<R: BufRead>(&mut self, mut reader: R) -> BridgeStats {
        if self.filter.is_passthrough() {
            tracing::info!(
                "Bridge worker started (watching all meters, topic root '{}')",
                self.sink.base_topic()
            );
        } else {
            tracing::info!(
                "Bridge worker started (watching {} meters, topic root '{}')",
                self.filter.watched().len(),
                self.sink.base_topic()
            );
        }

        let mut line = Vec::with_capacity(512);
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    self.update_stats(|s| s.lines_read += 1);
                    match self.process_line(&line) {
                        Ok(outcome) => self.record_outcome(&outcome),
                        Err(e) => self.handle_fault(e),
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => self.handle_fault(PipelineError::Io(e)),
            }
        }

        let stats = self.stats();
        tracing::info!("Decoder stream closed: {}", stats);
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(WorkerEvent::StreamClosed(stats.clone()));
        }
        stats
    }

    /// Push one raw line through every stage
    pub fn process_line(&mut self, line: &[u8]) -> PipelineResult<LineOutcome> {
        let record = match self.parser.parse_bytes(line) {
            Ok(record) => record,
            Err(reason) => return Ok(LineOutcome::Skipped(reason)),
        };

        if let Err(reason) = self.filter.check(&record) {
            return Ok(LineOutcome::Skipped(reason));
        }

        if !self
            .tracker
            .should_publish(record.meter_id, record.interval_id)
        {
            return Ok(LineOutcome::Skipped(SkipReason::DuplicateInterval {
                meter_id: record.meter_id,
                interval_id: record.interval_id,
            }));
        }

        let metrics = self.calculator.compute(&record)?;
        let messages = self.sink.prepare(record.meter_id, &metrics);

        let mut delivered = 0;
        for message in &messages {
            tracing::debug!(
                "Sending meter {} {}: {}",
                record.meter_id,
                message.topic.rsplit('/').next().unwrap_or_default(),
                message.payload
            );
            if self.sink.send(message) {
                delivered += 1;
            }
        }

        self.tracker
            .record_published(record.meter_id, record.interval_id);

        Ok(LineOutcome::Published {
            meter_id: record.meter_id,
            interval_id: record.interval_id,
            delivered,
        })
    }

    fn record_outcome(&self, outcome: &LineOutcome) {
        match outcome {
            LineOutcome::Published { delivered, .. } => {
                let delivered = *delivered as u64;
                self.update_stats(|s| {
                    s.accepted_records += 1;
                    s.publishes_delivered += delivered;
                    s.publish_failures += 2 - delivered;
                });
            }
            LineOutcome::Skipped(reason) => {
                tracing::trace!("Skipped line: {}", reason);
                self.update_stats(|s| match reason {
                    SkipReason::Unwatched(_) => s.unwatched_records += 1,
                    SkipReason::DuplicateInterval { .. } => s.duplicate_intervals += 1,
                    SkipReason::FieldCount { .. }
                    | SkipReason::NonNumeric { .. }
                    | SkipReason::InvalidUtf8 => s.malformed_lines += 1,
                });
            }
        }
    }

    fn handle_fault(&self, error: PipelineError) {
        tracing::debug!("Fault squashed! {}: {}", error.category(), error);
        self.update_stats(|s| s.faults += 1);
        if !self.error_backoff.is_zero() {
            std::thread::sleep(self.error_backoff);
        }
    }

    fn update_stats<F: FnOnce(&mut BridgeStats)>(&self, f: F) {
        match self.stats.lock() {
            Ok(mut stats) => f(&mut stats),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::mqtt::MockPublisher;
    use crossbeam_channel::bounded;
    use std::io::Cursor;

    fn idm_line(meter_id: u32, interval_id: u32, register: u64, usage: u64) -> String {
        let mut fields: Vec<String> = (0..66).map(|i| i.to_string()).collect();
        fields[9] = meter_id.to_string();
        fields[10] = interval_id.to_string();
        fields[15] = register.to_string();
        fields[16] = usage.to_string();
        fields.join(",") + "\n"
    }

    fn create_test_worker(
        watched: &[u32],
        publisher: MockPublisher,
    ) -> BridgeWorker<MockPublisher> {
        let mut config = BridgeConfig::default();
        config.meters.watched = watched.to_vec();
        config.mqtt.base_topic = "base".into();
        BridgeWorker::new(&config, publisher).with_error_backoff(Duration::ZERO)
    }

    #[test]
    fn test_publishes_reading_then_rate() {
        let mut publisher = MockPublisher::new();
        let mut seq = mockall::Sequence::new();
        publisher
            .expect_publish()
            .withf(|m| m.topic == "base/12345/meter_reading" && m.payload == "10.0")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        publisher
            .expect_publish()
            .withf(|m| m.topic == "base/12345/meter_rate" && m.payload == "1200")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut worker = create_test_worker(&[12345], publisher);
        let outcome = worker
            .process_line(idm_line(12345, 7, 1000, 10).as_bytes())
            .unwrap();

        assert_eq!(
            outcome,
            LineOutcome::Published {
                meter_id: 12345,
                interval_id: 7,
                delivered: 2
            }
        );
        assert_eq!(worker.tracker().last_interval(12345), Some(7));
    }

    #[test]
    fn test_duplicate_interval_is_skipped() {
        let mut publisher = MockPublisher::new();
        publisher.expect_publish().times(2).returning(|_| Ok(()));

        let mut worker = create_test_worker(&[], publisher);
        let line = idm_line(1, 3, 100, 1);
        worker.process_line(line.as_bytes()).unwrap();
        let second = worker.process_line(line.as_bytes()).unwrap();

        assert_eq!(
            second,
            LineOutcome::Skipped(SkipReason::DuplicateInterval {
                meter_id: 1,
                interval_id: 3
            })
        );
    }

    #[test]
    fn test_unwatched_meter_is_skipped() {
        let mut publisher = MockPublisher::new();
        publisher.expect_publish().times(0);

        let mut worker = create_test_worker(&[12345], publisher);
        let outcome = worker
            .process_line(idm_line(999, 1, 1, 1).as_bytes())
            .unwrap();
        assert_eq!(outcome, LineOutcome::Skipped(SkipReason::Unwatched(999)));
        assert!(worker.tracker().is_empty());
    }

    #[test]
    fn test_first_publish_failure_does_not_stop_second() {
        let mut publisher = MockPublisher::new();
        let mut seq = mockall::Sequence::new();
        publisher
            .expect_publish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::Mqtt("connection refused".into())));
        publisher
            .expect_publish()
            .withf(|m| m.topic.ends_with("meter_rate"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut worker = create_test_worker(&[], publisher);
        let outcome = worker
            .process_line(idm_line(5, 9, 100, 1).as_bytes())
            .unwrap();

        assert_eq!(
            outcome,
            LineOutcome::Published {
                meter_id: 5,
                interval_id: 9,
                delivered: 1
            }
        );
        // dedup state is not rolled back
        assert_eq!(worker.tracker().last_interval(5), Some(9));
    }

    #[test]
    fn test_overflow_is_a_fault() {
        let mut publisher = MockPublisher::new();
        publisher.expect_publish().times(0);

        let mut worker = create_test_worker(&[], publisher);
        let err = worker
            .process_line(idm_line(5, 1, 0, u64::MAX).as_bytes())
            .unwrap_err();
        assert_eq!(err.category(), "overflow");
        assert!(worker.tracker().is_empty());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn startup_log(watched: &[u32]) -> String {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let mut worker = create_test_worker(watched, MockPublisher::new());
        tracing::subscriber::with_default(subscriber, || {
            worker.run(Cursor::new(""));
        });
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_startup_log_describes_watch_set() {
        let all = startup_log(&[]);
        assert!(all.contains("watching all meters"), "{}", all);

        let some = startup_log(&[1, 2]);
        assert!(some.contains("watching 2 meters"), "{}", some);
    }

    #[test]
    fn test_each_skip_reason_has_its_own_counter() {
        let mut publisher = MockPublisher::new();
        publisher.expect_publish().times(2).returning(|_| Ok(()));

        let mut non_numeric: Vec<String> = (0..66).map(|i| i.to_string()).collect();
        non_numeric[9] = "abc".into();

        let mut input = Vec::new();
        input.extend_from_slice(b"1,2,3\n");
        input.extend_from_slice((non_numeric.join(",") + "\n").as_bytes());
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(idm_line(999, 1, 1, 1).as_bytes());
        input.extend_from_slice(idm_line(12345, 1, 1, 1).as_bytes());
        input.extend_from_slice(idm_line(12345, 1, 1, 1).as_bytes());

        let mut worker = create_test_worker(&[12345], publisher);
        let stats = worker.run(Cursor::new(input));

        assert_eq!(stats.lines_read, 6);
        assert_eq!(stats.malformed_lines, 3);
        assert_eq!(stats.unwatched_records, 1);
        assert_eq!(stats.duplicate_intervals, 1);
        assert_eq!(stats.accepted_records, 1);
        assert_eq!(stats.faults, 0);
    }

    #[test]
    fn test_run_counts_and_reports_stream_close() {
        let mut publisher = MockPublisher::new();
        publisher.expect_publish().times(2).returning(|_| Ok(()));

        let input = format!(
            "garbage\n{}{}\n{}",
            idm_line(1, 1, 100, 1),
            "1,2,3",
            idm_line(1, 1, 100, 1),
        );

        let (tx, rx) = bounded(1);
        let mut worker = create_test_worker(&[], publisher).with_events(tx);
        let stats = worker.run(Cursor::new(input));

        assert_eq!(stats.lines_read, 4);
        assert_eq!(stats.malformed_lines, 2);
        assert_eq!(stats.accepted_records, 1);
        assert_eq!(stats.duplicate_intervals, 1);
        assert_eq!(stats.publishes_delivered, 2);

        match rx.try_recv().unwrap() {
            WorkerEvent::StreamClosed(reported) => assert_eq!(reported.lines_read, 4),
        }
    }
}
