//! MqttSink: formats metric messages and hands them to a [`Publisher`].
//!
//! Publish failures stop here: they are logged and counted, never returned,
//! so a broker outage cannot end the read loop.

use crate::mqtt::Publisher;
use crate::types::{MeterMetrics, Metric, PublishMessage};

/// Order in which the metrics of one record are published.
pub const PUBLISH_ORDER: [Metric; 2] = [Metric::Reading, Metric::Rate];

pub struct MqttSink<P: Publisher> {
    publisher: P,
    base_topic: String,
}

impl<P: Publisher> MqttSink<P> {
    pub fn new(publisher: P, base_topic: impl Into<String>) -> Self {
        Self {
            publisher,
            base_topic: base_topic.into(),
        }
    }

    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// Build the messages for one record, in publish order
    pub fn prepare(&self, meter_id: u32, metrics: &MeterMetrics) -> [PublishMessage; 2] {
        PUBLISH_ORDER.map(|metric| {
            PublishMessage::for_metric(&self.base_topic, meter_id, metric, metrics.payload(metric))
        })
    }

    /// Publish one metric value for a meter. Returns whether it was delivered.
    pub fn publish(&mut self, meter_id: u32, metric: Metric, payload: impl Into<String>) -> bool {
        let message = PublishMessage::for_metric(&self.base_topic, meter_id, metric, payload);
        self.send(&message)
    }

    /// Send a prepared message. Returns whether it was delivered.
    pub fn send(&mut self, message: &PublishMessage) -> bool {
        match self.publisher.publish(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("MQTT publish failed ({}): {}", message.topic, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::mqtt::MockPublisher;
    use mockall::predicate::*;

    #[test]
    fn test_prepare_order_and_payloads() {
        let sink = MqttSink::new(MockPublisher::new(), "base");
        let metrics = MeterMetrics {
            cumulative_kwh: 10.0,
            rate_watts: 1200,
        };
        let [reading, rate] = sink.prepare(12345, &metrics);

        assert_eq!(reading.topic, "base/12345/meter_reading");
        assert_eq!(reading.payload, "10.0");
        assert_eq!(rate.topic, "base/12345/meter_rate");
        assert_eq!(rate.payload, "1200");
    }

    #[test]
    fn test_publish_builds_topic() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .with(eq(PublishMessage {
                topic: "readings/7/meter_rate".into(),
                payload: "960".into(),
            }))
            .times(1)
            .returning(|_| Ok(()));

        let mut sink = MqttSink::new(publisher, "readings");
        assert!(sink.publish(7, Metric::Rate, "960"));
    }

    #[test]
    fn test_failure_is_swallowed() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_| Err(BridgeError::Mqtt("connection refused".into())));

        let mut sink = MqttSink::new(publisher, "readings");
        assert!(!sink.publish(7, Metric::Reading, "1.0"));
    }
}
