//! In-memory publishers for integration tests

use amr_mqtt_bridge::{BridgeError, PublishMessage, Publisher, Result};
use std::sync::{Arc, Mutex};

/// Records every message it is asked to publish and always succeeds.
///
/// Clones share the same log, so a test can keep one clone while the
/// worker owns another.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    sent: Arc<Mutex<Vec<PublishMessage>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<PublishMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.topic).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, message: &PublishMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Fails every attempt whose topic ends with `failing_suffix`, recording the rest.
#[derive(Clone)]
pub struct FailingPublisher {
    failing_suffix: String,
    attempts: Arc<Mutex<Vec<String>>>,
    delivered: RecordingPublisher,
}

impl FailingPublisher {
    pub fn failing(suffix: &str) -> Self {
        Self {
            failing_suffix: suffix.to_string(),
            attempts: Arc::new(Mutex::new(Vec::new())),
            delivered: RecordingPublisher::new(),
        }
    }

    /// Topics of every attempt, successful or not
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<PublishMessage> {
        self.delivered.messages()
    }
}

impl Publisher for FailingPublisher {
    fn publish(&mut self, message: &PublishMessage) -> Result<()> {
        self.attempts.lock().unwrap().push(message.topic.clone());
        if message.topic.ends_with(&self.failing_suffix) {
            return Err(BridgeError::Mqtt("connection refused".to_string()));
        }
        self.delivered.publish(message)
    }
}
