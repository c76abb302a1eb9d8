//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use amr_mqtt_bridge::{BridgeConfig, BridgeWorker, Publisher};
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(500)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Configuration with a short base topic and the given watch list
pub fn test_config(watched: &[u32]) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.mqtt.base_topic = "base".to_string();
    config.meters.watched = watched.to_vec();
    config.timing.error_backoff_secs = 0;
    config
}

/// Worker with no fault back-off
pub fn create_test_worker<P: Publisher>(watched: &[u32], publisher: P) -> BridgeWorker<P> {
    BridgeWorker::new(&test_config(watched), publisher).with_error_backoff(Duration::ZERO)
}
