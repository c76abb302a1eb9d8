//! MQTT delivery
//!
//! - [`Publisher`] - trait seam between the pipeline and the broker
//! - [`MqttPublisher`] - rumqttc implementation used by the daemon

pub mod client;
pub mod publisher_trait;

pub use client::MqttPublisher;
pub use publisher_trait::Publisher;

#[cfg(test)]
pub use publisher_trait::MockPublisher;
