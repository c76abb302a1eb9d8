//! rumqttc-backed publisher
//!
//! Each publish opens a connection, sends one QoS 1 message, waits for the
//! PUBACK and disconnects. No session state survives between publishes.

use crate::config::MqttSettings;
use crate::error::{BridgeError, Result};
use crate::mqtt::publisher_trait::Publisher;
use crate::types::PublishMessage;
use rumqttc::{Client, Event, MqttOptions, Outgoing, Packet, QoS, Transport};
use std::time::{Duration, Instant};

/// Keep-alive advertised to the broker
const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Request queue capacity of the short-lived client
const CLIENT_CAPACITY: usize = 10;

/// Time allowed for the DISCONNECT to go out after the PUBACK
const DISCONNECT_FLUSH: Duration = Duration::from_millis(500);

/// One-shot MQTT publisher
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    settings: MqttSettings,
}

impl MqttPublisher {
    pub fn new(settings: &MqttSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Broker endpoint as `host:port`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.settings.host, self.settings.port)
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.settings.client_id.clone(),
            self.settings.host.clone(),
            self.settings.port,
        );
        options.set_keep_alive(KEEP_ALIVE);

        if let Some((username, password)) = self.settings.credentials() {
            options.set_credentials(username, password);
        }
        if self.settings.tls {
            options.set_transport(Transport::tls_with_default_config());
        }
        options
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, message: &PublishMessage) -> Result<()> {
        let (client, mut connection) = Client::new(self.options(), CLIENT_CAPACITY);
        client.publish(
            message.topic.as_str(),
            QoS::AtLeastOnce,
            false,
            message.payload.as_bytes(),
        )?;

        let deadline = Instant::now() + self.settings.publish_timeout();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BridgeError::Timeout(format!(
                    "no PUBACK from {} within {:?}",
                    self.endpoint(),
                    self.settings.publish_timeout()
                )));
            }

            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::PubAck(_)))) => break,
                Ok(Ok(event)) => tracing::trace!("MQTT event: {:?}", event),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(BridgeError::Timeout(format!(
                        "no PUBACK from {} within {:?}",
                        self.endpoint(),
                        self.settings.publish_timeout()
                    )))
                }
            }
        }

        // Delivered; disconnect errors are ignored.
        if client.disconnect().is_ok() {
            while let Ok(Ok(event)) = connection.recv_timeout(DISCONNECT_FLUSH) {
                if matches!(event, Event::Outgoing(Outgoing::Disconnect)) {
                    break;
                }
            }
        }
        Ok(())
    }
}
