//! Configuration sections
//!
//! Each TOML table of the config file maps to one struct here. Every field
//! has a default, so partial files only need to name what they change.
//!
//! # Main Types
//!
//! - [`MqttSettings`] - Broker address, credentials, TLS and topic root
//! - [`RadioSettings`] - Receiver (`rtl_tcp`) and decoder (`rtlamr`) commands
//! - [`MeterSettings`] - Watched meter ids and unit calibration
//! - [`TimingSettings`] - Start-up, shutdown and error back-off delays

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Arguments always passed to the decoder after any user arguments.
pub const DECODER_FORMAT_ARGS: [&str; 2] = ["-msgtype=idm", "-format=csv"];

/// MQTT broker connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    /// Broker hostname
    pub host: String,

    /// Broker port
    pub port: u16,

    /// Username; only used together with a non-empty password
    pub username: String,

    /// Password; only used together with a non-empty username
    pub password: String,

    /// Connect over TLS using the platform root certificates
    pub tls: bool,

    /// MQTT client identifier
    pub client_id: String,

    /// Topic root; messages go to `{base_topic}/{meter_id}/{metric}`
    pub base_topic: String,

    /// Upper bound on waiting for the broker to acknowledge one publish
    pub publish_timeout_secs: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            tls: false,
            client_id: "amridm2mqtt".to_string(),
            base_topic: "readings".to_string(),
            publish_timeout_secs: 10,
        }
    }
}

impl MqttSettings {
    /// Credentials to authenticate with, present only if both halves are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if !self.username.is_empty() && !self.password.is_empty() {
            Some((self.username.as_str(), self.password.as_str()))
        } else {
            None
        }
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

/// A program to launch and its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable name or path
    pub program: String,

    /// Arguments, passed verbatim (no shell)
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Builder-style helper to append arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parse a whitespace-separated command line (`"rtl_tcp -a 0.0.0.0"`).
    ///
    /// Returns `None` for a blank line. Quoting is not interpreted.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Supervised process commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioSettings {
    /// SDR receiver serving samples over TCP
    pub receiver: CommandSpec,

    /// Decoder reading from the receiver and printing CSV records
    pub decoder: CommandSpec,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            receiver: CommandSpec::new("rtl_tcp"),
            decoder: CommandSpec::new("rtlamr"),
        }
    }
}

impl RadioSettings {
    /// Full decoder argument list: user arguments then the IDM/CSV selectors
    pub fn decoder_args(&self) -> Vec<String> {
        self.decoder
            .args
            .iter()
            .cloned()
            .chain(DECODER_FORMAT_ARGS.iter().map(|s| s.to_string()))
            .collect()
    }
}

/// Meter selection and unit calibration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterSettings {
    /// Meter ids to publish. Empty = publish every meter heard.
    pub watched: Vec<u32>,

    /// Factor from the meter's native unit (hundredths of a kWh) to Wh
    pub wh_multiplier: u64,

    /// Reporting intervals per hour (12 for 5-minute intervals)
    pub readings_per_hour: u64,
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            watched: Vec::new(),
            wh_multiplier: 10,
            readings_per_hour: 12,
        }
    }
}

/// Delays used by the supervisor and the main loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Wait between starting the receiver and starting the decoder
    pub receiver_warmup_secs: u64,

    /// Wait between SIGTERM and SIGKILL on shutdown
    pub shutdown_grace_secs: u64,

    /// Pause after an unexpected fault in the main loop
    pub error_backoff_secs: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            receiver_warmup_secs: 5,
            shutdown_grace_secs: 1,
            error_backoff_secs: 2,
        }
    }
}

impl TimingSettings {
    pub fn receiver_warmup(&self) -> Duration {
        Duration::from_secs(self.receiver_warmup_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}
