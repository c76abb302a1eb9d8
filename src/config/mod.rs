//! Configuration module for the AMR MQTT bridge
//!
//! This module handles loading the bridge configuration:
//! - A TOML file (explicit `--config` path or the platform default)
//! - Environment variable overrides, using the same names as the
//!   Home Assistant add-on (`MQTT_HOST`, `WATCHED_METERS`, ...)
//! - Validation of the merged result
//!
//! # Config Location
//!
//! Without `--config`, the file is looked up in the platform config directory:
//! - **Linux**: `~/.config/amr-mqtt-bridge/config.toml`
//! - **macOS**: `~/Library/Application Support/amr-mqtt-bridge/config.toml`
//! - **Windows**: `%APPDATA%\amr-mqtt-bridge\config.toml`
//!
//! A missing default file is not an error; defaults are used.
//!
//! # Example
//!
//! ```toml
//! log_level = "debug"
//!
//! [mqtt]
//! host = "broker.lan"
//! username = "meter"
//! password = "secret"
//!
//! [meters]
//! watched = [12345678]
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{BridgeError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for the config directory
pub const APP_ID: &str = "amr-mqtt-bridge";

/// Config filename inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Default log filter when neither `RUST_LOG` nor the config set one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Log filter directive (`info`, `debug`, `amr_mqtt_bridge=trace`, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional log file; rotated daily
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub mqtt: MqttSettings,

    #[serde(default)]
    pub radio: RadioSettings,

    #[serde(default)]
    pub meters: MeterSettings,

    #[serde(default)]
    pub timing: TimingSettings,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
            mqtt: MqttSettings::default(),
            radio: RadioSettings::default(),
            meters: MeterSettings::default(),
            timing: TimingSettings::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(BridgeError::from)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Load from an explicit path, or from the default location if present.
    ///
    /// An explicit path must exist. The default path is optional.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match default_config_path() {
            Some(default) if default.exists() => {
                tracing::info!("Loading config from {}", default.display());
                Self::load(default)
            }
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an environment lookup function.
    ///
    /// Unset variables leave the current value alone. Set but unparseable
    /// values are a configuration error.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WATCHED_METERS") {
            self.meters.watched = parse_meter_list(&v)?;
        }
        if let Some(v) = lookup("MQTT_HOST") {
            self.mqtt.host = v;
        }
        if let Some(v) = lookup("MQTT_PORT") {
            self.mqtt.port = parse_env_number("MQTT_PORT", &v)?;
        }
        if let Some(v) = lookup("MQTT_USER") {
            self.mqtt.username = v;
        }
        if let Some(v) = lookup("MQTT_PASSWORD") {
            self.mqtt.password = v;
        }
        if let Some(v) = lookup("MQTT_TLS") {
            self.mqtt.tls = parse_env_bool("MQTT_TLS", &v)?;
        }
        if let Some(v) = lookup("MQTT_CLIENT_ID") {
            self.mqtt.client_id = v;
        }
        if let Some(v) = lookup("MQTT_BASE_TOPIC") {
            self.mqtt.base_topic = v;
        }
        if let Some(v) = lookup("WH_MULTIPLIER") {
            self.meters.wh_multiplier = parse_env_number("WH_MULTIPLIER", &v)?;
        }
        if let Some(v) = lookup("READINGS_PER_HOUR") {
            self.meters.readings_per_hour = parse_env_number("READINGS_PER_HOUR", &v)?;
        }
        if let Some(v) = lookup("RTL_TCP") {
            if let Some(cmd) = CommandSpec::from_command_line(&v) {
                self.radio.receiver = cmd;
            }
        }
        if let Some(v) = lookup("RTLAMR") {
            if let Some(cmd) = CommandSpec::from_command_line(&v) {
                self.radio.decoder = cmd;
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = normalize_log_level(&v);
        }
        Ok(())
    }

    /// Check the merged configuration for values the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.host.trim().is_empty() {
            return Err(BridgeError::Config("mqtt.host must not be empty".into()));
        }
        if self.mqtt.port == 0 {
            return Err(BridgeError::Config("mqtt.port must not be 0".into()));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(BridgeError::Config("mqtt.client_id must not be empty".into()));
        }
        let base = self.mqtt.base_topic.trim_end_matches('/');
        if base.is_empty() {
            return Err(BridgeError::Config("mqtt.base_topic must not be empty".into()));
        }
        if base.contains(['+', '#']) {
            return Err(BridgeError::Config(format!(
                "mqtt.base_topic '{}' must not contain wildcards",
                self.mqtt.base_topic
            )));
        }
        if self.meters.wh_multiplier == 0 {
            return Err(BridgeError::Config("meters.wh_multiplier must be > 0".into()));
        }
        if self.meters.readings_per_hour == 0 {
            return Err(BridgeError::Config(
                "meters.readings_per_hour must be > 0".into(),
            ));
        }
        if self.radio.receiver.program.trim().is_empty() {
            return Err(BridgeError::Config("radio.receiver.program must not be empty".into()));
        }
        if self.radio.decoder.program.trim().is_empty() {
            return Err(BridgeError::Config("radio.decoder.program must not be empty".into()));
        }
        Ok(())
    }

    /// TOML rendering with the password masked, for `--check-config`
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.mqtt.password.is_empty() {
            shown.mqtt.password = "********".to_string();
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| BridgeError::Config(format!("Failed to serialize config: {}", e)))
    }
}

/// Parse a meter id list such as `12345,67890`, `12345 67890` or `[12345, 67890]`
pub fn parse_meter_list(value: &str) -> Result<Vec<u32>> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>().map_err(|_| {
                BridgeError::Config(format!("WATCHED_METERS: '{}' is not a meter id", part))
            })
        })
        .collect()
}

/// Map level names used by other logging stacks onto tracing's
/// (`WARNING` -> `warn`, `CRITICAL` -> `error`)
pub fn normalize_log_level(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| BridgeError::Config(format!("{}: '{}' is not a valid number", key, value)))
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(BridgeError::Config(format!(
            "{}: '{}' is not a boolean",
            key, other
        ))),
    }
}
