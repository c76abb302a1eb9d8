//! # amr-mqtt-bridge: IDM meter readings to MQTT
//!
//! Bridges an SDR receiver to an MQTT broker. The bridge supervises
//! `rtl_tcp` and `rtlamr`, reads the IDM records `rtlamr` prints as CSV,
//! keeps the meters it is told to watch, and publishes two metrics per new
//! reporting interval:
//!
//! - `{base_topic}/{meter_id}/meter_reading` - cumulative energy in kWh
//! - `{base_topic}/{meter_id}/meter_rate` - average power over the interval in W
//!
//! ## Architecture
//!
//! - **Radio**: launches the receiver and decoder, stops them on SIGINT/SIGTERM
//! - **Pipeline**: parse → filter → dedup → compute → publish, on a worker thread
//! - **MQTT**: one-shot QoS 1 publishes through the [`mqtt::Publisher`] trait
//! - **Communication**: a crossbeam channel reports stream close to the main thread
//!
//! ## Example
//!
//! ```ignore
//! use amr_mqtt_bridge::{BridgeConfig, BridgeWorker, MqttPublisher, RadioSupervisor};
//! use std::io::BufReader;
//!
//! let config = BridgeConfig::load_or_default(None)?;
//! let (supervisor, stdout) = RadioSupervisor::start(&config.radio, &config.timing)?;
//!
//! let mut worker = BridgeWorker::new(&config, MqttPublisher::new(&config.mqtt));
//! std::thread::spawn(move || worker.run(BufReader::new(stdout)));
//!
//! // ... wait for a termination signal ...
//! supervisor.shutdown();
//! ```

pub mod config;
pub mod error;
pub mod mqtt;
pub mod pipeline;
pub mod radio;
pub mod types;

// Re-export commonly used types
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use mqtt::{MqttPublisher, Publisher};
pub use pipeline::{BridgeWorker, LineOutcome, SkipReason, WorkerEvent};
pub use radio::{RadioSupervisor, ShutdownListener, ShutdownSignal};
pub use types::{BridgeStats, MeterMetrics, MeterRecord, Metric, PublishMessage};
