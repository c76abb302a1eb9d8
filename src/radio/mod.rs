//! Radio side of the bridge: the supervised SDR processes
//!
//! The bridge does not talk to the radio itself. It runs two external
//! programs and reads the text one of them prints:
//!
//! - **receiver** (`rtl_tcp`) - owns the SDR dongle, serves samples over TCP
//! - **decoder** (`rtlamr`) - demodulates the samples, prints IDM messages as CSV
//!
//! # Components
//!
//! - [`RadioSupervisor`] - start-up ordering and SIGTERM/SIGKILL shutdown
//! - [`ShutdownListener`] - SIGINT/SIGTERM handlers, installed before any child starts

pub mod signals;
pub mod supervisor;

pub use signals::{ShutdownListener, ShutdownSignal};
pub use supervisor::{RadioSupervisor, ShutdownReport, StopSignal};
