//! AMR MQTT bridge - Main Entry Point
//!
//! Starts the receiver and decoder, runs the bridge worker on its own
//! thread, and waits for SIGINT/SIGTERM or the end of the decoder stream.

use amr_mqtt_bridge::{
    config::BridgeConfig,
    mqtt::MqttPublisher,
    pipeline::{BridgeWorker, StatsHandle, WorkerEvent},
    radio::{RadioSupervisor, ShutdownListener},
};
use anyhow::Context;
use clap::Parser;
use crossbeam_channel::Receiver;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code when shutdown was requested by a signal
const EXIT_SIGNALLED: i32 = 0;

/// Exit code when the decoder stream ended on its own
const EXIT_STREAM_CLOSED: i32 = 1;

#[derive(Debug, Parser)]
#[command(version, about = "Publish IDM utility meter readings from rtlamr to MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configuration (e.g. `debug`)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    check_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let code = run(cli)?;
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = BridgeConfig::load_or_default(cli.config.as_deref())?;
    config.apply_process_env()?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.validate()?;

    if cli.check_config {
        print!("{}", config.to_redacted_toml()?);
        return Ok(EXIT_SIGNALLED);
    }

    // Keep the guard alive until the end of `run` so file logs are flushed
    let _log_guard = init_logging(&config)?;

    tracing::info!("Starting AMR MQTT bridge");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;
    // Must be installed before the first child is launched
    let mut signals = {
        let _enter = runtime.enter();
        ShutdownListener::install().context("Failed to install signal handlers")?
    };

    let mut supervisor = RadioSupervisor::launch_receiver(&config.radio, &config.timing)?;

    let warmup = config.timing.receiver_warmup();
    let early_stop = runtime.block_on(async {
        tokio::select! {
            signal = signals.recv() => Some(signal),
            _ = tokio::time::sleep(warmup) => None,
        }
    });
    if let Some(signal) = early_stop {
        tracing::info!("{} received during receiver warm-up, shutting down", signal);
        supervisor.shutdown();
        return Ok(EXIT_SIGNALLED);
    }

    let decoder_stdout = match supervisor.launch_decoder(&config.radio) {
        Ok(stdout) => stdout,
        Err(e) => {
            supervisor.shutdown();
            return Err(e.into());
        }
    };

    let (event_tx, event_rx) = crossbeam_channel::bounded(1);
    let mut worker =
        BridgeWorker::new(&config, MqttPublisher::new(&config.mqtt)).with_events(event_tx);
    let stats = worker.stats_handle();
    let worker_handle = std::thread::Builder::new()
        .name("bridge-worker".to_string())
        .spawn(move || {
            worker.run(BufReader::new(decoder_stdout));
        });
    if let Err(e) = worker_handle {
        supervisor.shutdown();
        return Err(e).context("Failed to spawn bridge worker thread");
    }

    let code = runtime.block_on(wait_for_stop(&mut signals, event_rx));
    // The worker may still be blocked on the decoder pipe; don't wait for it.
    runtime.shutdown_background();

    supervisor.shutdown();
    log_final_stats(&stats);
    tracing::info!("Stopped");
    Ok(code)
}

/// Wait for a termination signal or the end of the decoder stream
async fn wait_for_stop(signals: &mut ShutdownListener, events: Receiver<WorkerEvent>) -> i32 {
    let stream_closed = tokio::task::spawn_blocking(move || events.recv());

    tokio::select! {
        signal = signals.recv() => {
            tracing::info!("{} received, shutting down", signal);
            EXIT_SIGNALLED
        }
        event = stream_closed => {
            match event {
                Ok(Ok(WorkerEvent::StreamClosed(_))) => {
                    tracing::warn!("Decoder output ended, shutting down");
                }
                _ => tracing::warn!("Bridge worker stopped unexpectedly, shutting down"),
            }
            EXIT_STREAM_CLOSED
        }
    }
}

fn log_final_stats(stats: &StatsHandle) {
    match stats.lock() {
        Ok(stats) => tracing::info!("Bridge statistics: {}", *stats),
        Err(poisoned) => tracing::info!("Bridge statistics: {}", *poisoned.into_inner()),
    }
}

/// Install the tracing subscriber. `RUST_LOG` takes precedence over the config.
fn init_logging(config: &BridgeConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("Invalid log level '{}'", config.log_level))?;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    match &config.log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file '{}' has no file name", path.display()))?;

            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}
