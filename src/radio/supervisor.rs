//! Supervisor for the receiver and decoder processes
//!
//! Start-up order matters: the decoder connects to the receiver's TCP port,
//! so the receiver is started first and given a warm-up period to bind it.
//!
//! Shutdown sends SIGTERM to both processes, waits a grace period, then
//! sends SIGKILL to both. Signal delivery is best-effort: a process that
//! already exited is not an error.

use crate::config::{RadioSettings, TimingSettings};
use crate::error::{BridgeError, Result, ResultExt};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// Time allowed to reap a process after SIGKILL
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

/// Poll interval while reaping
const REAP_POLL: Duration = Duration::from_millis(10);

/// Signals used during shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Ask the process to exit (SIGTERM)
    Terminate,
    /// Force the process to exit (SIGKILL)
    Kill,
}

/// Exit statuses collected during shutdown.
///
/// `None` if the process was not reaped in time, or never launched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownReport {
    pub receiver: Option<ExitStatus>,
    pub decoder: Option<ExitStatus>,
}

/// Owns the receiver and decoder child processes
#[derive(Debug)]
pub struct RadioSupervisor {
    receiver: Child,
    /// `None` until [`RadioSupervisor::launch_decoder`] succeeds
    decoder: Option<Child>,
    grace: Duration,
}

impl RadioSupervisor {
    /// Launch the receiver, wait for it to warm up, then launch the decoder.
    ///
    /// Returns the supervisor and the decoder's captured stdout. The warm-up
    /// cannot be interrupted here; callers that must react to signals during
    /// it use [`launch_receiver`](Self::launch_receiver) and
    /// [`launch_decoder`](Self::launch_decoder) directly.
    pub fn start(radio: &RadioSettings, timing: &TimingSettings) -> Result<(Self, ChildStdout)> {
        let mut supervisor = Self::launch_receiver(radio, timing)?;
        std::thread::sleep(timing.receiver_warmup());
        match supervisor.launch_decoder(radio) {
            Ok(stdout) => Ok((supervisor, stdout)),
            Err(e) => {
                supervisor.shutdown();
                Err(e)
            }
        }
    }

    /// Launch the receiver with its output discarded.
    ///
    /// The decoder is not started; give the receiver its warm-up first.
    pub fn launch_receiver(radio: &RadioSettings, timing: &TimingSettings) -> Result<Self> {
        let receiver = Command::new(&radio.receiver.program)
            .args(&radio.receiver.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start receiver '{}'", radio.receiver))?;
        tracing::info!("Started receiver '{}' (pid {})", radio.receiver, receiver.id());

        Ok(Self {
            receiver,
            decoder: None,
            grace: timing.shutdown_grace(),
        })
    }

    /// Launch the decoder with the IDM/CSV selectors and return its stdout.
    ///
    /// On failure the receiver keeps running; the caller decides whether to
    /// shut down.
    pub fn launch_decoder(&mut self, radio: &RadioSettings) -> Result<ChildStdout> {
        if self.decoder.is_some() {
            return Err(BridgeError::Process("decoder already running".to_string()));
        }

        let decoder_args = radio.decoder_args();
        let mut decoder = Command::new(&radio.decoder.program)
            .args(&decoder_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to start decoder '{} {}'",
                    radio.decoder.program,
                    decoder_args.join(" ")
                )
            })?;
        tracing::info!(
            "Started decoder '{} {}' (pid {})",
            radio.decoder.program,
            decoder_args.join(" "),
            decoder.id()
        );

        let stdout = decoder.stdout.take();
        self.decoder = Some(decoder);
        stdout.ok_or_else(|| BridgeError::Process("decoder stdout was not captured".to_string()))
    }

    /// Stop every launched process: SIGTERM, grace period, SIGKILL.
    ///
    /// Consumes the supervisor, so it can only run once.
    pub fn shutdown(mut self) -> ShutdownReport {
        tracing::info!("Stopping receiver and decoder");
        self.signal_all(StopSignal::Terminate);
        std::thread::sleep(self.grace);
        self.signal_all(StopSignal::Kill);

        let report = ShutdownReport {
            receiver: reap(&mut self.receiver),
            decoder: self.decoder.as_mut().and_then(reap),
        };
        tracing::debug!(
            "Receiver exit: {:?}, decoder exit: {:?}",
            report.receiver,
            report.decoder
        );
        report
    }

    fn signal_all(&mut self, signal: StopSignal) {
        let children = std::iter::once(("receiver", &mut self.receiver))
            .chain(self.decoder.as_mut().map(|child| ("decoder", child)));
        for (name, child) in children {
            if let Err(e) = send_signal(child, signal) {
                tracing::debug!("Could not send {:?} to {} (pid {}): {}", signal, name, child.id(), e);
            }
        }
    }
}

#[cfg(unix)]
fn send_signal(child: &mut Child, signal: StopSignal) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // Already reaped: the pid may have been reused.
    if matches!(child.try_wait(), Ok(Some(_))) {
        return Ok(());
    }

    let sig = match signal {
        StopSignal::Terminate => Signal::SIGTERM,
        StopSignal::Kill => Signal::SIGKILL,
    };
    kill(Pid::from_raw(child.id() as i32), sig)
        .map_err(|e| BridgeError::Process(format!("kill({:?}): {}", sig, e)))
}

#[cfg(not(unix))]
fn send_signal(child: &mut Child, signal: StopSignal) -> Result<()> {
    // No graceful stop outside unix; both phases terminate the process.
    let _ = signal;
    child.kill().map_err(BridgeError::Io)
}

fn reap(child: &mut Child) -> Option<ExitStatus> {
    let deadline = Instant::now() + REAP_TIMEOUT;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() < deadline => std::thread::sleep(REAP_POLL),
            _ => return None,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::CommandSpec;
    use std::io::{BufRead, BufReader};
    use std::os::unix::process::ExitStatusExt;

    fn settings(receiver: &str, decoder_script: &str) -> (RadioSettings, TimingSettings) {
        let radio = RadioSettings {
            receiver: CommandSpec::new("sh").with_args(["-c", receiver]),
            decoder: CommandSpec::new("sh").with_args(["-c", decoder_script]),
        };
        let timing = TimingSettings {
            receiver_warmup_secs: 0,
            shutdown_grace_secs: 0,
            error_backoff_secs: 0,
        };
        (radio, timing)
    }

    #[test]
    fn test_decoder_receives_format_arguments() {
        // $0 is the first argument after the script; echo all of them
        let (radio, timing) = settings("exec sleep 30", "echo \"$0 $@\"; exec sleep 30");
        let (supervisor, stdout) = RadioSupervisor::start(&radio, &timing).unwrap();

        let mut line = String::new();
        BufReader::new(stdout).read_line(&mut line).unwrap();
        assert_eq!(line.trim(), "-msgtype=idm -format=csv");

        supervisor.shutdown();
    }

    #[test]
    fn test_shutdown_kills_processes_ignoring_sigterm() {
        let (radio, timing) = settings(
            "exec sleep 30",
            "trap '' TERM; echo ready; while true; do sleep 0.05; done",
        );
        let (supervisor, stdout) = RadioSupervisor::start(&radio, &timing).unwrap();

        let mut line = String::new();
        BufReader::new(stdout).read_line(&mut line).unwrap();
        assert_eq!(line.trim(), "ready");

        let report = supervisor.shutdown();
        let decoder = report.decoder.expect("decoder reaped");
        assert_eq!(decoder.signal(), Some(9));
        assert!(report.receiver.is_some());
    }

    #[test]
    fn test_shutdown_before_decoder_launch() {
        let (radio, timing) = settings("exec sleep 30", "echo unreachable");
        let supervisor = RadioSupervisor::launch_receiver(&radio, &timing).unwrap();

        let report = supervisor.shutdown();
        let receiver = report.receiver.expect("receiver reaped");
        assert_eq!(receiver.signal(), Some(15));
        assert!(report.decoder.is_none());
    }

    #[test]
    fn test_missing_decoder_stops_receiver() {
        let (mut radio, timing) = settings("exec sleep 30", "");
        radio.decoder = CommandSpec::new("/nonexistent/rtlamr-binary");

        let err = RadioSupervisor::start(&radio, &timing).unwrap_err();
        assert!(err.to_string().contains("Failed to start decoder"));
    }
}
