//! Termination signal handling
//!
//! SIGINT (Ctrl+C) and SIGTERM (service manager stop) both start the
//! shutdown sequence. Other signals keep their default behavior.
//!
//! Handlers are registered when the [`ShutdownListener`] is created, not
//! when it is first awaited. A signal delivered in between is queued and
//! returned by the next [`ShutdownListener::recv`].

use std::fmt;

/// The type of shutdown signal received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT - User interrupt (Ctrl+C)
    Interrupt,
    /// SIGTERM - Termination request (kill, systemd, Docker)
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Installed SIGINT/SIGTERM handlers.
///
/// Must be created inside a Tokio runtime context (`Runtime::enter` or
/// `block_on`).
#[cfg(unix)]
#[derive(Debug)]
pub struct ShutdownListener {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownListener {
    /// Register the handlers. Fails only if they cannot be installed.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next SIGINT or SIGTERM
    pub async fn recv(&mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.sigterm.recv() => ShutdownSignal::Terminate,
            _ = self.sigint.recv() => ShutdownSignal::Interrupt,
        }
    }
}

/// Windows-compatible listener (only handles Ctrl+C)
#[cfg(windows)]
#[derive(Debug)]
pub struct ShutdownListener {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl ShutdownListener {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    pub async fn recv(&mut self) -> ShutdownSignal {
        self.ctrl_c.recv().await;
        ShutdownSignal::Interrupt
    }
}
