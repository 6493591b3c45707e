//! OS signal handling
//!
//! Signals only ever *request* a shutdown. The wait for the accept loop to
//! wind down runs on its own task, so the watcher is immediately free to
//! receive the next signal and can never end up waiting on the loop it is
//! trying to stop.

use isoserve_core::ShutdownHandle;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Listens for SIGINT and SIGTERM (Ctrl+C elsewhere)
pub struct SignalWatcher {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl SignalWatcher {
    /// Install the handlers now, so a signal arriving before the watcher is
    /// first polled is not lost. Must be called from within a Tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Forward every received signal to `shutdown` until the stream ends
    pub async fn run(mut self, shutdown: ShutdownHandle) {
        tracing::debug!("📡 Signal listener active");

        while let Some(name) = self.next().await {
            if shutdown.is_shutting_down() {
                tracing::info!("🔔 Received {}, shutdown already in progress", name);
            } else {
                tracing::info!("🔔 Received {}, shutting down", name);
            }

            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                shutdown.shutdown().await;
                tracing::debug!("Shutdown after {} complete", name);
            });
        }
    }

    #[cfg(unix)]
    async fn next(&mut self) -> Option<&'static str> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|_| "SIGINT"),
            received = self.terminate.recv() => received.map(|_| "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    async fn next(&mut self) -> Option<&'static str> {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some("Ctrl+C"),
            Err(e) => {
                tracing::error!("❌ Failed to listen for Ctrl+C: {}", e);
                None
            }
        }
    }
}
