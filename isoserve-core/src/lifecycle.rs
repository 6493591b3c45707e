//! Server lifecycle and shutdown coordination
//!
//! The lifecycle state is a single atomic so it can be advanced from any
//! context (a signal watcher, a test, the accept loop) without taking a lock.
//! Waiters are woken through a [`Notify`]; the state itself is always the
//! source of truth and is re-checked after every wake-up.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Lifecycle {
    /// Created, socket not yet accepting
    Starting = 0,
    /// Accept loop is running
    Running = 1,
    /// Shutdown requested, accept loop unwinding
    Stopping = 2,
    /// Accept loop returned and the listener is closed
    Stopped = 3,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Starting,
            1 => Lifecycle::Running,
            2 => Lifecycle::Stopping,
            _ => Lifecycle::Stopped,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Starting => "starting",
            Lifecycle::Running => "running",
            Lifecycle::Stopping => "stopping",
            Lifecycle::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

struct Inner {
    state: AtomicU8,
    changed: Notify,
}

/// Shared handle to a server's lifecycle.
///
/// Clones refer to the same state. [`request`](Self::request) never blocks
/// and may be called any number of times from anywhere;
/// [`shutdown`](Self::shutdown) additionally waits for the accept loop to
/// finish and therefore must not be awaited from the task that runs the loop.
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("state", &self.state())
            .finish()
    }
}

impl ShutdownHandle {
    /// Create a handle in the `Starting` state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(Lifecycle::Starting as u8),
                changed: Notify::new(),
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> Lifecycle {
        Lifecycle::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether a shutdown has been requested or has completed
    pub fn is_shutting_down(&self) -> bool {
        self.state() >= Lifecycle::Stopping
    }

    /// `Starting -> Running`. Returns false if a shutdown got there first.
    pub fn mark_running(&self) -> bool {
        let swapped = self
            .inner
            .state
            .compare_exchange(
                Lifecycle::Starting as u8,
                Lifecycle::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if swapped {
            self.inner.changed.notify_waiters();
        }
        swapped
    }

    /// Ask the accept loop to stop without waiting for it.
    ///
    /// Returns `true` only for the call that performed the
    /// `Starting|Running -> Stopping` transition.
    pub fn request(&self) -> bool {
        let mut current = self.inner.state.load(Ordering::Acquire);
        loop {
            if Lifecycle::from_u8(current) >= Lifecycle::Stopping {
                tracing::debug!("Shutdown already {}", Lifecycle::from_u8(current));
                return false;
            }
            match self.inner.state.compare_exchange_weak(
                current,
                Lifecycle::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    tracing::info!("🛑 Shutdown requested");
                    self.inner.changed.notify_waiters();
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Record that the accept loop has returned and the listener is closed
    pub fn mark_stopped(&self) {
        let previous = self
            .inner
            .state
            .swap(Lifecycle::Stopped as u8, Ordering::AcqRel);
        if previous != Lifecycle::Stopped as u8 {
            tracing::debug!("Lifecycle {} -> stopped", Lifecycle::from_u8(previous));
        }
        self.inner.changed.notify_waiters();
    }

    /// Wait until a shutdown has been requested
    pub async fn requested(&self) {
        self.wait_for(Lifecycle::Stopping).await
    }

    /// Wait until the accept loop has stopped
    pub async fn stopped(&self) {
        self.wait_for(Lifecycle::Stopped).await
    }

    /// Request a shutdown and wait for the accept loop to finish
    pub async fn shutdown(&self) {
        self.request();
        self.stopped().await
    }

    async fn wait_for(&self, target: Lifecycle) {
        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent notify_waiters is not lost.
            notified.as_mut().enable();
            if self.state() >= target {
                return;
            }
            notified.await;
        }
    }
}
