//! Server lifecycle state machine
//!
//! `Starting → Running → ShuttingDown → Stopped`. The shutdown endpoint and
//! OS signals both go through [`Lifecycle::request_shutdown`]; the listener
//! observes the resulting cancellation tokens, so there is no polled flag and
//! no background server thread.

use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, StreamExt, stream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Loading configuration and the model, binding the listener
    Starting,
    /// Accepting requests
    Running,
    /// No new connections; in-flight requests drain (or are dropped on force)
    ShuttingDown,
    /// Listener closed
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Stop accepting and let in-flight requests finish
    Graceful,
    /// Stop immediately, dropping open connections
    Force,
}

struct Inner {
    phase: watch::Sender<LifecyclePhase>,
    graceful: CancellationToken,
    force: CancellationToken,
}

/// Shared handle to the process lifecycle. Cheap to clone.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(LifecyclePhase::Starting);
        Self {
            inner: Arc::new(Inner {
                phase,
                graceful: CancellationToken::new(),
                force: CancellationToken::new(),
            }),
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.inner.phase.borrow()
    }

    /// `Starting → Running`; ignored in any other phase
    pub fn mark_running(&self) {
        self.inner.phase.send_if_modified(|phase| {
            if *phase == LifecyclePhase::Starting {
                *phase = LifecyclePhase::Running;
                true
            } else {
                false
            }
        });
    }

    /// Begin shutting down.
    ///
    /// Returns `true` if this call moved the lifecycle into `ShuttingDown`.
    /// A force request always escalates, even when a graceful shutdown is
    /// already under way.
    pub fn request_shutdown(&self, mode: ShutdownMode) -> bool {
        let started = self.inner.phase.send_if_modified(|phase| match phase {
            LifecyclePhase::Starting | LifecyclePhase::Running => {
                *phase = LifecyclePhase::ShuttingDown;
                true
            }
            LifecyclePhase::ShuttingDown | LifecyclePhase::Stopped => false,
        });

        self.inner.graceful.cancel();
        if mode == ShutdownMode::Force {
            self.inner.force.cancel();
        }

        started
    }

    /// Final transition once the listener is closed
    pub fn mark_stopped(&self) {
        self.inner.graceful.cancel();
        self.inner
            .phase
            .send_modify(|phase| *phase = LifecyclePhase::Stopped);
    }

    /// Resolves once any shutdown has been requested
    pub async fn shutdown_requested(&self) {
        self.inner.graceful.cancelled().await
    }

    /// Resolves once a forced shutdown has been requested
    pub async fn force_requested(&self) {
        self.inner.force.cancelled().await
    }

    /// Wait until the lifecycle reaches `target` (or has already passed it)
    pub async fn wait_for(&self, target: LifecyclePhase) {
        let mut rx = self.inner.phase.subscribe();
        let _ = rx.wait_for(|phase| rank(*phase) >= rank(target)).await;
    }
}

fn rank(phase: LifecyclePhase) -> u8 {
    match phase {
        LifecyclePhase::Starting => 0,
        LifecyclePhase::Running => 1,
        LifecyclePhase::ShuttingDown => 2,
        LifecyclePhase::Stopped => 3,
    }
}

/// Translate SIGINT/SIGTERM into lifecycle transitions.
///
/// The first signal requests a graceful shutdown; a second one while still
/// shutting down forces it.
pub async fn watch_signals(lifecycle: Lifecycle) {
    let signals = stream::unfold((), |()| async { Some((wait_for_signal().await, ())) });
    watch_signal_stream(lifecycle, signals).await
}

/// Apply each named signal from `signals` to the lifecycle. Returns once
/// shutdown is forced, the lifecycle has stopped, or the stream ends.
pub(crate) async fn watch_signal_stream<S>(lifecycle: Lifecycle, signals: S)
where
    S: Stream<Item = &'static str>,
{
    let mut signals = pin!(signals);

    while let Some(signal) = signals.next().await {
        match lifecycle.phase() {
            LifecyclePhase::Stopped => return,
            LifecyclePhase::ShuttingDown => {
                warn!("Received {} during shutdown, forcing exit", signal);
                lifecycle.request_shutdown(ShutdownMode::Force);
                return;
            }
            LifecyclePhase::Starting | LifecyclePhase::Running => {
                info!("Received {}, initiating graceful shutdown...", signal);
                lifecycle.request_shutdown(ShutdownMode::Graceful);
            }
        }
    }
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    }
}
