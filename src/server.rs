//! Listener loop with lifecycle-driven shutdown

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::lifecycle::Lifecycle;

/// Serve `app` on `listener` until the lifecycle requests shutdown.
///
/// A graceful shutdown stops accepting connections and waits for in-flight
/// requests, for at most `grace`. A forced shutdown (or an expired grace
/// period) returns immediately without waiting for open connections; they
/// end when the runtime does. The
/// lifecycle is `Running` while this future is pending and `Stopped` once it
/// resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    lifecycle: Lifecycle,
    grace: Duration,
) -> std::io::Result<()> {
    let graceful = lifecycle.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { graceful.shutdown_requested().await })
    .into_future();

    lifecycle.mark_running();

    let result = tokio::select! {
        result = server => result,
        _ = force_deadline(&lifecycle, grace) => {
            warn!("Shutdown forced; not waiting for open connections");
            Ok(())
        }
    };

    lifecycle.mark_stopped();
    info!("Server shutdown complete");
    result
}

/// Resolves on an explicit force request, or `grace` after a graceful one
async fn force_deadline(lifecycle: &Lifecycle, grace: Duration) {
    let drain_expired = async {
        lifecycle.shutdown_requested().await;
        info!("Draining in-flight requests (up to {:?})", grace);
        tokio::time::sleep(grace).await;
        warn!("Graceful shutdown exceeded {:?}", grace);
    };

    tokio::select! {
        _ = lifecycle.force_requested() => {}
        _ = drain_expired => {}
    }
}
