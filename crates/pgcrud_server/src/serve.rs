//! Server lifecycle: bind, serve, drain, close.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use pgcrud_core::Gateway;

use crate::router::router;

/// Serve the gateway until a termination signal arrives, then drain
/// in-flight requests and close the pools.
pub async fn serve(gateway: Gateway) -> io::Result<()> {
    let config = gateway.config().clone();
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, format!("bind address: {err}")))?;

    let listener = TcpListener::bind(addr).await?;
    let actual = listener.local_addr()?;
    info!(%actual, "gateway listening");

    let app = router(gateway.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("draining complete; closing pools");
    gateway.close().await;
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received interrupt"),
        _ = terminate => info!("received terminate"),
    }
}
