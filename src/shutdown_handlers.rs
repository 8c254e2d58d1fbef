use h2scope::shutdown::ShutdownSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Broadcasts shutdown on Ctrl+C or SIGTERM. The task also ends when some
/// other part of the program sends shutdown first.
pub fn setup_signal_shutdown_handler(shutdown_tx: &ShutdownSender) -> JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let signal_name = tokio::select! {
            _ = shutdown_rx.recv() => return,
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => "Ctrl+C",
                Err(err) => {
                    warn!("Failed to listen for Ctrl+C: {}", err);
                    // Keep SIGTERM and explicit shutdown working.
                    std::future::pending::<()>().await;
                    return;
                }
            },
            () = terminate_signal() => "SIGTERM",
        };
        info!("Received {}, shutting down", signal_name);
        drop(shutdown_tx.send(()));
    })
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(err) => {
            warn!("Failed to register SIGTERM handler: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
