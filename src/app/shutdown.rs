use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Cancel `token` on SIGINT or SIGTERM.
pub fn spawn_signal_handler(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                info!("Initiating graceful shutdown");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

/// Resolve when the process receives SIGINT or, on unix, SIGTERM.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match unix_signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                warn!("Failed to create SIGTERM handler: {}", err);
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT (Ctrl+C)"),
        Err(err) => {
            error!("Failed to listen for SIGINT: {}", err);
            // Never resolve: without a handler only SIGTERM or the token can stop us.
            std::future::pending::<()>().await;
        }
    }
}
