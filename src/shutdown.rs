use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal
/// arrives. A scheduler carrying the token stops admitting and dispatching
/// jobs and drains whatever is already running.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, stopping dispatch and draining jobs");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, stopping dispatch and draining jobs");
            }
        }

        token_clone.cancel();
    });

    token
}
