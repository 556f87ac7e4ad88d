use tokio_util::sync::CancellationToken;

/// Wait for Ctrl-C (SIGINT) or SIGTERM, then cancel the engine.
pub async fn wait_for_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        fd_info!(sys, signal = "SIGINT", "received signal, initiating graceful shutdown");
                    }
                    _ = sigterm.recv() => {
                        fd_info!(sys, signal = "SIGTERM", "received signal, initiating graceful shutdown");
                    }
                }
            }
            Err(e) => {
                fd_warn!(sys, error = %e, "cannot listen for SIGTERM; only Ctrl-C stops the engine");
                wait_ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    wait_ctrl_c().await;

    cancel.cancel();
}

async fn wait_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => fd_info!(sys, signal = "SIGINT", "received signal, initiating graceful shutdown"),
        Err(e) => {
            fd_warn!(sys, error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
