//! OS signal handling for `ShutdownOptions::Signals`.

/// Resolve on the first termination request: SIGTERM or SIGINT on Unix,
/// Ctrl+C elsewhere.
pub async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => tracing::debug!("SIGTERM received"),
            _ = sigint.recv() => tracing::debug!("SIGINT received"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
