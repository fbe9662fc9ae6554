//! # OS signal handling.
//!
//! The operator's main future blocks on [`wait_for_termination`]; the
//! pipeline is torn down when the pod is asked to stop. In-flight tasks
//! are not drained — the queue dump keeps the last committed state for
//! whoever looks at the pod afterwards.
//!
//! ## Signals
//! **Unix:** `SIGINT` (Ctrl-C), `SIGTERM` (kubelet's stop signal),
//! `SIGQUIT`.
//!
//! **Elsewhere:** Ctrl-C via [`tokio::signal::ctrl_c`].

/// Waits for a termination signal and returns its name for the final
/// log line.
#[cfg(unix)]
pub(crate) async fn wait_for_termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for a termination signal and returns its name for the final
/// log line.
#[cfg(not(unix))]
pub(crate) async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
