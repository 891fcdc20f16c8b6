/// Wait for the platform's hangup signal. The handler does nothing but
/// wake the accept loop -- all cleanup runs afterward, in normal task
/// context, via `Pbx::shutdown`.
#[cfg(unix)]
pub async fn wait_for_hangup() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
    hangup.recv().await;
    log::info!("cli: received SIGHUP");
}

/// Non-Unix fallback: treat Ctrl-C as the shutdown trigger, since there is
/// no SIGHUP to listen for.
#[cfg(not(unix))]
pub async fn wait_for_hangup() {
    let _ = tokio::signal::ctrl_c().await;
    log::info!("cli: received shutdown signal");
}
