//! Process signal handling
//!
//! SIGINT and SIGTERM are funneled into the same stop-trigger channel the
//! size monitor and source-error paths use, so a signal finalizes the
//! session instead of killing the process mid-write. Registering the tokio
//! handlers replaces the default disposition for the process lifetime; a
//! signal arriving after finalization has begun is a no-op downstream.

use super::state::StopTrigger;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Register interrupt/terminate handlers once at startup
pub fn spawn_signal_listener(triggers: mpsc::Sender<StopTrigger>) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut interrupt = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("failed to register SIGINT handler: {}", e);
                    return;
                }
            };
            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("failed to register SIGTERM handler: {}", e);
                    return;
                }
            };

            tokio::select! {
                _ = interrupt.recv() => tracing::info!("received SIGINT"),
                _ = terminate.recv() => tracing::info!("received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {}", e);
                return;
            }
            tracing::info!("received ctrl-c");
        }

        let _ = triggers.send(StopTrigger::ExternalSignal).await;
    })
}
