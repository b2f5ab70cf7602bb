//! Output-file size monitoring
//!
//! A background task polls the growing output file on a fixed cadence and
//! raises threshold/limit events without ever blocking sample routing.

use super::state::{SessionEvent, StopTrigger};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// File-size probe seam
///
/// Lets tests script the growth curve; production uses [`FsSizeProbe`].
pub trait SizeProbe: Send + Sync + 'static {
    fn size_of(&self, path: &Path) -> std::io::Result<u64>;
}

/// Probe backed by `std::fs::metadata`
pub struct FsSizeProbe;

impl SizeProbe for FsSizeProbe {
    fn size_of(&self, path: &Path) -> std::io::Result<u64> {
        std::fs::metadata(path).map(|m| m.len())
    }
}

/// Size limit configuration
#[derive(Debug, Clone, Copy)]
pub struct SizeLimits {
    pub max_bytes: u64,
    pub warning_percent: u8,
}

impl SizeLimits {
    /// Byte count at which the single warning fires
    pub fn warning_bytes(&self) -> u64 {
        self.max_bytes * self.warning_percent as u64 / 100
    }
}

/// Handle to a running size monitor
///
/// Cancellation is confirmed: `cancel` waits for the task to exit, so no
/// tick can fire concurrently with or after finalization.
pub struct SizeMonitorHandle {
    cancel_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SizeMonitorHandle {
    pub async fn cancel(self) {
        let _ = self.cancel_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!("size monitor task panicked: {}", e);
        }
    }
}

/// Background size monitor for the growing output file
pub struct SizeMonitor;

impl SizeMonitor {
    /// Spawn the monitor task
    ///
    /// Each tick reads the current file size (a probe failure is non-fatal:
    /// the file may not exist yet, so the tick reads as 0 and retries).
    /// The warning event fires at most once per session. On the first tick
    /// where the limit is reached the monitor emits the limit event, issues
    /// a stop trigger, and exits without ticking again.
    pub fn spawn(
        path: PathBuf,
        limits: SizeLimits,
        probe: Arc<dyn SizeProbe>,
        triggers: mpsc::Sender<StopTrigger>,
        events: broadcast::Sender<SessionEvent>,
        tick: Duration,
    ) -> SizeMonitorHandle {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let warning_bytes = limits.warning_bytes();
            let mut warned = false;
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::debug!(
                max_bytes = limits.max_bytes,
                warning_bytes,
                "size monitor started for {:?}",
                path
            );

            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        tracing::debug!("size monitor cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let size = match probe.size_of(&path) {
                            Ok(size) => size,
                            Err(e) => {
                                // File may not be created yet; retry next tick.
                                tracing::debug!("size probe failed: {}", e);
                                0
                            }
                        };

                        if !warned && size >= warning_bytes {
                            warned = true;
                            tracing::warn!(
                                size,
                                warning_bytes,
                                "output file crossed size warning threshold"
                            );
                            let _ = events.send(SessionEvent::SizeWarning {
                                bytes: size,
                                threshold: warning_bytes,
                            });
                        }

                        if size >= limits.max_bytes {
                            tracing::warn!(
                                size,
                                max_bytes = limits.max_bytes,
                                "output file reached size limit; stopping recording"
                            );
                            let _ = events.send(SessionEvent::SizeLimitReached {
                                bytes: size,
                                limit: limits.max_bytes,
                            });
                            let _ = triggers.send(StopTrigger::SizeLimitReached).await;
                            break;
                        }
                    }
                }
            }
        });

        SizeMonitorHandle { cancel_tx, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_bytes_is_percentage_of_max() {
        let limits = SizeLimits {
            max_bytes: 100 * 1024 * 1024,
            warning_percent: 75,
        };
        assert_eq!(limits.warning_bytes(), 75 * 1024 * 1024);
    }

    #[test]
    fn warning_bytes_zero_percent_always_fires() {
        let limits = SizeLimits {
            max_bytes: 1000,
            warning_percent: 0,
        };
        assert_eq!(limits.warning_bytes(), 0);
    }
}
