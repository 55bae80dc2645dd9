//! Backend connectivity monitor.
//!
//! Polls `GET /health` on a fixed cadence. Each poll makes a bounded number of
//! attempts and resolves independently to connected or disconnected; the
//! monitor never goes back to `Connecting` once a poll has resolved.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::remote::RemoteAccessor;

/// Pause between attempts within one poll.
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Connecting,
    Connected { version: String },
    Disconnected,
}

impl HealthStatus {
    pub fn label(&self) -> String {
        match self {
            HealthStatus::Connecting => "connecting".to_string(),
            HealthStatus::Connected { version } if version.is_empty() => "connected".to_string(),
            HealthStatus::Connected { version } => format!("connected (v{version})"),
            HealthStatus::Disconnected => "disconnected".to_string(),
        }
    }
}

/// Latest resolved status and when it was resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub resolved_at: Option<Instant>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            status: HealthStatus::Connecting,
            resolved_at: None,
        }
    }
}

impl HealthSnapshot {
    pub fn is_connected(&self) -> bool {
        matches!(self.status, HealthStatus::Connected { .. })
    }

    /// A resolved snapshot older than `max_age` is stale. `Connecting` never is.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.resolved_at
            .map(|at| at.elapsed() > max_age)
            .unwrap_or(false)
    }
}

/// Run one poll: up to `attempts` health checks, stopping at the first success.
pub async fn poll_once<A: RemoteAccessor>(remote: &A, attempts: u32) -> HealthStatus {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match remote.check_health().await {
            Ok(report) if report.is_ok() => {
                return HealthStatus::Connected {
                    version: report.version,
                };
            }
            Ok(report) => {
                debug!(attempt, status = %report.status, "health check reported not ok");
            }
            Err(e) => {
                debug!(attempt, error = %e, "health check failed");
            }
        }
        if attempt < attempts {
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
    HealthStatus::Disconnected
}

/// Background health poller. Dropping the monitor stops polling.
pub struct HealthMonitor {
    tx: Arc<watch::Sender<HealthSnapshot>>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start polling immediately, then every `interval`.
    pub fn spawn<A: RemoteAccessor>(remote: Arc<A>, interval: Duration, attempts: u32) -> Self {
        let (tx, _rx) = watch::channel(HealthSnapshot::default());
        let tx = Arc::new(tx);
        let wake = Arc::new(Notify::new());

        let task = {
            let tx = Arc::clone(&tx);
            let wake = Arc::clone(&wake);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = wake.notified() => {}
                    }
                    let status = poll_once(remote.as_ref(), attempts).await;
                    let previous = tx.borrow().status.clone();
                    if previous != status {
                        match &status {
                            HealthStatus::Disconnected => warn!("backend disconnected"),
                            other => info!(status = %other.label(), "backend health changed"),
                        }
                    }
                    tx.send_replace(HealthSnapshot {
                        status,
                        resolved_at: Some(Instant::now()),
                    });
                }
            })
        };

        Self { tx, wake, task }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.tx.subscribe()
    }

    /// Poll now instead of waiting for the next tick.
    pub fn refresh_now(&self) {
        self.wake.notify_one();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_include_version() {
        assert_eq!(
            HealthStatus::Connected {
                version: "2.1.0".into()
            }
            .label(),
            "connected (v2.1.0)"
        );
        assert_eq!(HealthStatus::Disconnected.label(), "disconnected");
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_goes_stale_after_max_age() {
        let snapshot = HealthSnapshot {
            status: HealthStatus::Disconnected,
            resolved_at: Some(Instant::now()),
        };
        assert!(!snapshot.is_stale(Duration::from_secs(60)));
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(snapshot.is_stale(Duration::from_secs(60)));
    }

    #[test]
    fn connecting_is_never_stale() {
        assert!(!HealthSnapshot::default().is_stale(Duration::ZERO));
    }
}
