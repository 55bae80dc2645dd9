mod util;

use std::sync::Arc;
use std::time::Duration;

use risk_console::health::{HealthMonitor, HealthStatus, poll_once};
use risk_console::remote::RemoteError;
use util::{FakeRemote, healthy};

fn unreachable() -> Result<risk_console::model::types::HealthReport, RemoteError> {
    Err(RemoteError::NetworkUnavailable("connection refused".into()))
}

#[tokio::test(start_paused = true)]
async fn first_poll_resolves_to_connected_with_version() {
    let remote = FakeRemote::new();
    let monitor = HealthMonitor::spawn(Arc::new(remote.clone()), Duration::from_secs(30), 2);
    let mut rx = monitor.subscribe();
    assert_eq!(rx.borrow().status, HealthStatus::Connecting);

    rx.changed().await.unwrap();

    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(
        snapshot.status,
        HealthStatus::Connected {
            version: "2.1.0".into()
        }
    );
    assert!(snapshot.resolved_at.is_some());
    assert_eq!(monitor.snapshot(), snapshot);
    assert_eq!(remote.health_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_gives_up_after_bounded_attempts() {
    let remote = FakeRemote::new();
    remote.set_health_fallback(unreachable());

    let status = poll_once(&remote, 2).await;

    assert_eq!(status, HealthStatus::Disconnected);
    assert_eq!(remote.health_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_within_one_poll_can_still_connect() {
    let remote = FakeRemote::new();
    remote.push_health(unreachable());

    let status = poll_once(&remote, 2).await;

    assert!(matches!(status, HealthStatus::Connected { .. }));
    assert_eq!(remote.health_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn not_ok_status_counts_as_failed_attempt() {
    let remote = FakeRemote::new();
    remote.set_health_fallback(Ok(risk_console::model::types::HealthReport {
        status: "degraded".into(),
        version: "2.1.0".into(),
    }));

    assert_eq!(poll_once(&remote, 3).await, HealthStatus::Disconnected);
    assert_eq!(remote.health_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn each_poll_resolves_independently() {
    let remote = FakeRemote::new();
    remote.push_health(unreachable()).push_health(unreachable());
    remote.push_health(healthy());
    let monitor = HealthMonitor::spawn(Arc::new(remote.clone()), Duration::from_secs(30), 2);
    let mut rx = monitor.subscribe();

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().status, HealthStatus::Disconnected);

    let before = tokio::time::Instant::now();
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_connected());
    assert!(tokio::time::Instant::now() - before >= Duration::from_secs(29));
}

#[tokio::test(start_paused = true)]
async fn refresh_now_polls_without_waiting_for_the_interval() {
    let remote = FakeRemote::new();
    let monitor = HealthMonitor::spawn(Arc::new(remote.clone()), Duration::from_secs(3600), 2);
    let mut rx = monitor.subscribe();
    rx.changed().await.unwrap();
    rx.borrow_and_update();
    let before = tokio::time::Instant::now();

    monitor.refresh_now();
    rx.changed().await.unwrap();

    assert!(tokio::time::Instant::now() - before < Duration::from_secs(60));
    assert_eq!(remote.health_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_monitor_stops_polling() {
    let remote = FakeRemote::new();
    let monitor = HealthMonitor::spawn(Arc::new(remote.clone()), Duration::from_secs(30), 2);
    let mut rx = monitor.subscribe();
    rx.changed().await.unwrap();
    drop(monitor);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(remote.health_calls(), 1);
}
