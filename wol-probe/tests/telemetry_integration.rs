//! TelemetryFetcher against loopback telemetry servers.

mod helpers;

use std::time::Duration;

use wol_probe::{ProbeError, TelemetryConfig, TelemetryFetcher, TelemetrySource};

fn fetcher(port: u16, timeout: Duration) -> TelemetryFetcher {
    TelemetryFetcher::new(TelemetryConfig::new().with_port(port).with_timeout(timeout))
}

#[tokio::test]
async fn test_fetch_reads_until_close_and_parses() {
    let (port, server) =
        helpers::telemetry_host("host: desk\nCPU Temperature: 48.25 C\n", false).await;

    let value = fetcher(port, Duration::from_secs(2))
        .fetch("127.0.0.1")
        .await
        .unwrap();

    assert_eq!(value, 48.25);
    server.abort();
}

#[tokio::test]
async fn test_fetch_returns_once_reading_seen_on_open_connection() {
    let (port, server) = helpers::telemetry_host("CPU Temperature: 55 C\n", true).await;

    let started = std::time::Instant::now();
    let value = fetcher(port, Duration::from_secs(2)).fetch_reading("127.0.0.1").await;

    assert_eq!(value, Some(55.0));
    assert!(started.elapsed() < Duration::from_secs(2));
    server.abort();
}

#[tokio::test]
async fn test_unexpected_content_is_parse_failure() {
    let (port, server) = helpers::telemetry_host("hello there\n", false).await;

    let err = fetcher(port, Duration::from_secs(2))
        .fetch("127.0.0.1")
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::ParseFailed(_)));
    server.abort();
}

#[tokio::test]
async fn test_refused_connection_is_connect_failure() {
    let port = helpers::closed_port().await;

    let fetcher = fetcher(port, Duration::from_secs(2));
    let err = fetcher.fetch("127.0.0.1").await.unwrap_err();
    assert!(matches!(err, ProbeError::ConnectFailed { .. }));

    assert_eq!(fetcher.fetch_reading("127.0.0.1").await, None);
}

#[tokio::test]
async fn test_silent_peer_times_out() {
    let (port, server) = helpers::silent_host().await;

    let started = std::time::Instant::now();
    let err = fetcher(port, Duration::from_millis(300))
        .fetch("127.0.0.1")
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
    server.abort();
}
