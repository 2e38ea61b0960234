//! Reconciliation behavior of the polling orchestrator, end to end.

use std::time::Duration;

use rstest::rstest;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use wol_polling::{HostId, PollTarget, PollingConfig, PollingOrchestrator, SensorId, SensorUpdate};
use wol_probe::testing::ScriptedTelemetry;
use wol_probe::TelemetryConfig;

fn scripted(
    source: std::sync::Arc<ScriptedTelemetry>,
) -> (PollingOrchestrator, mpsc::Receiver<SensorUpdate>) {
    let (tx, rx) = mpsc::channel(256);
    let config = PollingConfig::default().with_poll_interval(Duration::from_secs(5));
    (PollingOrchestrator::with_source(config, source, tx), rx)
}

#[tokio::test(start_paused = true)]
async fn reconcile_with_same_set_is_idempotent() {
    let source = ScriptedTelemetry::new();
    let (mut orchestrator, _rx) = scripted(source);
    let host = HostId::new();
    let required = vec![
        PollTarget::new(host, SensorId::new(), "10.0.0.1"),
        PollTarget::new(host, SensorId::new(), "10.0.0.1"),
    ];

    let first = orchestrator.reconcile(required.clone());
    assert_eq!(first.started.len(), 2);
    let before = orchestrator.stats();

    for _ in 0..3 {
        let report = orchestrator.reconcile(required.clone());
        assert!(report.is_noop());
    }

    let after = orchestrator.stats();
    assert_eq!(before.task_stats.len(), after.task_stats.len());
    for (b, a) in before.task_stats.iter().zip(after.task_stats.iter()) {
        assert_eq!(b.sensor_id, a.sensor_id);
        assert_eq!(b.generation, a.generation);
        assert_eq!(b.started_at, a.started_at);
    }
}

#[tokio::test(start_paused = true)]
async fn dropped_sensor_stops_fetching_and_its_updates_go_stale() {
    let source = ScriptedTelemetry::new();
    source.script("10.0.0.1", vec![Some(40.0)]);
    source.script("10.0.0.2", vec![Some(60.0)]);
    let (mut orchestrator, mut rx) = scripted(source.clone());

    let host = HostId::new();
    let kept = PollTarget::new(host, SensorId::new(), "10.0.0.2");
    let dropped = PollTarget::new(host, SensorId::new(), "10.0.0.1");
    orchestrator.reconcile(vec![kept.clone(), dropped.clone()]);

    // Let both tasks produce a first reading
    tokio::time::sleep(Duration::from_millis(10)).await;

    let report = orchestrator.reconcile(vec![kept.clone()]);
    assert_eq!(report.stopped, vec![dropped.sensor_id]);

    let fetched_before = source.fetch_count("10.0.0.1");
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.fetch_count("10.0.0.1"), fetched_before);
    assert!(source.fetch_count("10.0.0.2") > 1);

    // Anything still queued for the dropped sensor must be rejected
    while let Ok(update) = rx.try_recv() {
        if update.sensor_id == dropped.sensor_id {
            assert!(!orchestrator.is_current(&update));
        } else {
            assert!(orchestrator.is_current(&update));
            assert_eq!(update.value, 60.0);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn address_change_restarts_task() {
    let source = ScriptedTelemetry::new();
    source.script("10.0.0.1", vec![Some(40.0)]);
    source.script("10.0.0.9", vec![Some(90.0)]);
    let (mut orchestrator, mut rx) = scripted(source.clone());

    let host = HostId::new();
    let sensor = SensorId::new();
    orchestrator.reconcile(vec![PollTarget::new(host, sensor, "10.0.0.1")]);
    let old = rx.recv().await.unwrap();
    assert_eq!(old.value, 40.0);

    let report = orchestrator.reconcile(vec![PollTarget::new(host, sensor, "10.0.0.9")]);
    assert_eq!(report.restarted, vec![sensor]);
    assert!(report.started.is_empty());
    assert_eq!(orchestrator.bound_address(sensor), Some("10.0.0.9"));
    assert!(!orchestrator.is_current(&old));

    let fetched_old = source.fetch_count("10.0.0.1");
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(source.fetch_count("10.0.0.1"), fetched_old);

    let mut saw_new = false;
    while let Ok(update) = rx.try_recv() {
        if orchestrator.is_current(&update) {
            assert_eq!(update.value, 90.0);
            saw_new = true;
        }
    }
    assert!(saw_new);
}

#[rstest]
#[case::empty_to_three(0, 3)]
#[case::three_to_one(3, 1)]
#[case::three_to_none(3, 0)]
#[tokio::test(start_paused = true)]
async fn running_set_matches_required_set(#[case] initial: usize, #[case] next: usize) {
    let (mut orchestrator, _rx) = scripted(ScriptedTelemetry::new());
    let host = HostId::new();
    let targets: Vec<PollTarget> = (0..initial.max(next))
        .map(|i| PollTarget::new(host, SensorId::new(), format!("10.0.1.{i}")))
        .collect();

    orchestrator.reconcile(targets.iter().take(initial).cloned());
    orchestrator.reconcile(targets.iter().take(next).cloned());

    let mut expected: Vec<SensorId> = targets.iter().take(next).map(|t| t.sensor_id).collect();
    expected.sort();
    assert_eq!(orchestrator.running_sensors(), expected);
}

#[tokio::test(start_paused = true)]
async fn shutdown_all_stops_every_task() {
    let source = ScriptedTelemetry::new();
    source.script("10.0.0.1", vec![Some(1.0)]);
    let (mut orchestrator, _rx) = scripted(source.clone());
    let host = HostId::new();
    orchestrator.reconcile(vec![
        PollTarget::new(host, SensorId::new(), "10.0.0.1"),
        PollTarget::new(host, SensorId::new(), "10.0.0.1"),
    ]);
    tokio::time::sleep(Duration::from_millis(10)).await;

    orchestrator.shutdown_all().await.unwrap();
    assert!(orchestrator.is_empty());

    let fetched = source.fetch_count("10.0.0.1");
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.fetch_count("10.0.0.1"), fetched);

    // Still usable afterwards
    let report = orchestrator.reconcile(vec![PollTarget::new(host, SensorId::new(), "10.0.0.1")]);
    assert_eq!(report.started.len(), 1);
}

#[tokio::test]
async fn polls_real_telemetry_endpoint() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream.write_all(b"Load: 3%\nCPU Temperature: 47.5 C\n").await;
        }
    });

    let (tx, mut rx) = mpsc::channel(16);
    let config = PollingConfig::default()
        .with_poll_interval(Duration::from_millis(100))
        .with_telemetry(
            TelemetryConfig::new()
                .with_port(port)
                .with_timeout(Duration::from_secs(2)),
        );
    let mut orchestrator = PollingOrchestrator::new(config, tx);

    let host = HostId::new();
    let sensor = SensorId::new();
    orchestrator.reconcile(vec![PollTarget::new(host, sensor, "127.0.0.1")]);

    for _ in 0..2 {
        let update = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("reading within timeout")
            .expect("channel open");
        assert_eq!(update.host_id, host);
        assert_eq!(update.sensor_id, sensor);
        assert_eq!(update.value, 47.5);
        assert!(orchestrator.is_current(&update));
    }

    orchestrator.shutdown_all().await.unwrap();
}
