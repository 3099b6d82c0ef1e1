//! Dataset switching against a real WebSocket server

use crate::helpers::{Script, ServerEvent, TestServer, TEST_TIMEOUT, reference_frames};
use pretty_assertions::assert_eq;
use sod_monitor::config::{Config, DatasetConfig};
use sod_monitor::dashboard::Dashboard;
use sod_monitor::transport::WsTransport;
use sod_monitor::view::HealthStatus;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn config(server: &TestServer) -> Config {
    Config {
        endpoint: server.base.to_string(),
        datasets: vec![
            DatasetConfig {
                id: "2nd_test".to_string(),
                label: Some("Test Set 2".to_string()),
                channels: vec![
                    "B1-Ch1 (Fail-Outer)".to_string(),
                    "B2-Ch1 (Healthy)".to_string(),
                ],
            },
            DatasetConfig {
                id: "3rd_test".to_string(),
                label: None,
                channels: vec!["B3-Ch1 (Fail-Outer)".to_string()],
            },
        ],
        ..Config::default()
    }
}

async fn connected_paths(server: &mut TestServer, count: usize) -> HashSet<String> {
    let mut paths = HashSet::new();
    while paths.len() < count {
        if let ServerEvent::Connected(path) = server.next_event().await {
            paths.insert(path);
        }
    }
    paths
}

async fn wait_until(dashboard: &Dashboard, predicate: impl Fn(&Dashboard) -> bool) {
    tokio::time::timeout(TEST_TIMEOUT, async {
        while !predicate(dashboard) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for the dashboard");
}

#[tokio::test]
async fn test_switching_datasets() {
    let mut server = TestServer::start(vec![]).await;
    let settings = config(&server).dashboard_settings().unwrap();

    let mut dashboard = Dashboard::start(settings, Arc::new(WsTransport))
        .await
        .unwrap();

    assert_eq!(
        connected_paths(&mut server, 2).await,
        HashSet::from([
            "/ws/2nd_test/B1-Ch1%20(Fail-Outer)".to_string(),
            "/ws/2nd_test/B2-Ch1%20(Healthy)".to_string(),
        ])
    );
    wait_until(&dashboard, |d| d.views().iter().all(|v| v.is_live())).await;

    dashboard.activate_next().await.unwrap();
    assert_eq!(dashboard.active_id(), Some("3rd_test"));
    assert_eq!(dashboard.clients().len(), 1);

    // old channels close, the new one connects
    let mut disconnected = HashSet::new();
    let mut connected = None;
    while disconnected.len() < 2 || connected.is_none() {
        match server.next_event().await {
            ServerEvent::Disconnected(path) => {
                disconnected.insert(path);
            }
            ServerEvent::Connected(path) => connected = Some(path),
        }
    }
    assert_eq!(disconnected.len(), 2);
    assert_eq!(
        connected.as_deref(),
        Some("/ws/3rd_test/B3-Ch1%20(Fail-Outer)")
    );

    dashboard.shutdown().await;
    assert_eq!(dashboard.active_id(), None);
    assert!(dashboard.clients().is_empty());
}

#[tokio::test]
async fn test_dashboard_views() {
    let mut server = TestServer::start(vec![Script::hold(reference_frames())]).await;
    let mut cfg = config(&server);
    cfg.initial_dataset = Some("3rd_test".to_string());

    let mut dashboard = Dashboard::start(cfg.dashboard_settings().unwrap(), Arc::new(WsTransport))
        .await
        .unwrap();
    connected_paths(&mut server, 1).await;

    wait_until(&dashboard, |d| d.views().iter().all(|v| v.finished)).await;

    let views = dashboard.views();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].channel, "B3-Ch1 (Fail-Outer)");
    assert_eq!(views[0].health, HealthStatus::Degraded);
    assert_eq!(views[0].sample_count, 3);
    assert_eq!(views[0].threshold_line, Some(5.2));
    assert_eq!(views[0].degradation_marker, Some(2));

    dashboard.shutdown().await;
}
