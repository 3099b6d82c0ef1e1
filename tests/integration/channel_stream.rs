//! Channel client end to end over a real WebSocket

use crate::helpers::{
    Script, ServerEvent, TestServer, reference_frames, sample_frame, to_json, wait_for_state,
};
use pretty_assertions::assert_eq;
use sod_monitor::channel::{
    ChannelHandle, ChannelKey, ClientSettings, ConnectionPhase, ReconnectPolicy, RetentionPolicy,
};
use sod_monitor::transport::{WsTransport, channel_url};
use sod_monitor::view::HealthStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

fn settings() -> ClientSettings {
    ClientSettings {
        reconnect: ReconnectPolicy {
            delay: Duration::from_millis(100),
        },
        retention: RetentionPolicy::Unbounded,
    }
}

fn spawn(server: &TestServer, dataset: &str, channel: &str) -> ChannelHandle {
    let url = channel_url(&server.base, dataset, channel).unwrap();
    ChannelHandle::spawn(
        ChannelKey::new(dataset, channel),
        url,
        Arc::new(WsTransport),
        settings(),
    )
}

#[tokio::test]
async fn test_reference_stream() {
    let mut server = TestServer::start(vec![Script::hold(reference_frames())]).await;
    let handle = spawn(&server, "2nd_test", "B1-Ch1 (Fail-Outer)");

    assert_eq!(
        server.next_event().await,
        ServerEvent::Connected("/ws/2nd_test/B1-Ch1%20(Fail-Outer)".to_string())
    );

    let mut rx = handle.subscribe();
    let state = wait_for_state(&mut rx, |state| state.terminal).await;

    assert_eq!(state.phase, ConnectionPhase::Open);
    assert_eq!(state.buffer.len(), 3);
    assert_eq!(state.threshold, Some(5.2));
    assert_eq!(state.sod_index, Some(2));
    assert_eq!(state.epoch, 1);
    assert_eq!(state.dropped_frames, 0);

    let view = handle.view();
    assert_eq!(view.health, HealthStatus::Degraded);
    assert_eq!(view.health.label(), "Degradation Detected");
    assert_eq!(view.connection_label(), "Live");
    assert_eq!(view.last_raw_label(), "6.000");

    assert_ok!(handle.shutdown().await);
    assert_eq!(
        server.next_event().await,
        ServerEvent::Disconnected("/ws/2nd_test/B1-Ch1%20(Fail-Outer)".to_string())
    );
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let mut server = TestServer::start(vec![
        Script::close_after(vec![
            sample_frame(0, 3.0, -1, 4.0),
            sample_frame(1, 4.5, 1, 4.0),
        ]),
        Script::hold(vec![sample_frame(0, 2.9, -1, 0.0)]),
    ])
    .await;
    let handle = spawn(&server, "1st_test", "B3-Ch1 (Fail-Inner)");
    let mut rx = handle.subscribe();

    assert!(matches!(server.next_event().await, ServerEvent::Connected(_)));
    assert!(matches!(server.next_event().await, ServerEvent::Disconnected(_)));
    assert!(matches!(server.next_event().await, ServerEvent::Connected(_)));

    let state = wait_for_state(&mut rx, |state| {
        state.epoch == 2 && state.buffer.len() == 1
    })
    .await;

    // the new epoch forgot everything from the first connection
    assert_eq!(state.sod_index, None);
    assert_eq!(state.threshold, None);
    assert_eq!(state.last_sample().map(|sample| sample.raw), Some(2.9));
    assert_eq!(state.reconnect_attempts, 1);

    assert_ok!(handle.shutdown().await);
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let mut server = TestServer::start(vec![Script::raw(vec![
        to_json(&sample_frame(0, 3.0, -1, 0.0)),
        "not json".to_string(),
        r#"{"raw": 1.0}"#.to_string(),
        r#"{"index": 1, "raw": 3.2, "sod_index": -7}"#.to_string(),
        to_json(&sample_frame(1, 3.4, -1, 4.0)),
    ])])
    .await;
    let handle = spawn(&server, "3rd_test", "B3-Ch1 (Fail-Outer)");
    let mut rx = handle.subscribe();

    assert!(matches!(server.next_event().await, ServerEvent::Connected(_)));
    let state = wait_for_state(&mut rx, |state| state.buffer.len() == 2).await;

    assert_eq!(state.dropped_frames, 3);
    assert_eq!(state.phase, ConnectionPhase::Open);
    assert_eq!(state.epoch, 1);
    assert_eq!(state.threshold, Some(4.0));
    assert_eq!(state.sod_index, None);

    assert_ok!(handle.shutdown().await);
}

#[tokio::test]
async fn test_keeps_retrying_without_server() {
    // nothing listens on this port once the listener is dropped
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = url::Url::parse(&format!("ws://{}/ws", addr)).unwrap();
    let handle = ChannelHandle::spawn(
        ChannelKey::new("1st_test", "B1-Ch1 (Healthy)"),
        channel_url(&base, "1st_test", "B1-Ch1 (Healthy)").unwrap(),
        Arc::new(WsTransport),
        settings(),
    );
    let mut rx = handle.subscribe();

    let state = wait_for_state(&mut rx, |state| state.reconnect_attempts >= 3).await;

    assert_eq!(state.epoch, 0);
    assert!(state.last_error.is_some());
    assert!(!handle.is_stopped());

    assert_ok!(handle.shutdown().await);
}
