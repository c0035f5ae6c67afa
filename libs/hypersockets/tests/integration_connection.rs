//! Integration tests for WebSocket connection management
//!
//! These tests verify connection state transitions and the client lifecycle
//! against a local mock server.

mod common;

use common::{
    next_event, unused_addr, wait_until, Collector, MockWsServer, TestRoute, TextRouter,
};
use hypersockets::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use hypersockets::{ClientEvent, ExponentialBackoff, FixedDelay, JsonPassivePing, WsMessage};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn pong_detector() -> JsonPassivePing {
    JsonPassivePing::new("type", "ping", WsMessage::text(r#"{"type":"pong"}"#))
}

#[test]
fn test_connection_state_full_lifecycle() {
    verbose_println!("Testing full connection lifecycle...");

    let state = AtomicConnectionState::new(ConnectionState::Connecting);
    assert!(state.is_connecting());

    state.record_open();
    assert!(state.is_open());

    state.set(ConnectionState::Closed);
    assert!(state.is_closed());

    state.set(ConnectionState::Connecting);
    state.record_open();
    assert!(state.is_open());

    state.set(ConnectionState::ShutDown);
    assert!(state.is_shut_down());
}

#[test]
fn test_concurrent_state_access() {
    let state = Arc::new(AtomicConnectionState::new(ConnectionState::Closed));
    let metrics = Arc::new(AtomicMetrics::new());

    let mut handles = vec![];

    for _ in 0..3 {
        let state = Arc::clone(&state);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                state.set(ConnectionState::Open);
                state.set(ConnectionState::Closed);
            }
        }));
    }

    for _ in 0..5 {
        let metrics = Arc::clone(&metrics);
        handles.push(thread::spawn(move || {
            for _ in 0..1000 {
                metrics.increment_sent();
                metrics.increment_received();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(metrics.messages_sent(), 5000);
    assert_eq!(metrics.messages_received(), 5000);
    assert_eq!(state.get(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_messages_delivered_in_arrival_order() {
    let script: Vec<String> = (0..50).map(|i| format!("frame-{i:02}")).collect();
    let server = MockWsServer::start(script.clone(), false).await;
    let (collector, seen) = Collector::new();

    let client = hypersockets::builder()
        .url(server.ws_url())
        .router(TextRouter, |routing| routing.handler(TestRoute::All, collector))
        .build()
        .await
        .unwrap();

    assert!(wait_until(WAIT, || seen.lock().len() == 50).await);
    assert_eq!(*seen.lock(), script);
    assert!(client.is_connected());
    assert_eq!(client.metrics().messages_received, 50);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_passive_ping_is_answered_and_not_routed() {
    let script = vec![
        r#"{"type":"ping"}"#.to_string(),
        r#"{"type":"connected"}"#.to_string(),
    ];
    let server = MockWsServer::start(script, false).await;
    let (collector, seen) = Collector::new();

    let client = hypersockets::builder()
        .url(server.ws_url())
        .router(TextRouter, |routing| routing.handler(TestRoute::All, collector))
        .passive_ping(pong_detector())
        .build()
        .await
        .unwrap();

    assert!(wait_until(WAIT, || server.received().contains(&r#"{"type":"pong"}"#.to_string())).await);
    assert!(wait_until(WAIT, || seen.lock().len() == 1).await);
    assert_eq!(seen.lock()[0], r#"{"type":"connected"}"#);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_send_reaches_server() {
    let server = MockWsServer::start(Vec::new(), false).await;
    let (collector, _seen) = Collector::new();

    let client = hypersockets::builder()
        .url(server.ws_url())
        .router(TextRouter, |routing| routing.handler(TestRoute::All, collector))
        .build()
        .await
        .unwrap();

    client.send(WsMessage::text("hello")).unwrap();
    assert!(wait_until(WAIT, || server.received() == vec!["hello".to_string()]).await);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = MockWsServer::start(vec!["hello".to_string()], true).await;
    let (collector, seen) = Collector::new();

    let client = hypersockets::builder()
        .url(server.ws_url())
        .router(TextRouter, |routing| routing.handler(TestRoute::All, collector))
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(20), None))
        .build()
        .await
        .unwrap();

    assert!(wait_until(WAIT, || server.connection_count() >= 3).await);
    assert!(wait_until(WAIT, || seen.lock().len() >= 2).await);

    let mut saw_reconnecting = false;
    while let Some(event) = client.try_recv_event() {
        verbose_println!("  event: {:?}", event);
        if matches!(event, ClientEvent::Reconnecting(_)) {
            saw_reconnecting = true;
        }
    }
    assert!(saw_reconnecting);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_reconnecting() {
    let server = MockWsServer::start(Vec::new(), true).await;
    let (collector, _seen) = Collector::new();

    let client = hypersockets::builder()
        .url(server.ws_url())
        .router(TextRouter, |routing| routing.handler(TestRoute::All, collector))
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(50), None))
        .build()
        .await
        .unwrap();

    assert!(wait_until(WAIT, || server.connection_count() >= 2).await);
    client.shutdown().await.unwrap();

    let after_shutdown = server.connection_count();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connection_count(), after_shutdown);
}

#[tokio::test]
async fn test_unreachable_server_keeps_counting_attempts() {
    let addr = unused_addr().await;
    let (collector, _seen) = Collector::new();

    let client = hypersockets::builder()
        .url(format!("ws://{addr}"))
        .router(TextRouter, |routing| routing.handler(TestRoute::All, collector))
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(10), None))
        .build()
        .await
        .unwrap();

    assert!(wait_until(WAIT, || client.reconnect_attempts() >= 3).await);
    assert!(!client.is_connected());

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_open_resets_backoff_after_failed_attempts() {
    let addr = unused_addr().await;
    let (collector, _seen) = Collector::new();
    let base = Duration::from_millis(50);

    let client = hypersockets::builder()
        .url(format!("ws://{addr}"))
        .router(TextRouter, |routing| routing.handler(TestRoute::All, collector))
        .reconnect_strategy(ExponentialBackoff::unlimited(base, Duration::from_secs(5)))
        .build()
        .await
        .unwrap();

    // Failed attempts 0..3 waited 50, 100 and 200ms; the next would wait 400ms
    assert!(wait_until(WAIT, || client.reconnect_attempts() >= 3).await);
    let failed = client.reconnect_attempts();
    verbose_println!("  failed attempts before server start: {}", failed);

    let server = MockWsServer::start_on(addr, Vec::new(), false).await;

    loop {
        match next_event(&client, WAIT).await {
            Some(ClientEvent::Connected) => break,
            Some(_) => continue,
            None => panic!("client never connected"),
        }
    }
    assert!(client.is_connected());
    assert_eq!(client.reconnect_attempts(), 0);

    // Server goes away: the first retry is back at the base delay
    server.shutdown();
    loop {
        match next_event(&client, WAIT).await {
            Some(ClientEvent::Disconnected) => break,
            Some(_) => continue,
            None => panic!("client never saw the disconnect"),
        }
    }
    let closed_at = tokio::time::Instant::now();
    let retry = loop {
        match next_event(&client, WAIT).await {
            Some(ClientEvent::Reconnecting(attempts)) => break attempts,
            Some(_) => continue,
            None => panic!("client never retried"),
        }
    };
    let waited = closed_at.elapsed();
    verbose_println!("  retry {} after {:?}", retry, waited);

    assert_eq!(retry, 1);
    assert!(waited >= base / 2, "retried too early: {:?}", waited);
    assert!(waited < base * 6, "backoff was not reset: {:?}", waited);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_drop_stops_client() {
    let server = MockWsServer::start(Vec::new(), true).await;
    let (collector, _seen) = Collector::new();

    let client = hypersockets::builder()
        .url(server.ws_url())
        .router(TextRouter, |routing| routing.handler(TestRoute::All, collector))
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(30), None))
        .build()
        .await
        .unwrap();

    assert!(wait_until(WAIT, || server.connection_count() >= 1).await);
    drop(client);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_drop = server.connection_count();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connection_count(), after_drop);
}
