//! Client lifecycle integration tests
//!
//! Tests for connecting, exchanging messages and disconnecting against a
//! real WebSocket server.

mod common;

use common::{closed_addr, next_event, record_events, wait_for_state, MockWsServer};
use hookup_client::{Client, ClientConfig, ConnectionState, Event, EventKind, Message, ReconnectSchedule};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_connect_fires_open() {
    let server = MockWsServer::new().await;
    let client = Client::new(ClientConfig::new(server.url())).unwrap();
    let mut events = record_events(&client, &[EventKind::Open]).await;

    assert!(!client.is_connected());
    client.connect().unwrap();

    assert_eq!(next_event(&mut events).await, Event::Open { connected: true });
    wait_for_state(&client, |state| state.is_connected()).await;
    assert!(client.is_connected());

    client.disconnect().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_send_and_receive() {
    let mut server = MockWsServer::new().await;
    let client = Client::new(ClientConfig::new(server.url())).unwrap();

    let (received_tx, mut received) = mpsc::unbounded_channel();
    client
        .on_receive(move |message: &Message| {
            let _ = received_tx.send(message.clone());
        })
        .await;

    client.connect().unwrap();
    wait_for_state(&client, |state| state.is_connected()).await;

    client.send("hello");
    assert_eq!(server.wait_for_message().await, Some("hello".to_string()));

    let echoed = tokio::time::timeout(Duration::from_secs(5), received.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echoed, Message::text("hello"));

    client.disconnect().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_binary_round_trip() {
    let server = MockWsServer::new().await;
    let client = Client::new(ClientConfig::new(server.url())).unwrap();
    let mut events = record_events(&client, &[EventKind::Data]).await;

    client.connect().unwrap();
    wait_for_state(&client, |state| state.is_connected()).await;

    client.send(vec![0u8, 159, 146, 150]);
    assert_eq!(
        next_event(&mut events).await,
        Event::Data(Message::binary(vec![0u8, 159, 146, 150]))
    );

    client.disconnect().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_server_push_is_delivered() {
    let mut server = MockWsServer::silent().await;
    let client = Client::new(ClientConfig::new(server.url())).unwrap();
    let mut events = record_events(&client, &[EventKind::Data]).await;

    client.connect().unwrap();
    server.wait_for_connection().await.unwrap();
    wait_for_state(&client, |state| state.is_connected()).await;

    server.push(r#"{"price":101.5}"#);
    let event = next_event(&mut events).await;
    assert_eq!(event.message().and_then(Message::as_text), Some(r#"{"price":101.5}"#));

    client.disconnect().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_send_json() {
    let mut server = MockWsServer::silent().await;
    let client = Client::new(ClientConfig::new(server.url())).unwrap();

    client.connect().unwrap();
    wait_for_state(&client, |state| state.is_connected()).await;

    client
        .send_json(&serde_json::json!({"action": "subscribe", "channel": "trades"}))
        .unwrap();

    let text = server.wait_for_message().await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value, serde_json::json!({"action": "subscribe", "channel": "trades"}));

    client.disconnect().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_unbuffered_send_while_disconnected_is_dropped() {
    let mut server = MockWsServer::silent().await;
    let client = Client::new(ClientConfig::new(server.url())).unwrap();
    assert!(!client.is_buffered());

    client.send("lost");
    client.connect().unwrap();
    wait_for_state(&client, |state| state.is_connected()).await;
    client.send("kept");

    assert_eq!(server.wait_for_message().await, Some("kept".to_string()));

    client.disconnect().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_fires_close() {
    let server = MockWsServer::new().await;
    let client = Client::new(ClientConfig::new(server.url())).unwrap();

    let closed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&closed);
    client
        .on_disconnected(move |event: &Event| {
            flag.store(event.connected() == Some(false), Ordering::SeqCst);
        })
        .await;

    client.connect().unwrap();
    wait_for_state(&client, |state| state.is_connected()).await;

    client.disconnect().await;
    assert!(closed.load(Ordering::SeqCst));
    assert!(!client.is_connected());
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // Repeated disconnects are harmless.
    client.disconnect().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_connect_refused_fires_close() {
    let addr = closed_addr().await;
    let client = Client::builder()
        .uri(format!("ws://{}/", addr))
        .reconnect_schedule(ReconnectSchedule::never())
        .build()
        .unwrap();
    let mut events = record_events(&client, &[EventKind::Open, EventKind::Close]).await;

    client.connect().unwrap();

    let event = next_event(&mut events).await;
    assert_eq!(event.kind(), EventKind::Close);
    assert_eq!(event.connected(), Some(false));
    wait_for_state(&client, |state| *state == ConnectionState::Disconnected).await;
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_reconnect_after_explicit_disconnect() {
    let server = MockWsServer::new().await;
    let client = Client::new(ClientConfig::new(server.url())).unwrap();
    let mut events = record_events(&client, &[EventKind::Open]).await;

    client.connect().unwrap();
    next_event(&mut events).await;
    client.disconnect().await;

    client.connect().unwrap();
    assert_eq!(next_event(&mut events).await, Event::Open { connected: true });
    wait_for_state(&client, |state| state.is_connected()).await;

    client.disconnect().await;
    server.shutdown().await;
}
