/*
[INPUT]:  Connection lifecycle scenarios against an in-process mock bot
[OUTPUT]: Test results for ConnectionManager and EventStream
[POS]:    Integration tests - transport connection
[UPDATE]: When connection lifecycle or outbound framing changes
*/

mod common;

use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;

use common::{MockBot, expected_auth_frame, silent, test_credential};
use gct_ws_client::{ConnectionManager, Request, TransportEvent};

async fn next_event(rx: &mut broadcast::Receiver<TransportEvent>) -> TransportEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("transport channel closed")
}

async fn wait_closed(manager: &ConnectionManager) {
    for _ in 0..100 {
        if !manager.is_open().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("connection never reported closed");
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let bot = MockBot::start(silent).await;
    let manager = ConnectionManager::new(test_credential(), 16);

    let first = manager.connect(&bot.url).await.unwrap();
    let second = manager.connect(&bot.url).await.unwrap();

    assert_eq!(first.id(), second.id());
    assert!(first.is_open());
    assert!(manager.is_open().await);
    assert_eq!(bot.accepted(), 1);
}

#[tokio::test]
async fn test_push_writes_credential_before_each_request() {
    let mut bot = MockBot::start(silent).await;
    let manager = ConnectionManager::new(test_credential(), 16);
    let stream = manager.connect(&bot.url).await.unwrap();

    stream.push(&Request::get_portfolio());
    stream.push(&Request::get_tickers());

    assert_eq!(bot.next_frame().await, expected_auth_frame());
    assert_eq!(bot.next_frame().await, json!({ "Event": "GetPortfolio", "data": null }));
    assert_eq!(bot.next_frame().await, expected_auth_frame());
    assert_eq!(bot.next_frame().await, json!({ "Event": "GetTickers", "data": null }));
}

#[tokio::test]
async fn test_inbound_frames_are_forwarded_raw() {
    let bot = MockBot::start(silent).await;
    let manager = ConnectionManager::new(test_credential(), 16);
    let stream = manager.connect(&bot.url).await.unwrap();
    let mut rx = stream.subscribe();

    bot.push("not json at all");
    bot.push(r#"{"Event":"GetTickers","Data":[]}"#);

    assert_eq!(
        next_event(&mut rx).await,
        TransportEvent::Message("not json at all".to_string())
    );
    assert_eq!(
        next_event(&mut rx).await,
        TransportEvent::Message(r#"{"Event":"GetTickers","Data":[]}"#.to_string())
    );
}

#[tokio::test]
async fn test_server_close_ends_stream_and_reconnect_opens_new_one() {
    let mut bot = MockBot::start(silent).await;
    let manager = ConnectionManager::new(test_credential(), 16);
    let stream = manager.connect(&bot.url).await.unwrap();
    let mut rx = stream.subscribe();

    bot.close_all();
    assert_eq!(next_event(&mut rx).await, TransportEvent::Closed);
    wait_closed(&manager).await;
    assert!(!stream.is_open());

    // Dropped silently while closed.
    stream.push(&Request::get_portfolio());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(bot.drain_frames().is_empty());

    let reopened = manager.connect(&bot.url).await.unwrap();
    assert_ne!(reopened.id(), stream.id());
    assert_eq!(bot.accepted(), 2);
}

#[tokio::test]
async fn test_requests_pushed_while_closed_are_not_queued() {
    let mut bot = MockBot::start(silent).await;
    let manager = ConnectionManager::new(test_credential(), 16);
    let stream = manager.connect(&bot.url).await.unwrap();

    stream.close();
    wait_closed(&manager).await;
    stream.push(&Request::get_portfolio());
    stream.push(&Request::get_config());

    let reopened = manager.connect(&bot.url).await.unwrap();
    reopened.push(&Request::get_tickers());

    assert_eq!(bot.next_frame().await, expected_auth_frame());
    assert_eq!(bot.next_frame().await, json!({ "Event": "GetTickers", "data": null }));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(bot.drain_frames().is_empty());
}

#[tokio::test]
async fn test_abrupt_disconnect_reports_error() {
    let bot = MockBot::start(silent).await;
    let manager = ConnectionManager::new(test_credential(), 16);
    let stream = manager.connect(&bot.url).await.unwrap();
    let mut rx = stream.subscribe();

    bot.drop_all();
    let event = next_event(&mut rx).await;
    assert!(matches!(event, TransportEvent::Error(_)), "got {event:?}");
    wait_closed(&manager).await;
}

#[tokio::test]
async fn test_client_close_is_reported_as_closed() {
    let bot = MockBot::start(silent).await;
    let manager = ConnectionManager::new(test_credential(), 16);
    let stream = manager.connect(&bot.url).await.unwrap();
    let mut rx = stream.subscribe();

    stream.close();
    assert_eq!(next_event(&mut rx).await, TransportEvent::Closed);
    wait_closed(&manager).await;
    assert!(manager.current().await.is_none());
}

#[tokio::test]
async fn test_connect_refused_is_websocket_error() {
    let manager = ConnectionManager::new(test_credential(), 16);
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = manager.connect(&format!("ws://127.0.0.1:{port}/ws")).await;
    assert!(matches!(result, Err(gct_ws_client::ClientError::WebSocket(_))));
    assert!(!manager.is_open().await);
}
