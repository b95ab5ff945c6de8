/*
[INPUT]:  Test scenarios needing a websocket peer
[OUTPUT]: In-process mock bot server, frame capture, canned responders
[POS]:    Test infrastructure - shared across all integration test modules
[UPDATE]: When adding new server behaviors or fixtures
*/

//! Common test utilities for gct-ws-client tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use gct_ws_client::Credential;

const FRAME_WAIT: Duration = Duration::from_secs(5);

/// Produces reply frames for one inbound request frame
pub type Responder = fn(&Value) -> Vec<Value>;

#[derive(Debug, Clone)]
enum ServerCommand {
    Send(String),
    Close,
    Drop,
}

/// Minimal stand-in for the bot's websocket endpoint.
pub struct MockBot {
    pub url: String,
    accepted: Arc<AtomicUsize>,
    received: mpsc::UnboundedReceiver<String>,
    commands: broadcast::Sender<ServerCommand>,
}

impl MockBot {
    pub async fn start(responder: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let (received_tx, received) = mpsc::unbounded_channel();
        let (commands, _) = broadcast::channel(64);

        let accepted_counter = accepted.clone();
        let commands_tx = commands.clone();
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                accepted_counter.fetch_add(1, Ordering::SeqCst);
                // Subscribe before the handshake completes so no command is missed.
                let mut commands_rx = commands_tx.subscribe();
                let received_tx = received_tx.clone();

                tokio::spawn(async move {
                    let Ok(socket) = accept_async(tcp).await else {
                        return;
                    };
                    let (mut write, mut read) = socket.split();

                    loop {
                        tokio::select! {
                            frame = read.next() => match frame {
                                Some(Ok(Message::Text(text))) => {
                                    let text = text.to_string();
                                    let _ = received_tx.send(text.clone());
                                    let request: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                                    for reply in responder(&request) {
                                        if write.send(Message::Text(reply.to_string().into())).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                                Some(Ok(_)) => {}
                            },
                            command = commands_rx.recv() => match command {
                                Ok(ServerCommand::Send(text)) => {
                                    if write.send(Message::Text(text.into())).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(ServerCommand::Close) => {
                                    let _ = write.send(Message::Close(None)).await;
                                    return;
                                }
                                Ok(ServerCommand::Drop) | Err(_) => return,
                            },
                        }
                    }
                });
            }
        });

        Self {
            url,
            accepted,
            received,
            commands,
        }
    }

    /// Number of TCP connections accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Next text frame the bot received, parsed as JSON
    pub async fn next_frame(&mut self) -> Value {
        let text = tokio::time::timeout(FRAME_WAIT, self.received.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("mock bot stopped");
        serde_json::from_str(&text).expect("client sent non-JSON frame")
    }

    /// Frames received and not yet consumed by `next_frame`
    pub fn drain_frames(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.received.try_recv() {
            frames.push(serde_json::from_str(&text).expect("client sent non-JSON frame"));
        }
        frames
    }

    /// Push a raw text frame to every open connection
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.commands.send(ServerCommand::Send(frame.into()));
    }

    /// Close every connection with a close handshake
    pub fn close_all(&self) {
        let _ = self.commands.send(ServerCommand::Close);
    }

    /// Drop every connection without a close handshake
    pub fn drop_all(&self) {
        let _ = self.commands.send(ServerCommand::Drop);
    }
}

pub fn test_credential() -> Credential {
    Credential::from_password("admin", "Password")
}

pub fn expected_auth_frame() -> Value {
    json!({
        "Event": "auth",
        "data": {
            "username": "admin",
            "password": "e7cf3ef4f17c3999a94f2c6f612e8a888e5b1026878e4e19398b23bd38ec221a"
        }
    })
}

/// Never answers
pub fn silent(_request: &Value) -> Vec<Value> {
    Vec::new()
}

/// Answers the requests the client helpers use, the way the bot shapes replies
pub fn bot_like(request: &Value) -> Vec<Value> {
    let event = request.get("Event").and_then(Value::as_str).unwrap_or_default();
    match event.to_ascii_lowercase().as_str() {
        "getportfolio" => vec![json!({
            "event": "GetPortfolio",
            "data": {
                "coin_totals": [{ "coin": "BTC", "balance": 2.5, "percentage": 100.0 }],
                "coins_offline": [{ "coin": "BTC", "balance": 2.5, "address": "1JCe8z4jJVNXSjohjM4i9Hh813dLCNx2Sy" }],
                "coins_online": null,
                "offline_summary": { "BTC": [{ "address": "1JCe8z4jJVNXSjohjM4i9Hh813dLCNx2Sy", "balance": 2.5, "percentage": 100.0 }] },
                "online_summary": null
            },
            "error": ""
        })],
        "getconfig" => vec![json!({
            "event": "GetConfig",
            "data": sample_config(),
            "error": ""
        })],
        "saveconfig" => vec![json!({ "event": "SaveConfig", "data": "OK", "error": "" })],
        "gettickers" => vec![json!({
            "Event": "GetTickers",
            "Data": [{ "Exchange": "Bitfinex", "Pair": "BTCUSD", "Last": 6543.21 }]
        })],
        _ => Vec::new(),
    }
}

/// Rejects every SaveConfig
pub fn rejects_save(request: &Value) -> Vec<Value> {
    let event = request.get("Event").and_then(Value::as_str).unwrap_or_default();
    if event.eq_ignore_ascii_case("SaveConfig") {
        return vec![json!({ "event": "SaveConfig", "data": null, "error": "config file not writable" })];
    }
    bot_like(request)
}

pub fn sample_config() -> Value {
    json!({
        "Name": "Skynet",
        "Cryptocurrencies": "BTC,LTC,ETH",
        "CurrencyExchangeProvider": "fixer",
        "Webserver": {
            "Enabled": true,
            "AdminUsername": "admin",
            "AdminPassword": "Password",
            "ListenAddress": ":9050",
            "WebsocketConnectionLimit": 1,
            "WebsocketAllowInsecureOrigin": true
        },
        "Exchanges": [
            {
                "Name": "Bitfinex",
                "Enabled": true,
                "AvailablePairs": "BTC_USD,ETH_USD,LTC_USD",
                "EnabledPairs": "ETH_USD",
                "BaseCurrencies": "USD",
                "AssetTypes": "SPOT"
            }
        ]
    })
}
