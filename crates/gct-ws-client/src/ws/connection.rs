/*
[INPUT]:  Websocket endpoint URL and static credential
[OUTPUT]: Shared EventStream handle (raw inbound events + outbound intake)
[POS]:    WebSocket layer - single transport connection ownership
[UPDATE]: When changing connection lifecycle or outbound framing
*/

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::Credential;
use crate::error::Result;
use crate::types::Request;

static CONNECTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Raw event observed on the transport, forwarded unparsed.
///
/// `Error` and `Closed` are terminal: nothing follows them on the same stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Error(String),
    Closed,
}

impl TransportEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::Message(_))
    }
}

#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Handle to one live connection: subscribe for inbound events, push requests out.
///
/// Clones share the same socket.
#[derive(Debug, Clone)]
pub struct EventStream {
    id: u64,
    inbound: broadcast::Sender<TransportEvent>,
    primary: Arc<std::sync::Mutex<Option<broadcast::Receiver<TransportEvent>>>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
}

impl EventStream {
    /// Connection identity; equal ids mean the same underlying socket.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Receive raw events published after this call. No replay.
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.inbound.subscribe()
    }

    /// Receiver subscribed before the I/O task started, so it holds every
    /// event of this connection including the terminal one. Only the first
    /// caller across all clones gets it.
    pub fn take_receiver(&self) -> Option<broadcast::Receiver<TransportEvent>> {
        self.primary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Queue a request. The credential frame is written right before it.
    ///
    /// Dropped without error if the connection is not open.
    pub fn push(&self, request: &Request) {
        if !self.is_open() {
            trace!(connection = self.id, event = %request.event, "connection not open, request dropped");
            return;
        }

        let frame = match serde_json::to_string(request) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(connection = self.id, error = %err, "request serialization failed, dropped");
                return;
            }
        };

        if self.outbound.send(Outbound::Frame(frame)).is_err() {
            trace!(connection = self.id, event = %request.event, "connection task gone, request dropped");
        }
    }

    /// Ask the connection task to close the socket gracefully.
    pub fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Owns zero or one live connection and creates it lazily on first use.
#[derive(Debug)]
pub struct ConnectionManager {
    credential: Credential,
    capacity: usize,
    active: Mutex<Option<EventStream>>,
}

impl ConnectionManager {
    pub fn new(credential: Credential, capacity: usize) -> Self {
        Self {
            credential,
            capacity: capacity.max(1),
            active: Mutex::new(None),
        }
    }

    /// Return the live stream, opening the socket only if none is open.
    pub async fn connect(&self, endpoint: &str) -> Result<EventStream> {
        let mut guard = self.active.lock().await;
        if let Some(existing) = guard.as_ref()
            && existing.is_open()
        {
            debug!(connection = existing.id, endpoint, "reusing open connection");
            return Ok(existing.clone());
        }

        let url = Url::parse(endpoint)?;
        let auth_frame = self.credential.auth_frame()?;
        let (socket, _response) = connect_async(url.as_str()).await?;

        let stream = spawn_transport(socket, auth_frame, self.capacity);
        info!(connection = stream.id, endpoint = %url, "websocket connected");

        *guard = Some(stream.clone());
        Ok(stream)
    }

    /// Current stream if one is open
    pub async fn current(&self) -> Option<EventStream> {
        let guard = self.active.lock().await;
        guard.as_ref().filter(|stream| stream.is_open()).cloned()
    }

    pub async fn is_open(&self) -> bool {
        self.current().await.is_some()
    }
}

/// Drive an already-established socket. Generic over the frame sink/stream
/// pair so in-memory sockets can be driven the same way.
pub(crate) fn spawn_transport<S>(socket: S, auth_frame: String, capacity: usize) -> EventStream
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>>
        + Sink<WsMessage, Error = WsError>
        + Send
        + Unpin
        + 'static,
{
    // Subscribed before the task is spawned: nothing it emits can be missed.
    let (inbound_tx, primary_rx) = broadcast::channel(capacity);
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let open = Arc::new(AtomicBool::new(true));

    let stream = EventStream {
        id: CONNECTION_SEQ.fetch_add(1, Ordering::Relaxed),
        inbound: inbound_tx.clone(),
        primary: Arc::new(std::sync::Mutex::new(Some(primary_rx))),
        outbound: outbound_tx,
        open: open.clone(),
    };
    let id = stream.id;

    let (mut write, mut read) = socket.split();

    tokio::spawn(async move {
        let mut sent: u64 = 0;
        let mut received: u64 = 0;

        let terminal = loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(Outbound::Frame(frame)) => {
                            if let Err(err) = write.send(WsMessage::Text(auth_frame.clone().into())).await {
                                break TransportEvent::Error(err.to_string());
                            }
                            if let Err(err) = write.send(WsMessage::Text(frame.into())).await {
                                break TransportEvent::Error(err.to_string());
                            }
                            sent += 1;
                            trace!(connection = id, sent, "request written");
                        }
                        Some(Outbound::Close) | None => {
                            let _ = write.send(WsMessage::Close(None)).await;
                            break TransportEvent::Closed;
                        }
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            received += 1;
                            let _ = inbound_tx.send(TransportEvent::Message(text.to_string()));
                        }
                        Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => {
                                received += 1;
                                let _ = inbound_tx.send(TransportEvent::Message(text));
                            }
                            Err(_) => debug!(connection = id, bytes = bytes.len(), "non-utf8 binary frame ignored"),
                        },
                        Some(Ok(WsMessage::Close(_))) | None => {
                            break TransportEvent::Closed;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            break TransportEvent::Error(err.to_string());
                        }
                    }
                }
            }
        };

        open.store(false, Ordering::Release);
        match &terminal {
            TransportEvent::Error(error) => {
                warn!(connection = id, error = %error, sent, received, "websocket failed")
            }
            _ => info!(connection = id, sent, received, "websocket closed"),
        }
        let _ = inbound_tx.send(terminal);
    });

    stream
}
