/*
[INPUT]:  EventStream from the connection manager, outbound requests from consumers
[OUTPUT]: Multicast stream of canonical Envelopes, single outbound intake
[POS]:    WebSocket layer - fan-out between one connection and many consumers
[UPDATE]: When changing backpressure policy, filtering, or parse handling
*/

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::connection::{EventStream, TransportEvent};
use super::message::Envelope;
use crate::types::{EventType, Request};

/// Default ring size shared by all subscribers of one multiplexer.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

const PARSE_FAIL_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Anything that accepts outbound requests.
pub trait RequestSink {
    fn send(&self, request: &Request);
}

impl RequestSink for EventStream {
    fn send(&self, request: &Request) {
        self.push(request);
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscriber fell behind; the oldest `n` envelopes were overwritten.
    #[error("subscriber lagged, {0} envelopes skipped")]
    Lagged(u64),
    /// The underlying connection terminated.
    #[error("envelope stream closed")]
    Closed,
}

/// One consumer's view of the multicast stream.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Envelope>,
}

impl Subscription {
    pub fn from_receiver(rx: broadcast::Receiver<Envelope>) -> Self {
        Self { rx }
    }

    /// Next envelope in publication order.
    ///
    /// After `Lagged` the subscription resumes at the oldest envelope still buffered.
    pub async fn recv(&mut self) -> Result<Envelope, SubscriptionError> {
        self.rx.recv().await.map_err(|err| match err {
            broadcast::error::RecvError::Lagged(skipped) => SubscriptionError::Lagged(skipped),
            broadcast::error::RecvError::Closed => SubscriptionError::Closed,
        })
    }

    /// Next envelope tagged `event`; others are skipped, lag is logged and tolerated.
    pub async fn next_event(&mut self, event: &EventType) -> Result<Envelope, SubscriptionError> {
        loop {
            match self.recv().await {
                Ok(envelope) if envelope.is(event) => return Ok(envelope),
                Ok(_) => {}
                Err(SubscriptionError::Lagged(skipped)) => {
                    warn!(skipped, event = %event, "subscription lagged while filtering");
                }
                Err(SubscriptionError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }
}

/// Canonicalizes inbound frames and shares them with any number of subscribers.
///
/// Backpressure is drop-oldest: each multiplexer keeps a ring of `capacity`
/// envelopes; a subscriber that falls further behind gets `Lagged(n)` and
/// continues from the oldest retained envelope. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MessageMultiplexer {
    stream: EventStream,
    shared: Arc<RwLock<Option<broadcast::Sender<Envelope>>>>,
}

impl MessageMultiplexer {
    /// Attach to a connection and start canonicalizing its frames.
    ///
    /// The first multiplexer on a connection replays everything the transport
    /// emitted since it opened. Later ones start from now; if the connection
    /// is already gone they start closed.
    pub fn new(stream: EventStream, capacity: usize) -> Self {
        let connection = stream.id();
        let mut raw_rx = match stream.take_receiver() {
            Some(rx) => rx,
            None => {
                let rx = stream.subscribe();
                if !stream.is_open() {
                    debug!(connection, "attached to a terminated connection");
                    return Self {
                        stream,
                        shared: Arc::new(RwLock::new(None)),
                    };
                }
                rx
            }
        };

        let (envelope_tx, _) = broadcast::channel(capacity.max(1));
        let shared = Arc::new(RwLock::new(Some(envelope_tx.clone())));
        let shared_for_task = shared.clone();

        tokio::spawn(async move {
            let mut published: u64 = 0;
            loop {
                match raw_rx.recv().await {
                    Ok(TransportEvent::Message(raw)) => {
                        if let Some(envelope) = canonicalize(&raw) {
                            published += 1;
                            let _ = envelope_tx.send(envelope);
                        }
                    }
                    Ok(TransportEvent::Error(error)) => {
                        warn!(connection, error = %error, published, "envelope stream terminated by transport error");
                        break;
                    }
                    Ok(TransportEvent::Closed) => {
                        info!(connection, published, "envelope stream completed");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(connection, skipped, "multiplexer lagged behind transport");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Dropping every sender closes all subscriptions once they drain.
            drop(envelope_tx);
            shared_for_task
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        });

        Self { stream, shared }
    }

    /// Subscribe to envelopes published from now on.
    ///
    /// Subscribing after the connection terminated yields an already closed subscription.
    pub fn subscribe(&self) -> Subscription {
        let guard = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        let rx = match guard.as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        };
        Subscription::from_receiver(rx)
    }

    /// Forward a request to the connection untouched.
    pub fn send(&self, request: &Request) {
        debug!(connection = self.stream.id(), event = %request.event, "request queued");
        self.stream.push(request);
    }

    /// Connectivity as last reported by the transport; not a delivery guarantee.
    pub fn is_connected(&self) -> bool {
        self.stream.is_open()
    }

    pub fn connection_id(&self) -> u64 {
        self.stream.id()
    }

    pub fn stream(&self) -> &EventStream {
        &self.stream
    }
}

impl RequestSink for MessageMultiplexer {
    fn send(&self, request: &Request) {
        MessageMultiplexer::send(self, request);
    }
}

fn canonicalize(raw: &str) -> Option<Envelope> {
    match Envelope::parse(raw) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            log_parse_fail_once(&err, raw);
            None
        }
    }
}

fn log_parse_fail_once(err: &crate::ClientError, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        warn!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "inbound frame skipped"
        );
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            message = %truncate_for_log(raw, RAW_LOG_MAX_BYTES),
            "inbound frame skipped"
        );
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}
