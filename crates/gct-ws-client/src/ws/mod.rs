/*
[INPUT]:  Websocket endpoint, credential, consumer subscriptions
[OUTPUT]: Canonical envelopes fanned out to consumers, requests forwarded to the bot
[POS]:    WebSocket layer - connection ownership and message multiplexing
[UPDATE]: When adding transport features or changing fan-out behavior
*/

pub mod connection;
pub mod message;
pub mod multiplexer;

pub use connection::{ConnectionManager, EventStream, TransportEvent};
pub use message::Envelope;
pub use multiplexer::{
    DEFAULT_BROADCAST_CAPACITY, MessageMultiplexer, RequestSink, Subscription, SubscriptionError,
};
