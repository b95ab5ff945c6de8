/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public websocket client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod client;
pub mod error;
pub mod poller;
pub mod settings;
pub mod types;
pub mod ws;

pub use auth::Credential;

pub use client::{ClientConfig, DEFAULT_ENDPOINT, GctClient};

pub use error::{ClientError, Result};

pub use poller::{PollOutcome, ResendPolicy, ResendPoller};

pub use settings::{
    ApplyOutcome, CacheStore, EnabledMatch, ExchangeConfig, FileStore, MemoryStore, PairEntry,
    Settings, SettingsCache,
};

// Re-export all types
pub use types::*;

pub use ws::{
    ConnectionManager, Envelope, EventStream, MessageMultiplexer, RequestSink, Subscription,
    SubscriptionError, TransportEvent,
};
