/*
[INPUT]:  Client configuration (endpoint, fan-out capacity, resend policy) and credential
[OUTPUT]: Connected multiplexer plus typed request helpers (portfolio, settings, tickers)
[POS]:    Client layer - explicit shared handle threaded through consumers
[UPDATE]: When adding request helpers or changing connection options
*/

use std::sync::PoisonError;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::auth::Credential;
use crate::error::{ClientError, Result};
use crate::poller::{PollOutcome, ResendPolicy, ResendPoller};
use crate::settings::{CacheStore, Settings, SettingsCache};
use crate::types::{EventType, PortfolioSummary, Request};
use crate::ws::{ConnectionManager, DEFAULT_BROADCAST_CAPACITY, Envelope, MessageMultiplexer};

/// Default bot websocket endpoint
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:9050/ws";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub broadcast_capacity: usize,
    pub resend: ResendPolicy,
}

impl ClientConfig {
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let parsed = Url::parse(endpoint)?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ClientError::Config(format!(
                    "unsupported endpoint scheme '{other}', expected ws or wss"
                )));
            }
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            ..Self::default()
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            resend: ResendPolicy::default(),
        }
    }
}

/// Process-wide client handle. Create once, share by reference.
#[derive(Debug)]
pub struct GctClient {
    config: ClientConfig,
    connections: ConnectionManager,
    multiplexer: Mutex<Option<MessageMultiplexer>>,
    /// Cancels the polls started since the last `shutdown`.
    generation: std::sync::Mutex<CancellationToken>,
}

impl GctClient {
    pub fn new(config: ClientConfig, credential: Credential) -> Self {
        let connections = ConnectionManager::new(credential, config.broadcast_capacity);
        Self {
            config,
            connections,
            multiplexer: Mutex::new(None),
            generation: std::sync::Mutex::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Multiplexer for the live connection; connects on first use.
    pub async fn connect(&self) -> Result<MessageMultiplexer> {
        let stream = self.connections.connect(&self.config.endpoint).await?;

        let mut guard = self.multiplexer.lock().await;
        if let Some(existing) = guard.as_ref()
            && existing.connection_id() == stream.id()
        {
            return Ok(existing.clone());
        }

        let multiplexer = MessageMultiplexer::new(stream, self.config.broadcast_capacity);
        debug!(connection = multiplexer.connection_id(), "multiplexer attached");
        *guard = Some(multiplexer.clone());
        Ok(multiplexer)
    }

    /// Poller cancelled by the next `shutdown`.
    pub fn poller(&self) -> ResendPoller {
        let generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        ResendPoller::with_cancel(self.config.resend, generation.child_token())
    }

    /// Send `request` and wait for `expected`, resending per the configured policy.
    pub async fn request(&self, request: &Request, expected: &EventType) -> Result<PollOutcome> {
        let multiplexer = self.connect().await?;
        let subscription = multiplexer.subscribe();
        Ok(self
            .poller()
            .poll(&multiplexer, subscription, request, expected)
            .await)
    }

    /// Portfolio summary, or `None` if the bot never answered.
    pub async fn portfolio(&self) -> Result<Option<PortfolioSummary>> {
        let outcome = self
            .request(&Request::get_portfolio(), &EventType::GetPortfolio)
            .await?;
        outcome.envelope().map(|envelope| envelope.decode()).transpose()
    }

    /// Raw `GetTickers` payload, or `None` if the bot never answered.
    pub async fn tickers(&self) -> Result<Option<Value>> {
        let outcome = self
            .request(&Request::get_tickers(), &EventType::GetTickers)
            .await?;
        outcome.envelope().map(|envelope| envelope.decode()).transpose()
    }

    /// Settings from a fresh cache, else fetched with `GetConfig`.
    pub async fn settings<S: CacheStore>(
        &self,
        cache: &SettingsCache<S>,
        refresh: bool,
    ) -> Result<Option<Settings>> {
        if !refresh && let Some(settings) = cache.load() {
            debug!("settings served from cache");
            return Ok(Some(settings));
        }

        let outcome = self
            .request(&Request::get_config(), &EventType::GetConfig)
            .await?;
        let Some(envelope) = outcome.envelope() else {
            return Ok(None);
        };
        if let Some(message) = envelope.error {
            return Err(ClientError::Server {
                event: envelope.event,
                message,
            });
        }

        let mut settings = Settings::default();
        let applied = settings.apply_incoming(envelope.data, cache)?;
        info!(outcome = ?applied, exchanges = settings.exchanges.len(), "settings loaded");
        Ok(Some(settings))
    }

    /// Fold pair edits into the wire lists and send the snapshot back.
    ///
    /// An unanswered save is `ClientError::Timeout`; `None` means the client
    /// was shut down while waiting. The cache is refreshed only on success.
    pub async fn save_settings<S: CacheStore>(
        &self,
        settings: &mut Settings,
        cache: &SettingsCache<S>,
    ) -> Result<Option<Envelope>> {
        settings.to_wire_form();
        let request = Request::save_config(settings)?;
        let outcome = self.request(&request, &EventType::SaveConfig).await?;

        let Some(envelope) = outcome.into_result(&EventType::SaveConfig)? else {
            return Ok(None);
        };
        if let Some(message) = &envelope.error {
            return Err(ClientError::Server {
                event: envelope.event.clone(),
                message: message.clone(),
            });
        }
        cache.persist(settings)?;
        Ok(Some(envelope))
    }

    pub async fn is_connected(&self) -> bool {
        self.connections.is_open().await
    }

    /// Cancel in-flight polls and close the socket.
    ///
    /// The client stays usable: the next request opens a new connection once
    /// the old one has finished closing.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(
            &mut *self.generation.lock().unwrap_or_else(PoisonError::into_inner),
            CancellationToken::new(),
        );
        previous.cancel();
        if let Some(stream) = self.connections.current().await {
            stream.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.broadcast_capacity, DEFAULT_BROADCAST_CAPACITY);
        assert_eq!(config.resend.max_resends, 10);
    }

    #[test]
    fn test_with_endpoint_rejects_http() {
        assert!(ClientConfig::with_endpoint("wss://bot.example:9050/ws").is_ok());
        assert!(matches!(
            ClientConfig::with_endpoint("http://localhost:9050/ws"),
            Err(ClientError::Config(_))
        ));
    }
}
