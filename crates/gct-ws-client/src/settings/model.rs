/*
[INPUT]:  `GetConfig` payloads from the bot, edits from consumers
[OUTPUT]: Settings aggregate with exchange/pair configuration in both forms
[POS]:    Settings layer - configuration model and incoming payload handling
[UPDATE]: When the bot's config schema gains or renames fields
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::cache::{CacheStore, SettingsCache};
use super::pairs::{self, EnabledMatch, PairEntry};
use crate::error::Result;

/// Top-level bot configuration as exchanged over the websocket.
///
/// Fields this client does not model are kept in `extra` so a snapshot can be
/// sent back with `SaveConfig` without losing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypt_config: Option<i32>,
    pub cryptocurrencies: String,
    pub currency_exchange_provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_pair_format: Option<PairFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_addresses: Option<PortfolioAddresses>,
    #[serde(rename = "SMSGlobal", skip_serializing_if = "Option::is_none")]
    pub sms_global: Option<SmsGlobal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webserver: Option<Webserver>,
    #[serde(deserialize_with = "null_as_empty")]
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExchangeConfig {
    pub name: String,
    pub enabled: bool,
    pub verbose: bool,
    pub websocket: bool,
    #[serde(rename = "RESTPollingDelay")]
    pub rest_polling_delay: i64,
    #[serde(rename = "AuthenticatedAPISupport")]
    pub authenticated_api_support: bool,
    #[serde(rename = "APIKey")]
    pub api_key: String,
    #[serde(rename = "APISecret")]
    pub api_secret: String,
    #[serde(rename = "ClientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub available_pairs: String,
    pub enabled_pairs: String,
    pub base_currencies: String,
    pub asset_types: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_currency_pair_format: Option<PairFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_currency_pair_format: Option<PairFormat>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<PairEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pair formatting rule; `Index`/`Separator` only appear on some variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PairFormat {
    pub uppercase: bool,
    pub delimiter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PortfolioAddresses {
    #[serde(deserialize_with = "null_as_empty")]
    pub addresses: Vec<WalletAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WalletAddress {
    pub address: String,
    pub coin_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SmsGlobal {
    pub enabled: bool,
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub contacts: Vec<SmsContact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SmsContact {
    pub name: String,
    pub number: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Webserver {
    pub enabled: bool,
    pub admin_username: String,
    pub admin_password: String,
    pub listen_address: String,
    pub websocket_connection_limit: u32,
    pub websocket_allow_insecure_origin: bool,
}

/// Result of `Settings::apply_incoming`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every exchange already carried structured pairs; taken as-is.
    WellFormed,
    /// Pairs were derived from the compact lists and the result cached.
    Derived,
}

impl ExchangeConfig {
    /// Rebuild `pairs` from `available_pairs`/`enabled_pairs`.
    pub fn derive_pairs(&mut self, mode: EnabledMatch) {
        self.pairs = pairs::to_structured(&self.available_pairs, &self.enabled_pairs, mode);
    }

    /// Fold the flags in `pairs` back into `enabled_pairs`.
    pub fn reconcile_enabled_pairs(&mut self) {
        self.enabled_pairs = pairs::to_wire(&self.enabled_pairs, &self.pairs);
    }

    pub fn has_structured_pairs(&self) -> bool {
        !self.pairs.is_empty()
    }

    pub fn enabled_symbols(&self) -> Vec<&str> {
        pairs::split_pairs(&self.enabled_pairs)
    }

    /// Flip one pair's flag by raw or normalized symbol. Returns false if unknown.
    pub fn set_pair_enabled(&mut self, symbol: &str, enabled: bool) -> bool {
        let normalized = pairs::normalize_symbol(symbol);
        match self
            .pairs
            .iter_mut()
            .find(|pair| pair.raw_symbol == symbol || pair.normalized_symbol == normalized)
        {
            Some(pair) => {
                pair.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

impl Settings {
    /// Parse a raw `GetConfig` payload.
    pub fn from_value(raw: Value) -> Result<Self> {
        Ok(serde_json::from_value(raw)?)
    }

    /// Take an incoming payload. If it is not already pre-expanded, derive the
    /// structured pairs and refresh the cache.
    pub fn apply_incoming<S: CacheStore>(
        &mut self,
        raw: Value,
        cache: &SettingsCache<S>,
    ) -> Result<ApplyOutcome> {
        *self = Settings::from_value(raw)?;

        if self.is_well_formed() {
            info!(exchanges = self.exchanges.len(), "settings arrived with structured pairs");
            return Ok(ApplyOutcome::WellFormed);
        }

        self.to_structured_pairs();
        if let Err(err) = cache.persist(self) {
            warn!(error = %err, "failed to cache derived settings");
        }
        debug!(exchanges = self.exchanges.len(), "structured pairs derived from wire lists");
        Ok(ApplyOutcome::Derived)
    }

    /// Non-empty exchange list where every exchange has structured pairs.
    pub fn is_well_formed(&self) -> bool {
        !self.exchanges.is_empty() && self.exchanges.iter().all(ExchangeConfig::has_structured_pairs)
    }

    /// Wire -> structured for every exchange; overwrites existing `pairs`.
    pub fn to_structured_pairs(&mut self) {
        self.to_structured_pairs_with(EnabledMatch::default());
    }

    pub fn to_structured_pairs_with(&mut self, mode: EnabledMatch) {
        for exchange in &mut self.exchanges {
            exchange.derive_pairs(mode);
        }
    }

    /// Structured -> wire for every exchange.
    pub fn to_wire_form(&mut self) {
        for exchange in &mut self.exchanges {
            exchange.reconcile_enabled_pairs();
        }
    }

    pub fn exchange(&self, name: &str) -> Option<&ExchangeConfig> {
        self.exchanges
            .iter()
            .find(|exchange| exchange.name.eq_ignore_ascii_case(name))
    }

    pub fn exchange_mut(&mut self, name: &str) -> Option<&mut ExchangeConfig> {
        self.exchanges
            .iter_mut()
            .find(|exchange| exchange.name.eq_ignore_ascii_case(name))
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
