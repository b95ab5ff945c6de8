/*
[INPUT]:  Outbound request intents from consumers
[OUTPUT]: Wire-shaped request structs with serialization support
[POS]:    Data layer - outbound request definitions
[UPDATE]: When the bot adds request events or payload fields change
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::EventType;
use crate::error::Result;
use crate::settings::Settings;

/// Outbound request frame: `{ "Event": <tag>, "data": <payload|null> }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "Event")]
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Request {
    pub fn new(event: EventType, data: Value) -> Self {
        Self {
            event: event.as_str().to_string(),
            data,
        }
    }

    /// Request without payload (`data: null`)
    pub fn bare(event: EventType) -> Self {
        Self::new(event, Value::Null)
    }

    pub fn get_portfolio() -> Self {
        Self::bare(EventType::GetPortfolio)
    }

    pub fn get_config() -> Self {
        Self::bare(EventType::GetConfig)
    }

    pub fn get_account_info() -> Self {
        Self::bare(EventType::GetAccountInfo)
    }

    pub fn get_tickers() -> Self {
        Self::bare(EventType::GetTickers)
    }

    pub fn get_orderbooks() -> Self {
        Self::bare(EventType::GetOrderbooks)
    }

    pub fn get_exchange_rates() -> Self {
        Self::bare(EventType::GetExchangeRates)
    }

    pub fn get_ticker(query: &MarketQuery) -> Result<Self> {
        Ok(Self::new(EventType::GetTicker, serde_json::to_value(query)?))
    }

    pub fn get_orderbook(query: &MarketQuery) -> Result<Self> {
        Ok(Self::new(EventType::GetOrderbook, serde_json::to_value(query)?))
    }

    /// Send a settings snapshot back to the bot. Pairs should be reconciled
    /// with `Settings::to_wire_form` first.
    pub fn save_config(settings: &Settings) -> Result<Self> {
        Ok(Self::new(EventType::SaveConfig, serde_json::to_value(settings)?))
    }

    pub fn event_type(&self) -> EventType {
        EventType::from(self.event.as_str())
    }
}

/// Payload for single ticker/orderbook lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuery {
    #[serde(rename = "exchangeName")]
    pub exchange_name: String,
    pub currency: String,
    #[serde(rename = "assetType")]
    pub asset_type: String,
}

impl MarketQuery {
    pub fn new(
        exchange_name: impl Into<String>,
        currency: impl Into<String>,
        asset_type: impl Into<String>,
    ) -> Self {
        Self {
            exchange_name: exchange_name.into(),
            currency: currency.into(),
            asset_type: asset_type.into(),
        }
    }
}
