/*
[INPUT]:  Response payloads carried in envelope data
[OUTPUT]: Typed portfolio and auth reply models
[POS]:    Data layer - inbound payload definitions
[UPDATE]: When the bot changes response payload shapes
*/

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Literal the bot sends as `data` on successful auth/save replies
pub const RESPONSE_SUCCESS: &str = "OK";

/// Per-coin balance line in a portfolio summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinTotal {
    pub coin: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
}

/// `GetPortfolio` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub coin_totals: Vec<CoinTotal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub coins_offline: Vec<CoinTotal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub coins_online: Vec<CoinTotal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub offline_summary: HashMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub online_summary: HashMap<String, Value>,
}

impl PortfolioSummary {
    /// Total balance for one coin, if present
    pub fn total_for(&self, coin: &str) -> Option<Decimal> {
        self.coin_totals
            .iter()
            .find(|total| total.coin.eq_ignore_ascii_case(coin))
            .map(|total| total.balance)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
