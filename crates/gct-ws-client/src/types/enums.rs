/*
[INPUT]:  Event tag strings used on the bot websocket
[OUTPUT]: Typed EventType enum with string conversion
[POS]:    Data layer - event tag definitions
[UPDATE]: When the bot registers new websocket handlers
*/

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Logical message kind carried in an envelope's tag.
///
/// The bot lower-cases tags before dispatch, so parsing is case-insensitive.
/// Unknown tags are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Auth,
    GetConfig,
    SaveConfig,
    GetAccountInfo,
    GetTickers,
    GetTicker,
    GetOrderbooks,
    GetOrderbook,
    GetExchangeRates,
    GetPortfolio,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Auth => "auth",
            EventType::GetConfig => "GetConfig",
            EventType::SaveConfig => "SaveConfig",
            EventType::GetAccountInfo => "GetAccountInfo",
            EventType::GetTickers => "GetTickers",
            EventType::GetTicker => "GetTicker",
            EventType::GetOrderbooks => "GetOrderbooks",
            EventType::GetOrderbook => "GetOrderbook",
            EventType::GetExchangeRates => "GetExchangeRates",
            EventType::GetPortfolio => "GetPortfolio",
            EventType::Other(tag) => tag,
        }
    }

    /// Compare against a raw tag the way the bot does (ASCII case-insensitive).
    pub fn matches(&self, tag: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(tag)
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "auth" => EventType::Auth,
            "getconfig" => EventType::GetConfig,
            "saveconfig" => EventType::SaveConfig,
            "getaccountinfo" => EventType::GetAccountInfo,
            "gettickers" => EventType::GetTickers,
            "getticker" => EventType::GetTicker,
            "getorderbooks" => EventType::GetOrderbooks,
            "getorderbook" => EventType::GetOrderbook,
            "getexchangerates" => EventType::GetExchangeRates,
            "getportfolio" => EventType::GetPortfolio,
            _ => EventType::Other(tag.to_string()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(EventType::from(tag.as_str()))
    }
}
