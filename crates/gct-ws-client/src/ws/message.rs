/*
[INPUT]:  Raw inbound websocket text frames
[OUTPUT]: Canonical Envelope values with normalized field casing
[POS]:    WebSocket layer - message parsing and validation
[UPDATE]: When the bot changes its response shape or key casing
*/

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::types::EventType;

/// Canonical inbound unit, independent of the casing the bot used on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, rename = "assetType", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Wire shape: the bot emits `Event`/`Data` on broadcasts and `event`/`data` on
/// replies. Both spellings are captured separately and folded afterwards.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "Event")]
    event_upper: Option<String>,
    #[serde(rename = "event")]
    event_lower: Option<String>,
    #[serde(rename = "Data")]
    data_upper: Option<Value>,
    #[serde(rename = "data")]
    data_lower: Option<Value>,
    exchange: Option<String>,
    #[serde(rename = "assetType")]
    asset_type: Option<String>,
    error: Option<String>,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
            exchange: None,
            asset_type: None,
            error: None,
        }
    }

    /// Parse a raw text frame. The capitalized key wins if a frame carries both.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw: RawEnvelope = serde_json::from_str(raw)?;

        let event = raw
            .event_upper
            .or(raw.event_lower)
            .filter(|event| !event.is_empty())
            .ok_or_else(|| ClientError::InvalidMessage("missing event tag".to_string()))?;

        // `"data": null` deserializes to None, which is the same as absent.
        let data = raw.data_upper.or(raw.data_lower).unwrap_or(Value::Null);

        Ok(Self {
            event,
            data,
            exchange: raw.exchange.filter(|value| !value.is_empty()),
            asset_type: raw.asset_type.filter(|value| !value.is_empty()),
            error: raw.error.filter(|value| !value.is_empty()),
        })
    }

    pub fn event_type(&self) -> EventType {
        EventType::from(self.event.as_str())
    }

    pub fn is(&self, event: &EventType) -> bool {
        event.matches(&self.event)
    }

    /// Decode the payload into a typed model. A server-reported error takes precedence.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        if let Some(message) = &self.error {
            return Err(ClientError::Server {
                event: self.event.clone(),
                message: message.clone(),
            });
        }
        Ok(serde_json::from_value(self.data.clone())?)
    }
}
