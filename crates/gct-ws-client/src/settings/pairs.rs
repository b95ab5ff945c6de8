/*
[INPUT]:  Comma-joined pair lists (AvailablePairs / EnabledPairs) and structured PairEntry lists
[OUTPUT]: Conversions between the compact wire form and the structured form
[POS]:    Settings layer - pair representation conversions
[UPDATE]: When changing symbol normalization or enabled-set reconciliation
*/

use serde::{Deserialize, Serialize};

const PAIR_SEPARATOR: char = ',';
const SYMBOL_SEPARATORS: [char; 3] = ['_', '-', ' '];

/// One currency pair with an explicit enabled flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEntry {
    #[serde(rename = "Name")]
    pub raw_symbol: String,
    #[serde(rename = "ParsedName")]
    pub normalized_symbol: String,
    #[serde(rename = "Enabled")]
    pub enabled: bool,
}

impl PairEntry {
    pub fn new(raw_symbol: impl Into<String>, enabled: bool) -> Self {
        let raw_symbol = raw_symbol.into();
        Self {
            normalized_symbol: normalize_symbol(&raw_symbol),
            raw_symbol,
            enabled,
        }
    }
}

/// How a candidate is matched against the enabled list when deriving pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnabledMatch {
    /// A symbol anywhere in the enabled list counts as enabled.
    #[default]
    AnyPosition,
    /// Legacy web client behavior: a match at index 0 of the raw enabled list
    /// is ignored. Kept for parity with settings produced by that client.
    SkipFirst,
}

/// Strip `_`, `-` and spaces, then upper-case: `btc_usd` -> `BTCUSD`.
pub fn normalize_symbol(raw: &str) -> String {
    raw.chars()
        .filter(|c| !SYMBOL_SEPARATORS.contains(c))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Split a comma-joined list, dropping empty tokens.
pub fn split_pairs(raw: &str) -> Vec<&str> {
    raw.split(PAIR_SEPARATOR)
        .filter(|token| !token.is_empty())
        .collect()
}

pub fn join_pairs<S: AsRef<str>>(symbols: &[S]) -> String {
    symbols
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

/// Wire -> structured. One entry per available symbol, in order.
pub fn to_structured(available_raw: &str, enabled_raw: &str, mode: EnabledMatch) -> Vec<PairEntry> {
    let enabled = split_pairs(enabled_raw);
    let legacy_tokens: Vec<&str> = enabled_raw.split(PAIR_SEPARATOR).collect();

    split_pairs(available_raw)
        .into_iter()
        .map(|symbol| {
            let is_enabled = match mode {
                EnabledMatch::AnyPosition => enabled.contains(&symbol),
                EnabledMatch::SkipFirst => legacy_tokens
                    .iter()
                    .position(|token| *token == symbol)
                    .is_some_and(|index| index > 0),
            };
            PairEntry::new(symbol, is_enabled)
        })
        .collect()
}

/// Structured -> wire, incrementally: enabled entries missing from the list are
/// appended, disabled entries present are removed, and symbols not covered by
/// `pairs` are left in place.
pub fn to_wire(enabled_raw: &str, pairs: &[PairEntry]) -> String {
    let mut enabled: Vec<String> = split_pairs(enabled_raw)
        .into_iter()
        .map(str::to_string)
        .collect();

    for pair in pairs {
        let position = enabled.iter().position(|symbol| *symbol == pair.raw_symbol);
        match (pair.enabled, position) {
            (true, None) => enabled.push(pair.raw_symbol.clone()),
            (false, Some(index)) => {
                enabled.remove(index);
            }
            _ => {}
        }
    }

    join_pairs(&enabled)
}
