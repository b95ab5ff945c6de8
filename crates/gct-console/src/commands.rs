/*
[INPUT]:  Parsed subcommand, shared GctClient, settings cache, shutdown token
[OUTPUT]: Human-readable output of portfolio, settings, tickers, and live envelopes
[POS]:    Command layer - one function per subcommand plus text rendering
[UPDATE]: When adding subcommands or changing output layout
*/

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gct_ws_client::{
    CacheStore, Envelope, EventType, GctClient, PortfolioSummary, Request, Settings,
    SettingsCache, SubscriptionError,
};

/// Print the portfolio summary.
pub async fn portfolio(client: &GctClient) -> Result<()> {
    match client.portfolio().await.context("request portfolio")? {
        Some(summary) => print!("{}", render_portfolio(&summary)),
        None => warn!("bot did not answer GetPortfolio"),
    }
    Ok(())
}

/// Print exchanges and their pairs, from cache when fresh.
pub async fn settings<S: CacheStore>(
    client: &GctClient,
    cache: &SettingsCache<S>,
    refresh: bool,
    clear_cache: bool,
) -> Result<()> {
    if clear_cache {
        cache.clear().context("clear settings cache")?;
        info!("settings cache cleared");
    }

    match client
        .settings(cache, refresh)
        .await
        .context("load settings")?
    {
        Some(settings) => print!("{}", render_settings(&settings)),
        None => warn!("bot did not answer GetConfig"),
    }
    Ok(())
}

pub async fn tickers(client: &GctClient) -> Result<()> {
    match client.tickers().await.context("request tickers")? {
        Some(tickers) => {
            let pretty = serde_json::to_string_pretty(&tickers).context("format tickers")?;
            println!("{pretty}");
        }
        None => warn!("bot did not answer GetTickers"),
    }
    Ok(())
}

/// Stream envelopes until shutdown or connection close.
///
/// One `GetTickers` is sent first so the bot authenticates the session and
/// starts broadcasting to it.
pub async fn watch(
    client: &GctClient,
    filter: Option<EventType>,
    shutdown: CancellationToken,
) -> Result<()> {
    let multiplexer = client.connect().await.context("connect to bot")?;
    let mut subscription = multiplexer.subscribe();
    multiplexer.send(&Request::get_tickers());
    info!(connection = multiplexer.connection_id(), filter = ?filter, "watching envelopes");

    let mut printed: u64 = 0;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = subscription.recv() => match received {
                Ok(envelope) => {
                    if filter.as_ref().is_none_or(|event| envelope.is(event)) {
                        printed += 1;
                        println!("{}", render_envelope(&envelope));
                    }
                }
                Err(SubscriptionError::Lagged(skipped)) => {
                    warn!(skipped, "output fell behind, envelopes dropped");
                }
                Err(SubscriptionError::Closed) => {
                    info!("connection closed");
                    break;
                }
            },
        }
    }

    info!(printed, "watch finished");
    Ok(())
}

pub fn render_portfolio(summary: &PortfolioSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:>20} {:>8}", "COIN", "BALANCE", "SHARE");
    for total in &summary.coin_totals {
        let share = total
            .percentage
            .map(|value| format!("{}%", value.round_dp(2)))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{:<8} {:>20} {:>8}", total.coin, total.balance, share);
    }
    let _ = writeln!(
        out,
        "offline wallets: {}, online wallets: {}",
        summary.coins_offline.len(),
        summary.coins_online.len()
    );
    out
}

pub fn render_settings(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "bot: {}", settings.name);
    for exchange in &settings.exchanges {
        let state = if exchange.enabled { "enabled" } else { "disabled" };
        let _ = writeln!(out, "{} ({state})", exchange.name);
        for pair in &exchange.pairs {
            let mark = if pair.enabled { "x" } else { " " };
            let _ = writeln!(out, "  [{mark}] {}", pair.normalized_symbol);
        }
    }
    out
}

pub fn render_envelope(envelope: &Envelope) -> String {
    let mut line = envelope.event.clone();
    if let Some(exchange) = &envelope.exchange {
        let _ = write!(line, " {exchange}");
    }
    if let Some(asset_type) = &envelope.asset_type {
        let _ = write!(line, "/{asset_type}");
    }
    if let Some(error) = &envelope.error {
        let _ = write!(line, " error={error}");
    }
    if envelope.data != Value::Null {
        let _ = write!(line, " {}", envelope.data);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use gct_ws_client::{ExchangeConfig, PairEntry};
    use serde_json::json;

    #[test]
    fn test_render_portfolio() {
        let summary: PortfolioSummary = serde_json::from_value(json!({
            "coin_totals": [{ "coin": "BTC", "balance": 2.5, "percentage": 62.5 }, { "coin": "LTC", "balance": 10 }],
            "coins_offline": [{ "coin": "BTC", "balance": 2.5 }],
            "coins_online": null
        }))
        .unwrap();

        let rendered = render_portfolio(&summary);
        assert!(rendered.contains("BTC"));
        assert!(rendered.contains("62.5%"));
        assert!(rendered.lines().nth(2).unwrap().trim_end().ends_with('-'));
        assert!(rendered.contains("offline wallets: 1, online wallets: 0"));
    }

    #[test]
    fn test_render_settings_marks_enabled_pairs() {
        let settings = Settings {
            name: "Skynet".to_string(),
            exchanges: vec![ExchangeConfig {
                name: "Bitfinex".to_string(),
                enabled: true,
                pairs: vec![PairEntry::new("BTC_USD", false), PairEntry::new("ETH_USD", true)],
                ..ExchangeConfig::default()
            }],
            ..Settings::default()
        };

        assert_eq!(
            render_settings(&settings),
            "bot: Skynet\nBitfinex (enabled)\n  [ ] BTCUSD\n  [x] ETHUSD\n"
        );
    }

    #[test]
    fn test_render_envelope() {
        let mut envelope = Envelope::new("ticker_change", json!({ "Last": 1.5 }));
        envelope.exchange = Some("Bitfinex".to_string());
        envelope.asset_type = Some("SPOT".to_string());
        assert_eq!(render_envelope(&envelope), r#"ticker_change Bitfinex/SPOT {"Last":1.5}"#);

        let failed = Envelope {
            error: Some("denied".to_string()),
            ..Envelope::new("SaveConfig", Value::Null)
        };
        assert_eq!(render_envelope(&failed), "SaveConfig error=denied");
    }
}
