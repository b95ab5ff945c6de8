/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Bot portfolio, settings, tickers, or a live envelope feed on stdout
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or shutdown handling
*/

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gct_console::{ConsoleConfig, commands};
use gct_ws_client::{EventType, GctClient, SettingsCache};

#[derive(Parser, Debug)]
#[command(name = "gct-console", version, about = "Trading bot websocket console")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: PathBuf,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request the portfolio summary
    Portfolio,
    /// Show exchange and pair settings
    Settings {
        /// Ignore the cached copy and fetch from the bot
        #[arg(long)]
        refresh: bool,
        /// Clear the cached copy before loading
        #[arg(long = "clear-cache")]
        clear_cache: bool,
    },
    /// Request all tickers once
    Tickers,
    /// Print inbound envelopes until Ctrl-C
    Watch {
        /// Only print envelopes with this tag (case-insensitive)
        #[arg(long, value_name = "TAG")]
        event: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = ConsoleConfig::from_file(&args.config_path).context("load config")?;
    info!(
        config_path = %args.config_path.display(),
        endpoint = %config.endpoint,
        "starting gct-console"
    );

    let client = Arc::new(GctClient::new(
        config.client_config()?,
        config.credential()?,
    ));

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());
    {
        let client = client.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            client.shutdown().await;
        });
    }

    let result = match args.command {
        Command::Portfolio => commands::portfolio(&client).await,
        Command::Settings {
            refresh,
            clear_cache,
        } => {
            let cache = SettingsCache::new(config.cache_store()?);
            commands::settings(&client, &cache, refresh, clear_cache).await
        }
        Command::Tickers => commands::tickers(&client).await,
        Command::Watch { event } => {
            let filter = event.as_deref().map(EventType::from);
            commands::watch(&client, filter, shutdown.clone()).await
        }
    };

    client.shutdown().await;
    info!("gct-console finished");
    result
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
