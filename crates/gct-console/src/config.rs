/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed console configuration and derived client settings
[POS]:    Configuration layer - connection, credential, and cache setup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use gct_ws_client::ws::DEFAULT_BROADCAST_CAPACITY;
use gct_ws_client::{ClientConfig, Credential, DEFAULT_ENDPOINT, FileStore, ResendPolicy};

/// Top-level configuration for the console
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleConfig {
    /// Bot websocket endpoint (ws:// or wss://)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Webserver admin username
    pub username: String,
    /// Plaintext admin password; hashed before use
    #[serde(default)]
    pub password: Option<String>,
    /// SHA-256 hex digest of the admin password
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Directory for the settings cache; platform data dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub resend: ResendConfig,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

/// Resend cadence for unanswered requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResendConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_resends")]
    pub max_resends: u32,
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_resends: default_max_resends(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

fn default_interval_ms() -> u64 {
    ResendPolicy::default().interval.as_millis() as u64
}

fn default_max_resends() -> u32 {
    ResendPolicy::default().max_resends
}

impl ConsoleConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("parse config yaml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            bail!("username must not be empty");
        }
        match (&self.password, &self.password_hash) {
            (Some(_), Some(_)) => bail!("set either password or password_hash, not both"),
            (None, None) => bail!("one of password or password_hash is required"),
            (None, Some(hash)) => {
                if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    bail!("password_hash must be a 64 character hex SHA-256 digest");
                }
            }
            (Some(_), None) => {}
        }
        if self.resend.interval_ms == 0 {
            bail!("resend.interval_ms must be positive");
        }
        if self.broadcast_capacity == 0 {
            bail!("broadcast_capacity must be positive");
        }
        Ok(())
    }

    pub fn credential(&self) -> Result<Credential> {
        match (&self.password, &self.password_hash) {
            (Some(password), _) => Ok(Credential::from_password(&self.username, password)),
            (None, Some(hash)) => Ok(Credential::new(&self.username, hash)),
            (None, None) => bail!("one of password or password_hash is required"),
        }
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::with_endpoint(&self.endpoint)
            .with_context(|| format!("invalid endpoint {}", self.endpoint))?;
        config.broadcast_capacity = self.broadcast_capacity;
        config.resend = ResendPolicy {
            interval: Duration::from_millis(self.resend.interval_ms),
            max_resends: self.resend.max_resends,
        };
        Ok(config)
    }

    pub fn cache_store(&self) -> Result<FileStore> {
        match &self.cache_dir {
            Some(dir) => Ok(FileStore::in_dir(dir)),
            None => FileStore::in_default_dir().context("locate settings cache directory"),
        }
    }
}
