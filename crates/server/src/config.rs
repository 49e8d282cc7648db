use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "billsync.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    /// Keep bills in process memory instead of SQLite.
    pub memory: bool,
    /// Deadline for each store call; `0` disables it.
    pub store_timeout_ms: u64,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_path: PathBuf::from("bills.db"),
            memory: false,
            store_timeout_ms: 5_000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Reads `$BILLSYNC_CONFIG`, or `billsync.toml` when present, then applies
    /// `BILLSYNC_*` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var_os("BILLSYNC_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(bind) = lookup("BILLSYNC_BIND") {
            self.bind_addr = bind
                .parse()
                .with_context(|| format!("BILLSYNC_BIND is not a socket address: {bind}"))?;
        }
        if let Some(path) = lookup("BILLSYNC_DATABASE") {
            if path == ":memory:" {
                self.memory = true;
            } else {
                self.database_path = PathBuf::from(path);
            }
        }
        if let Some(ms) = lookup("BILLSYNC_STORE_TIMEOUT_MS") {
            self.store_timeout_ms = ms
                .parse()
                .with_context(|| format!("BILLSYNC_STORE_TIMEOUT_MS is not a number: {ms}"))?;
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        (self.store_timeout_ms > 0).then(|| Duration::from_millis(self.store_timeout_ms))
    }
}
