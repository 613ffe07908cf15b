//! Process configuration read from `STOCKCARE_*` environment variables.

use std::time::Duration;

use thiserror::Error;

use stockcare_observability::{LogFormat, ParseLogFormatError};

pub const EXPIRY_WINDOW_DAYS_VAR: &str = "STOCKCARE_EXPIRY_WINDOW_DAYS";
pub const LOG_FORMAT_VAR: &str = "STOCKCARE_LOG_FORMAT";
pub const PURCHASING_URL_VAR: &str = "STOCKCARE_PURCHASING_URL";
pub const PURCHASING_TIMEOUT_MS_VAR: &str = "STOCKCARE_PURCHASING_TIMEOUT_MS";

pub const DEFAULT_EXPIRY_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_PURCHASING_URL: &str = "http://localhost:4000/api/compras/novo-pedido";
pub const DEFAULT_PURCHASING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("STOCKCARE_LOG_FORMAT: {0}")]
    InvalidLogFormat(#[from] ParseLogFormatError),

    #[error("STOCKCARE_PURCHASING_URL: expected an http(s) URL, got {0:?}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCareConfig {
    /// Days ahead of today checked by expiry alerts.
    pub expiry_window_days: u32,
    pub log_format: LogFormat,
    /// Endpoint announced purchase requests are posted to.
    pub purchasing_url: String,
    pub purchasing_timeout: Duration,
}

impl Default for StockCareConfig {
    fn default() -> Self {
        Self {
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
            log_format: LogFormat::default(),
            purchasing_url: DEFAULT_PURCHASING_URL.to_string(),
            purchasing_timeout: DEFAULT_PURCHASING_TIMEOUT,
        }
    }
}

impl StockCareConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(EXPIRY_WINDOW_DAYS_VAR) {
            config.expiry_window_days = parse_number(EXPIRY_WINDOW_DAYS_VAR, &raw)?;
        }
        if let Some(raw) = get(LOG_FORMAT_VAR) {
            config.log_format = raw.parse()?;
        }
        if let Some(raw) = get(PURCHASING_URL_VAR) {
            let url = raw.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(raw));
            }
            config.purchasing_url = url.to_string();
        }
        if let Some(raw) = get(PURCHASING_TIMEOUT_MS_VAR) {
            config.purchasing_timeout =
                Duration::from_millis(parse_number(PURCHASING_TIMEOUT_MS_VAR, &raw)?);
        }

        Ok(config)
    }

    /// Install the tracing subscriber in the configured format.
    pub fn init_observability(&self) {
        stockcare_observability::tracing::init(self.log_format);
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}
