//! Environment-driven configuration

use crate::error::AgentError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ORDERBOOK_URL: &str = "http://localhost:8080";
pub const DEFAULT_API_PORT: u16 = 3001;

/// Where a bare "buy"/"sell" command (neither "market" nor "limit") goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BareOrderDefault {
    /// Route to the market buy/sell descriptors.
    #[default]
    Market,
    /// Route to the limit order placer.
    Limit,
    /// Match nothing; the user gets the help message.
    None,
}

impl FromStr for BareOrderDefault {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "market" => Ok(BareOrderDefault::Market),
            "limit" => Ok(BareOrderDefault::Limit),
            "none" | "off" => Ok(BareOrderDefault::None),
            other => Err(AgentError::Config(format!(
                "ORDERBOOK_BARE_ORDER_DEFAULT must be market, limit or none (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub orderbook_url: String,
    /// `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
    pub bare_order_default: BareOrderDefault,
    pub api_port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            orderbook_url: DEFAULT_ORDERBOOK_URL.to_string(),
            request_timeout: None,
            bare_order_default: BareOrderDefault::Market,
            api_port: DEFAULT_API_PORT,
        }
    }
}

impl AgentConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let orderbook_url = lookup("ORDERBOOK_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ORDERBOOK_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let request_timeout = match lookup("ORDERBOOK_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AgentError::Config(format!(
                        "ORDERBOOK_REQUEST_TIMEOUT_SECS must be a whole number of seconds (got '{}')",
                        raw
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let bare_order_default = match lookup("ORDERBOOK_BARE_ORDER_DEFAULT") {
            Some(raw) => raw.parse()?,
            None => BareOrderDefault::default(),
        };

        let api_port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AgentError::Config(format!("invalid port '{}'", raw)))?,
            None => DEFAULT_API_PORT,
        };

        Ok(Self {
            orderbook_url,
            request_timeout,
            bare_order_default,
            api_port,
        })
    }
}
