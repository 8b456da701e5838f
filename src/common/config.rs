//! Environment-based Configuration for the Sweeper
//!
//! Configuration is read once at startup and never re-read while the
//! sweeper runs. Every component receives the same immutable
//! [`SweeperConfig`].
//!
//! # Environment Variables
//!
//! ## Upstream Services
//! - `MONERO_SERVICE_URL` - Wallet service URL or logical name (default: "monero")
//! - `TRANSACTIONS_SERVICE_URL` - Ledger service URL or logical name (default: "transactions")
//!
//! ## Sweep Policy
//! - `SWEEP_INTERVAL_SECONDS` - Seconds between cycles (default: 1800)
//! - `MIN_SWEEP_XMR` - Minimum unlocked balance worth sweeping (default: 0.0001)
//! - `TARGET_SWEEP_ADDRESS` - Fixed destination; resolved from the wallet when unset
//! - `CREDIT_KIND` - Ledger credit discriminator, "real" or "fake" (default: "fake")
//!
//! ## Timeouts
//! - `READ_TIMEOUT_SECONDS` - Reads, credits and deletes (default: 20)
//! - `SWEEP_TIMEOUT_SECONDS` - `sweep_all` calls (default: 60)
//!
//! ## Logging
//! - `LOG_LEVEL` - trace, debug, info, warn, error (default: "info"; anything else fails startup)
//! - `LOG_FORMAT` - "json" or "pretty" (default: "json")
//!
//! # Logical Service Names
//!
//! Service URLs may be given as bare names used by the compose deployment:
//!
//! | Name | Resolves to |
//! |---|---|
//! | `monero`, `wallet` | `http://monero:8004` |
//! | `transactions`, `ledger` | `http://transactions:8003` |
//! | `api-manager`, `gateway` | `http://api-manager:8000/<service path>` |
//!
//! A bare `host:port` or dotted host name gets an `http://` prefix. Any other
//! unknown name falls back to the service's default URL.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::logging::LogLevel;

/// Default wallet service URL
pub const DEFAULT_WALLET_URL: &str = "http://monero:8004";

/// Default ledger service URL
pub const DEFAULT_LEDGER_URL: &str = "http://transactions:8003";

/// Default seconds between sweep cycles
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 1800;

/// Default minimum sweepable amount in XMR
pub const DEFAULT_MIN_SWEEP_XMR: f64 = 0.0001;

/// Default timeout for read-style requests
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 20;

/// Default timeout for sweep requests
pub const DEFAULT_SWEEP_TIMEOUT_SECS: u64 = 60;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("empty service URL for {0}")]
    EmptyServiceUrl(String),
}

/// Upstream service a URL belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// Wallet service: keys, balances, sweeps, address mappings
    Wallet,
    /// Ledger service: internal user balances
    Ledger,
}

impl ServiceKind {
    /// Default base URL used when nothing better is known
    pub fn default_url(&self) -> &'static str {
        match self {
            ServiceKind::Wallet => DEFAULT_WALLET_URL,
            ServiceKind::Ledger => DEFAULT_LEDGER_URL,
        }
    }

    /// Path prefix the API gateway mounts this service under
    fn gateway_path(&self) -> &'static str {
        match self {
            ServiceKind::Wallet => "/monero",
            ServiceKind::Ledger => "/transactions",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Wallet => write!(f, "wallet"),
            ServiceKind::Ledger => write!(f, "ledger"),
        }
    }
}

/// Static lookup of logical service names
const SERVICE_NAMES: &[(&str, &str)] = &[
    ("monero", DEFAULT_WALLET_URL),
    ("wallet", DEFAULT_WALLET_URL),
    ("transactions", DEFAULT_LEDGER_URL),
    ("ledger", DEFAULT_LEDGER_URL),
];

/// Gateway names that proxy every service under a path prefix
const GATEWAY_NAMES: &[(&str, &str)] = &[
    ("api-manager", "http://api-manager:8000"),
    ("gateway", "http://api-manager:8000"),
];

/// Resolve a configured service value to a base URL without trailing slash
pub fn resolve_service_url(raw: &str, kind: ServiceKind) -> Result<String, ConfigError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::EmptyServiceUrl(kind.to_string()));
    }

    if value.contains("://") {
        return Ok(value.trim_end_matches('/').to_string());
    }

    let name = value.trim_end_matches('/').to_lowercase();

    if let Some((_, url)) = SERVICE_NAMES.iter().find(|(n, _)| *n == name) {
        return Ok((*url).to_string());
    }

    if let Some((_, url)) = GATEWAY_NAMES.iter().find(|(n, _)| *n == name) {
        return Ok(format!("{}{}", url, kind.gateway_path()));
    }

    if name.contains(':') || name.contains('.') {
        return Ok(format!("http://{}", value.trim_end_matches('/')));
    }

    Ok(kind.default_url().to_string())
}

/// Kind of funds credited to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    /// Real on-chain funds
    Real,
    /// Test/demo funds
    Fake,
}

impl CreditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditKind::Real => "real",
            CreditKind::Fake => "fake",
        }
    }
}

impl fmt::Display for CreditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "real" => Ok(CreditKind::Real),
            "fake" => Ok(CreditKind::Fake),
            _ => Err(ConfigError::InvalidValue(
                "CREDIT_KIND".to_string(),
                format!("unknown kind: {} (use 'real' or 'fake')", s),
            )),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            _ => Err(ConfigError::InvalidValue(
                "LOG_FORMAT".to_string(),
                format!("unknown format: {}", s),
            )),
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Wallet service base URL
    pub wallet_url: String,

    /// Ledger service base URL
    pub ledger_url: String,

    /// Seconds slept between cycles
    pub sweep_interval_secs: u64,

    /// Minimum unlocked balance (XMR) worth sweeping
    pub min_sweep_xmr: f64,

    /// Fixed destination address, resolved per cycle when `None`
    pub target_address: Option<String>,

    /// Discriminator passed with every ledger credit
    pub credit_kind: CreditKind,

    /// Timeout for reads, credits and deletes
    pub read_timeout: Duration,

    /// Timeout for sweep requests
    pub sweep_timeout: Duration,

    /// Log level
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            wallet_url: DEFAULT_WALLET_URL.to_string(),
            ledger_url: DEFAULT_LEDGER_URL.to_string(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            min_sweep_xmr: DEFAULT_MIN_SWEEP_XMR,
            target_address: None,
            credit_kind: CreditKind::Fake,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            sweep_timeout: Duration::from_secs(DEFAULT_SWEEP_TIMEOUT_SECS),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl SweeperConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let wallet_url = resolve_service_url(
            &lookup("MONERO_SERVICE_URL").unwrap_or_else(|| DEFAULT_WALLET_URL.to_string()),
            ServiceKind::Wallet,
        )?;

        let ledger_url = resolve_service_url(
            &lookup("TRANSACTIONS_SERVICE_URL").unwrap_or_else(|| DEFAULT_LEDGER_URL.to_string()),
            ServiceKind::Ledger,
        )?;

        let sweep_interval_secs: u64 =
            parse_or_default(&lookup, "SWEEP_INTERVAL_SECONDS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECONDS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let min_sweep_xmr: f64 = parse_or_default(&lookup, "MIN_SWEEP_XMR", DEFAULT_MIN_SWEEP_XMR)?;
        if !min_sweep_xmr.is_finite() || min_sweep_xmr < 0.0 {
            return Err(ConfigError::InvalidValue(
                "MIN_SWEEP_XMR".to_string(),
                format!("must be a non-negative amount, got {}", min_sweep_xmr),
            ));
        }

        // Blank is the same as unset
        let target_address = lookup("TARGET_SWEEP_ADDRESS")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let credit_kind = match lookup("CREDIT_KIND") {
            Some(v) => v.parse()?,
            None => CreditKind::Fake,
        };

        let read_timeout_secs: u64 =
            parse_or_default(&lookup, "READ_TIMEOUT_SECONDS", DEFAULT_READ_TIMEOUT_SECS)?;
        let sweep_timeout_secs: u64 =
            parse_or_default(&lookup, "SWEEP_TIMEOUT_SECONDS", DEFAULT_SWEEP_TIMEOUT_SECS)?;
        for (name, secs) in [
            ("READ_TIMEOUT_SECONDS", read_timeout_secs),
            ("SWEEP_TIMEOUT_SECONDS", sweep_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidValue(
                    name.to_string(),
                    "must be greater than zero".to_string(),
                ));
            }
        }

        let log_level = lookup("LOG_LEVEL")
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());
        if LogLevel::parse(&log_level).is_none() {
            return Err(ConfigError::InvalidValue(
                "LOG_LEVEL".to_string(),
                format!("unknown level: {}", log_level),
            ));
        }

        let log_format = match lookup("LOG_FORMAT") {
            Some(v) => v.parse()?,
            None => LogFormat::Json,
        };

        Ok(Self {
            wallet_url,
            ledger_url,
            sweep_interval_secs,
            min_sweep_xmr,
            target_address,
            credit_kind,
            read_timeout: Duration::from_secs(read_timeout_secs),
            sweep_timeout: Duration::from_secs(sweep_timeout_secs),
            log_level,
            log_format,
        })
    }

    /// Interval slept between cycles
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// How the target is chosen, for the startup event
    pub fn target_mode(&self) -> &'static str {
        if self.target_address.is_some() {
            "fixed"
        } else {
            "wallet_primary"
        }
    }

    /// Non-sensitive fields for the startup event
    pub fn summary_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "interval_seconds": self.sweep_interval_secs,
            "min_sweep_xmr": self.min_sweep_xmr,
            "credit_kind": self.credit_kind.as_str(),
            "target_mode": self.target_mode(),
            "wallet_url": self.wallet_url,
            "ledger_url": self.ledger_url,
        })
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("=== Sweeper Configuration ===");
        println!("Wallet Service: {}", self.wallet_url);
        println!("Ledger Service: {}", self.ledger_url);
        println!("Sweep Interval: {} seconds", self.sweep_interval_secs);
        println!("Min Sweep: {}", crate::types::units::format_xmr(self.min_sweep_xmr));
        match &self.target_address {
            Some(addr) => println!("Target: {} (fixed)", addr),
            None => println!("Target: wallet primary address (per cycle)"),
        }
        println!("Credit Kind: {}", self.credit_kind);
        println!(
            "Timeouts: read {}s, sweep {}s",
            self.read_timeout.as_secs(),
            self.sweep_timeout.as_secs()
        );
        println!("Log Level: {}", self.log_level);
        println!("=============================");
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("cannot parse '{}'", raw))
        }),
        _ => Ok(default),
    }
}
