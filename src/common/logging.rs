//! Structured Logging for the Sweeper
//!
//! Every operator-visible outcome is a named event with contextual fields,
//! serialized to JSON and emitted through `tracing`:
//!
//! ```text
//! {"timestamp":"...","level":"INFO","category":"cycle","event":"sweep_cycle_summary",
//!  "correlation_id":"5c1e...","fields":{"checked":2,"swept":1,"credited":0.0005}}
//! ```
//!
//! Events are routed to `sweeper::<category>` targets so they can be
//! filtered with `RUST_LOG`.

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        LogLevel::parse(s).unwrap_or(LogLevel::Info)
    }
}

impl LogLevel {
    /// Strict parse; `None` for names no level answers to
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" | "critical" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories, mapped to `sweeper::<category>` targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Startup and shutdown
    System,
    /// Cycle-level outcomes (target, inventory, summary)
    Cycle,
    /// Per-address sweep and credit outcomes
    Address,
    /// Disabled-address retention and deletion
    Retention,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (RFC 3339)
    pub timestamp: String,
    /// Log level
    pub level: String,
    /// Event category
    pub category: EventCategory,
    /// Stable event name
    pub event: &'static str,
    /// Cycle correlation id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Contextual fields
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub fields: serde_json::Value,
}

// `tracing` targets must be literals, so each category expands its own arms
macro_rules! dispatch {
    ($target:literal, $level:expr, $json:expr) => {
        match $level {
            LogLevel::Error => tracing::error!(target: $target, "{}", $json),
            LogLevel::Warn => tracing::warn!(target: $target, "{}", $json),
            LogLevel::Info => tracing::info!(target: $target, "{}", $json),
            LogLevel::Debug => tracing::debug!(target: $target, "{}", $json),
            LogLevel::Trace => tracing::trace!(target: $target, "{}", $json),
        }
    };
}

impl LogEvent {
    /// Create a new log event
    pub fn new(level: LogLevel, category: EventCategory, event: &'static str) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: format!("{:?}", level).to_uppercase(),
            category,
            event,
            correlation_id: None,
            fields: serde_json::Value::Null,
        }
    }

    /// Add correlation ID
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add contextual fields
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        self.fields = fields;
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"event\": \"{}\"}}",
                self.event
            )
        })
    }

    /// Emit through `tracing` at the event's own level
    pub fn emit(self, level: LogLevel) {
        let json = self.to_json();
        let level = routed_level(self.category, level);
        match self.category {
            EventCategory::System => dispatch!("sweeper::system", level, json),
            EventCategory::Cycle => dispatch!("sweeper::cycle", level, json),
            EventCategory::Address => dispatch!("sweeper::address", level, json),
            EventCategory::Retention => dispatch!("sweeper::retention", level, json),
        }
    }
}

/// Level an event is emitted at
///
/// Per-address and retention events are capped at warn.
pub fn routed_level(category: EventCategory, level: LogLevel) -> LogLevel {
    match (category, level) {
        (EventCategory::Address | EventCategory::Retention, LogLevel::Error) => LogLevel::Warn,
        (_, level) => level,
    }
}

/// Build and emit an event in one call
pub fn log_event(
    level: LogLevel,
    category: EventCategory,
    event: &'static str,
    correlation_id: Option<&str>,
    fields: serde_json::Value,
) {
    let mut log = LogEvent::new(level, category, event).with_fields(fields);
    if let Some(id) = correlation_id {
        log = log.with_correlation_id(id);
    }
    log.emit(level);
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sweeper={lvl},pupero_sweeper={lvl}",
            lvl = level.as_filter()
        ))
    });

    if json_format {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true));

        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true));

        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from SweeperConfig
pub fn init_from_config(config: &crate::common::config::SweeperConfig) -> Result<(), LoggingError> {
    let level = LogLevel::from(config.log_level.as_str());
    let json_format = config.log_format == crate::common::config::LogFormat::Json;

    init_logging(level, json_format)
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Generate a correlation ID shared by every event of one cycle
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ============================================================================
// Tests
// ============================================================================
