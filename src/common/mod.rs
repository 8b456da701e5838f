//! Common Infrastructure Module
//!
//! Shared utilities and configuration for the sweeper.
//!
//! This module contains:
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - Common error types

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{
    resolve_service_url, ConfigError, CreditKind, LogFormat, ServiceKind, SweeperConfig,
};
pub use error::{Result, SweeperError};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, log_event, EventCategory, LogEvent,
    LogLevel, LoggingError,
};
