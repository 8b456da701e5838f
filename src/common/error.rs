//! Common Error Types for the Sweeper
//!
//! Module-level errors (`ConfigError`, `CycleError`, ...) convert into
//! [`SweeperError`] at the binary boundary.

use thiserror::Error;

use crate::cycle::CycleError;

/// Root error type for the sweeper
#[derive(Debug, Error)]
pub enum SweeperError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),

    /// A single `--once` cycle ended early
    #[error("cycle error: {0}")]
    Cycle(#[from] CycleError),
}

impl SweeperError {
    /// Stable error code printed on exit
    pub fn error_code(&self) -> &'static str {
        match self {
            SweeperError::Config(_) => "CONFIG_ERROR",
            SweeperError::Logging(_) => "LOGGING_ERROR",
            SweeperError::Cycle(CycleError::Connection(_)) => "CONNECTION_ERROR",
            SweeperError::Cycle(CycleError::TargetResolution { .. }) => "TARGET_RESOLUTION_ERROR",
            SweeperError::Cycle(CycleError::Inventory(_)) => "INVENTORY_ERROR",
            SweeperError::Cycle(CycleError::Panicked(_)) => "CYCLE_PANIC",
        }
    }
}

/// Result type alias using SweeperError
pub type Result<T> = std::result::Result<T, SweeperError>;
