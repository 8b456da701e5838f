//! Sweep Target Resolution
//!
//! The destination is re-resolved every cycle so a configuration change or
//! a rotated wallet primary address is picked up on the next run.

use std::time::Duration;

use crate::client::ServiceClient;
use crate::common::logging::{log_event, EventCategory, LogLevel};
use crate::cycle::CycleError;
use crate::types::SweepTarget;

/// Attempts made against `GET /primary_address` before giving up
pub const DEFAULT_TARGET_ATTEMPTS: u32 = 3;

/// Pause between attempts
pub const DEFAULT_TARGET_BACKOFF: Duration = Duration::from_secs(1);

/// Fixed-backoff retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one
    pub max_attempts: u32,
    /// Sleep between consecutive attempts, never after the last
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_TARGET_ATTEMPTS,
            backoff: DEFAULT_TARGET_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Resolve this cycle's destination address
///
/// A configured address wins and costs no request. Otherwise the wallet's
/// primary address is fetched under `policy`; exhausting it is cycle-fatal.
pub async fn resolve_target<C>(
    client: &C,
    configured: Option<&str>,
    policy: &RetryPolicy,
    cycle_id: &str,
) -> Result<SweepTarget, CycleError>
where
    C: ServiceClient + ?Sized,
{
    if let Some(address) = configured.map(str::trim).filter(|a| !a.is_empty()) {
        return Ok(SweepTarget::new(address));
    }

    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match client.fetch_primary_address().await {
            Ok(address) => return Ok(SweepTarget::new(address)),
            Err(source) if attempt >= max_attempts => {
                return Err(CycleError::TargetResolution {
                    attempts: attempt,
                    source,
                });
            }
            Err(e) => {
                log_event(
                    LogLevel::Debug,
                    EventCategory::Cycle,
                    "sweep_target_retry",
                    Some(cycle_id),
                    serde_json::json!({
                        "attempt": attempt,
                        "max_attempts": max_attempts,
                        "error": e.to_string(),
                    }),
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}
