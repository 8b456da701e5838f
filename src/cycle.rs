//! Cycle Orchestrator
//!
//! One full sweep pass:
//!
//! 1. Open a client for this cycle only
//! 2. Resolve the target (cycle-fatal on failure)
//! 3. Load the inventory (cycle-fatal on failure)
//! 4. Run the decision engine over every record
//! 5. Emit `sweep_cycle_summary`
//!
//! The client is dropped when `run_once` returns, on every path.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::client::{ClientError, Connector};
use crate::common::config::SweeperConfig;
use crate::common::logging::{generate_correlation_id, log_event, EventCategory, LogLevel};
use crate::engine::{EngineSettings, SweepEngine};
use crate::inventory::load_inventory;
use crate::target::{resolve_target, RetryPolicy};
use crate::types::CycleSummary;

/// Errors that end a cycle early
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to open service client: {0}")]
    Connection(#[source] ClientError),

    #[error("sweep target unresolved after {attempts} attempt(s): {source}")]
    TargetResolution {
        attempts: u32,
        #[source]
        source: ClientError,
    },

    #[error("failed to list address records: {0}")]
    Inventory(#[source] ClientError),

    #[error("cycle task panicked: {0}")]
    Panicked(String),
}

impl CycleError {
    /// Event emitted when this error aborts a cycle
    pub fn event_name(&self) -> &'static str {
        match self {
            CycleError::Connection(_) => "sweep_connection_error",
            CycleError::TargetResolution { .. } => "sweep_target_error",
            CycleError::Inventory(_) => "list_addresses_error",
            CycleError::Panicked(_) => "sweep_cycle_exception",
        }
    }
}

/// Runs single sweep cycles
pub struct CycleRunner<C: Connector> {
    connector: Arc<C>,
    config: Arc<SweeperConfig>,
    settings: EngineSettings,
    retry: RetryPolicy,
}

impl<C: Connector> CycleRunner<C> {
    pub fn new(connector: Arc<C>, config: Arc<SweeperConfig>) -> Self {
        let settings = EngineSettings::from_config(&config);
        Self {
            connector,
            config,
            settings,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the target-resolution retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Run one complete cycle
    ///
    /// Per-address problems are counted in the summary. Only connection,
    /// target and inventory failures end the cycle with an error, which is
    /// logged here before being returned.
    pub async fn run_once(&self) -> Result<CycleSummary, CycleError> {
        let cycle_id = generate_correlation_id();
        let started = Instant::now();

        let result = self.sweep(&cycle_id, started).await;
        if let Err(e) = &result {
            log_cycle_error(e, &cycle_id);
        }
        result
    }

    async fn sweep(&self, cycle_id: &str, started: Instant) -> Result<CycleSummary, CycleError> {
        let client = self.connector.connect().map_err(CycleError::Connection)?;

        let target = resolve_target(
            &client,
            self.config.target_address.as_deref(),
            &self.retry,
            cycle_id,
        )
        .await?;

        let inventory = load_inventory(&client).await?;

        let engine = SweepEngine::new(&client, self.settings, &target, cycle_id);
        let mut summary = CycleSummary::default();
        for record in &inventory.records {
            engine.process(record, &mut summary).await;
        }

        log_event(
            LogLevel::Info,
            EventCategory::Cycle,
            "sweep_cycle_summary",
            Some(cycle_id),
            serde_json::json!({
                "checked": summary.checked,
                "swept": summary.swept,
                "credited": summary.credited,
                "failed": summary.failed,
                "deleted": summary.deleted,
                "records": inventory.len(),
                "disabled": inventory.disabled_count(),
                "target": target.as_str(),
                "duration_ms": started.elapsed().as_millis() as u64,
            }),
        );

        Ok(summary)
    }
}

fn log_cycle_error(err: &CycleError, cycle_id: &str) {
    let mut fields = serde_json::json!({ "error": err.to_string() });
    match err {
        CycleError::TargetResolution { attempts, source } => {
            fields["attempts"] = serde_json::json!(attempts);
            fields["status"] = serde_json::json!(source.status());
        }
        CycleError::Connection(source) | CycleError::Inventory(source) => {
            fields["status"] = serde_json::json!(source.status());
        }
        CycleError::Panicked(_) => {}
    }

    log_event(
        LogLevel::Error,
        EventCategory::Cycle,
        err.event_name(),
        Some(cycle_id),
        fields,
    );
}
