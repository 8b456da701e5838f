//! Scheduler
//!
//! Runs a cycle, sleeps the configured interval, repeats. Each cycle runs
//! in its own task, so even a panic inside a cycle costs only that cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::client::Connector;
use crate::common::logging::{log_event, EventCategory, LogLevel};
use crate::cycle::{CycleError, CycleRunner};
use crate::types::CycleSummary;

/// Periodic driver for [`CycleRunner`]
pub struct Scheduler<C: Connector> {
    runner: Arc<CycleRunner<C>>,
    interval: Duration,
    running: Arc<RwLock<bool>>,
}

impl<C: Connector> Scheduler<C> {
    pub fn new(runner: Arc<CycleRunner<C>>, interval: Duration) -> Self {
        Self {
            runner,
            interval,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run a single cycle in an isolated task
    pub async fn tick(&self) -> Result<CycleSummary, CycleError> {
        let runner = Arc::clone(&self.runner);
        let handle = tokio::spawn(async move { runner.run_once().await });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                let err = CycleError::Panicked(join_err.to_string());
                log_event(
                    LogLevel::Error,
                    EventCategory::Cycle,
                    err.event_name(),
                    None,
                    serde_json::json!({ "error": err.to_string() }),
                );
                Err(err)
            }
        }
    }

    /// Run cycles until [`Scheduler::stop`] is called
    ///
    /// Cycle errors have already been logged by the time `tick` returns,
    /// so they are only used here to keep going.
    pub async fn run(&self) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        let mut fields = self.runner.config().summary_fields();
        fields["interval_seconds"] = serde_json::json!(self.interval.as_secs());
        log_event(
            LogLevel::Info,
            EventCategory::System,
            "sweeper_start",
            None,
            fields,
        );

        loop {
            if !*self.running.read().await {
                break;
            }

            let _ = self.tick().await;

            tokio::time::sleep(self.interval).await;
        }
    }

    /// Ask the loop to exit before its next cycle
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
