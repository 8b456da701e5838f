//! Sweep Decision Engine
//!
//! Handles one mapping record against the cycle's target:
//!
//! ```text
//! skip target → check balance → sweep (≥ threshold) → credit (> 0) → retention
//! ```
//!
//! Crediting only follows funds that actually moved. The retention check
//! reuses the balance read before the sweep, so an address that still held
//! funds this cycle is never deleted in the same cycle.
//!
//! Every failure is contained here: the record is logged and counted as
//! failed, and the cycle moves on to the next record.

use chrono::{DateTime, Utc};

use crate::client::{ClientError, ServiceClient};
use crate::common::config::{CreditKind, SweeperConfig};
use crate::common::logging::{log_event, EventCategory, LogLevel};
use crate::types::{
    parse_timestamp, AddressRecord, CycleSummary, RecordId, SkipReason, SweepTarget,
};

/// Policy knobs the engine needs from configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Minimum unlocked balance (XMR) worth sweeping
    pub min_sweep_xmr: f64,
    /// Discriminator sent with every credit
    pub credit_kind: CreditKind,
}

impl EngineSettings {
    pub fn from_config(config: &SweeperConfig) -> Self {
        Self {
            min_sweep_xmr: config.min_sweep_xmr,
            credit_kind: config.credit_kind,
        }
    }
}

/// What happened to one record
#[derive(Debug, Clone, PartialEq)]
pub enum AddressOutcome {
    /// The record is the target address; nothing was called
    SkippedTarget,
    /// The record carries no usable user id; nothing was called
    SkippedInvalidUser,
    /// Balance was read; sweep/credit/retention ran as applicable
    Checked {
        unlocked_xmr: f64,
        /// `Some` when a sweep was requested, with the amount it moved
        swept_xmr: Option<f64>,
        retention: RetentionOutcome,
    },
    /// Processing stopped on an upstream error
    Failed { stage: Stage },
}

/// Step at which a record failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Balance,
    Sweep,
    Credit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Balance => "balance",
            Stage::Sweep => "sweep",
            Stage::Credit => "credit",
        }
    }
}

/// Retention verdict for a record, before any request is made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionDecision {
    /// Not disabled, not due, not empty, or no id to delete by
    Keep,
    /// Eligible: delete the record with this id
    Delete(RecordId),
    /// Otherwise eligible, but `deletion_date` could not be parsed
    InvalidDate,
}

/// Result of the retention step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionOutcome {
    Kept,
    Deleted,
    /// The service answered without confirming the delete
    NotConfirmed,
    DeleteFailed,
    InvalidDate,
}

/// Decide whether a record should be deleted
///
/// Deletion requires all of: disabled, an id, a balance below the sweep
/// threshold, and a parseable `deletion_date` that is not in the future.
pub fn retention_decision(
    record: &AddressRecord,
    unlocked_xmr: f64,
    min_sweep_xmr: f64,
    now: DateTime<Utc>,
) -> RetentionDecision {
    if !record.is_disabled || unlocked_xmr >= min_sweep_xmr {
        return RetentionDecision::Keep;
    }

    let (Some(raw_date), Some(id)) = (record.deletion_date.as_deref(), record.id.as_ref()) else {
        return RetentionDecision::Keep;
    };

    match parse_timestamp(raw_date) {
        Some(cutoff) if now >= cutoff => RetentionDecision::Delete(id.clone()),
        Some(_) => RetentionDecision::Keep,
        None => RetentionDecision::InvalidDate,
    }
}

/// Per-record failure with the step it happened at
#[derive(Debug)]
struct AddressError {
    stage: Stage,
    source: ClientError,
    /// Amount already moved when the credit failed
    swept_xmr: Option<f64>,
}

/// Runs the per-record sequence for one cycle
pub struct SweepEngine<'a, C: ?Sized> {
    client: &'a C,
    settings: EngineSettings,
    target: &'a SweepTarget,
    cycle_id: &'a str,
}

impl<'a, C> SweepEngine<'a, C>
where
    C: ServiceClient + ?Sized,
{
    pub fn new(
        client: &'a C,
        settings: EngineSettings,
        target: &'a SweepTarget,
        cycle_id: &'a str,
    ) -> Self {
        Self {
            client,
            settings,
            target,
            cycle_id,
        }
    }

    /// Process one record, folding the result into `summary`
    ///
    /// Never fails; errors are logged and counted.
    pub async fn process(
        &self,
        record: &AddressRecord,
        summary: &mut CycleSummary,
    ) -> AddressOutcome {
        // Never sweep the destination into itself
        if self.target.is(&record.address) {
            return AddressOutcome::SkippedTarget;
        }

        // Nobody to credit
        if record.user_id == 0 {
            log_event(
                LogLevel::Debug,
                EventCategory::Address,
                "address_record_skipped",
                Some(self.cycle_id),
                serde_json::json!({
                    "address": record.address,
                    "reason": SkipReason::InvalidUserId.as_str(),
                }),
            );
            return AddressOutcome::SkippedInvalidUser;
        }

        summary.record_checked();

        let result = self.try_process(record, summary).await;
        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                summary.record_failure();
                self.log_failure(record, &err);
                AddressOutcome::Failed { stage: err.stage }
            }
        }
    }

    async fn try_process(
        &self,
        record: &AddressRecord,
        summary: &mut CycleSummary,
    ) -> Result<AddressOutcome, AddressError> {
        let unlocked_xmr = self
            .client
            .get_unlocked_balance(&record.address)
            .await
            .map_err(|source| AddressError {
                stage: Stage::Balance,
                source,
                swept_xmr: None,
            })?;

        let swept_xmr = if unlocked_xmr >= self.settings.min_sweep_xmr {
            Some(self.sweep_and_credit(record, summary).await?)
        } else {
            None
        };

        let retention = self.apply_retention(record, unlocked_xmr, summary).await;

        Ok(AddressOutcome::Checked {
            unlocked_xmr,
            swept_xmr,
            retention,
        })
    }

    async fn sweep_and_credit(
        &self,
        record: &AddressRecord,
        summary: &mut CycleSummary,
    ) -> Result<f64, AddressError> {
        let swept = self
            .client
            .sweep_address(&record.address, self.target.as_str())
            .await
            .map_err(|source| AddressError {
                stage: Stage::Sweep,
                source,
                swept_xmr: None,
            })?;

        // Funds can vanish between the balance check and the sweep; that is
        // a normal outcome, not an error.
        if swept <= 0.0 || swept.is_nan() {
            log_event(
                LogLevel::Debug,
                EventCategory::Address,
                "sweep_returned_zero",
                Some(self.cycle_id),
                serde_json::json!({
                    "user_id": record.user_id,
                    "address": record.address,
                }),
            );
            return Ok(0.0);
        }

        self.client
            .credit_user(record.user_id, swept, self.settings.credit_kind)
            .await
            .map_err(|source| AddressError {
                stage: Stage::Credit,
                source,
                swept_xmr: Some(swept),
            })?;

        summary.record_sweep(swept);

        log_event(
            LogLevel::Info,
            EventCategory::Address,
            "swept_and_credited",
            Some(self.cycle_id),
            serde_json::json!({
                "user_id": record.user_id,
                "from": record.address,
                "to": self.target.as_str(),
                "amount_xmr": swept,
                "kind": self.settings.credit_kind.as_str(),
            }),
        );

        Ok(swept)
    }

    async fn apply_retention(
        &self,
        record: &AddressRecord,
        unlocked_xmr: f64,
        summary: &mut CycleSummary,
    ) -> RetentionOutcome {
        let decision = retention_decision(
            record,
            unlocked_xmr,
            self.settings.min_sweep_xmr,
            Utc::now(),
        );

        let id = match decision {
            RetentionDecision::Keep => return RetentionOutcome::Kept,
            RetentionDecision::InvalidDate => {
                log_event(
                    LogLevel::Warn,
                    EventCategory::Retention,
                    "deletion_date_invalid",
                    Some(self.cycle_id),
                    serde_json::json!({
                        "id": record.id,
                        "address": record.address,
                        "deletion_date": record.deletion_date,
                    }),
                );
                return RetentionOutcome::InvalidDate;
            }
            RetentionDecision::Delete(id) => id,
        };

        match self.client.delete_address_record(&id).await {
            Ok(true) => {
                summary.record_deletion();
                log_event(
                    LogLevel::Info,
                    EventCategory::Retention,
                    "address_record_deleted",
                    Some(self.cycle_id),
                    serde_json::json!({
                        "id": id,
                        "address": record.address,
                        "user_id": record.user_id,
                    }),
                );
                RetentionOutcome::Deleted
            }
            Ok(false) => {
                log_event(
                    LogLevel::Warn,
                    EventCategory::Retention,
                    "address_delete_failed",
                    Some(self.cycle_id),
                    serde_json::json!({
                        "id": id,
                        "address": record.address,
                        "error": "delete not confirmed",
                    }),
                );
                RetentionOutcome::NotConfirmed
            }
            Err(e) => {
                log_event(
                    LogLevel::Warn,
                    EventCategory::Retention,
                    "address_delete_failed",
                    Some(self.cycle_id),
                    serde_json::json!({
                        "id": id,
                        "address": record.address,
                        "status": e.status(),
                        "error": e.to_string(),
                    }),
                );
                RetentionOutcome::DeleteFailed
            }
        }
    }

    fn log_failure(&self, record: &AddressRecord, err: &AddressError) {
        let mut fields = serde_json::json!({
            "address": record.address,
            "user_id": record.user_id,
            "stage": err.stage.as_str(),
        });
        if let Some(swept) = err.swept_xmr {
            // Funds moved but the ledger was not credited
            fields["swept_xmr"] = serde_json::json!(swept);
        }

        let event = match (&err.source, err.source.status()) {
            (ClientError::Upstream { .. }, Some(status)) => {
                fields["status"] = serde_json::json!(status);
                "address_process_http_error"
            }
            _ => {
                fields["error"] = serde_json::json!(err.source.to_string());
                "address_process_error"
            }
        };

        log_event(
            LogLevel::Warn,
            EventCategory::Address,
            event,
            Some(self.cycle_id),
            fields,
        );
    }
}
