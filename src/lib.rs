//! Pupero Sweeper - Deposit Consolidation Service
//!
//! Background worker that moves user deposits from per-user Monero
//! subaddresses into one target address and credits each user in the
//! internal ledger.
//!
//! ## Cycle
//!
//! 1. Resolve the sweep target (configured, or the wallet's primary address)
//! 2. List the deposit-address mapping records
//! 3. For each record: check balance, sweep at or above the threshold,
//!    credit what was actually swept
//! 4. Delete disabled, empty records whose retention date has passed
//!
//! ## Upstream Services
//!
//! - Wallet service: addresses, balances, sweeps, record deletion
//! - Ledger service: user balance credits

pub mod client;
pub mod common;
pub mod cycle;
pub mod engine;
pub mod inventory;
pub mod scheduler;
pub mod target;
pub mod types;

// Re-exports: service client
pub use client::{ClientError, Connector, Endpoints, HttpConnector, HttpServiceClient, ServiceClient};

// Re-exports: cycle
pub use cycle::{CycleError, CycleRunner};
pub use engine::{
    retention_decision, AddressOutcome, EngineSettings, RetentionDecision, RetentionOutcome,
    Stage, SweepEngine,
};
pub use inventory::{load_inventory, Inventory};
pub use scheduler::Scheduler;
pub use target::{resolve_target, RetryPolicy};

// Re-exports: shared infrastructure
pub use common::{CreditKind, ServiceKind, SweeperConfig, SweeperError};
pub use types::{units, AddressRecord, CycleSummary, RecordId, SweepTarget};
