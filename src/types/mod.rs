//! Shared Types Module
//!
//! Data types shared across the sweeper.

pub mod address;
pub mod cycle;
pub mod units;

// Re-exports for convenience
pub use address::{parse_timestamp, AddressRecord, AddressRecordWire, RecordId, SkipReason};
pub use cycle::{CycleSummary, SweepTarget};
pub use units::format_xmr;
