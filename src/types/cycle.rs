//! Per-Cycle Types
//!
//! Both types live for exactly one cycle and are rebuilt on the next one.

use serde::Serialize;
use std::fmt;

/// Destination address for one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepTarget(String);

impl SweepTarget {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `address` is the target itself
    pub fn is(&self, address: &str) -> bool {
        self.0 == address
    }
}

impl fmt::Display for SweepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregated outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    /// Addresses evaluated, excluding the target itself
    pub checked: u64,
    /// Addresses a positive amount was swept from
    pub swept: u64,
    /// Total XMR credited to users
    pub credited: f64,
    /// Addresses whose processing failed
    pub failed: u64,
    /// Disabled mapping records deleted
    pub deleted: u64,
}

impl CycleSummary {
    pub fn record_checked(&mut self) {
        self.checked += 1;
    }

    pub fn record_sweep(&mut self, amount_xmr: f64) {
        self.swept += 1;
        self.credited += amount_xmr;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn record_deletion(&mut self) {
        self.deleted += 1;
    }

    pub fn has_activity(&self) -> bool {
        self.swept > 0 || self.deleted > 0 || self.failed > 0
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked: {}, swept: {}, credited: {}, failed: {}, deleted: {}",
            self.checked,
            self.swept,
            crate::types::units::format_xmr(self.credited),
            self.failed,
            self.deleted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_accumulates() {
        let mut summary = CycleSummary::default();
        assert!(!summary.has_activity());

        summary.record_checked();
        summary.record_checked();
        summary.record_sweep(0.25);
        summary.record_sweep(0.5);

        assert_eq!(summary.checked, 2);
        assert_eq!(summary.swept, 2);
        assert_eq!(summary.credited, 0.75);
        assert!(summary.has_activity());
        assert!(summary.to_string().contains("0.750000000000 XMR"));
    }

    #[test]
    fn test_target_matching() {
        let target = SweepTarget::new("T");
        assert!(target.is("T"));
        assert!(!target.is("A"));
        assert_eq!(target.to_string(), "T");
    }
}
