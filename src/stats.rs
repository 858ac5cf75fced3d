// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Collector statistics
//!
//! Counters describing what the scheduler has done, for diagnostics.

use crate::store::MergeOutcome;

/// Scheduler activity counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Cycles that collected
    pub cycles: u64,
    /// Cycles skipped because the sensor was unconfigured
    pub skipped_cycles: u64,
    /// Adapter calls made
    pub fetches: u64,
    /// Adapter calls that failed
    pub fetch_failures: u64,
    /// Snapshots refused by the store (limits, names)
    pub rejected_snapshots: u64,
    /// Samples appended to histories
    pub values_appended: u64,
    /// Samples ignored as already retained
    pub values_stale: u64,
    /// Wall-clock time of the last collecting cycle, ms since the epoch
    pub last_cycle_ms: Option<i64>,
}

impl CollectorStats {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a collecting cycle
    pub fn record_cycle(&mut self) {
        self.cycles += 1;
        self.last_cycle_ms = Some(chrono::Utc::now().timestamp_millis());
    }

    /// Record a cycle skipped while unconfigured
    pub fn record_skip(&mut self) {
        self.skipped_cycles += 1;
    }

    /// Record a successful fetch and its merge
    pub fn record_merge(&mut self, outcome: &MergeOutcome) {
        self.fetches += 1;
        self.values_appended += outcome.appended as u64;
        self.values_stale += outcome.stale as u64;
    }

    /// Record a failed fetch
    pub fn record_failure(&mut self) {
        self.fetches += 1;
        self.fetch_failures += 1;
    }

    /// Record a snapshot the store refused
    pub fn record_rejected(&mut self) {
        self.fetches += 1;
        self.rejected_snapshots += 1;
    }

    /// Fraction of fetches that failed (0.0 - 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.fetches == 0 {
            return 0.0;
        }
        self.fetch_failures as f64 / self.fetches as f64
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Sensor Collector Statistics ===\n\n");
        report.push_str(&format!("Cycles: {}\n", self.cycles));
        report.push_str(&format!("Skipped (unconfigured): {}\n", self.skipped_cycles));
        report.push_str(&format!(
            "Fetches: {} ({} failed, {:.1}%)\n",
            self.fetches,
            self.fetch_failures,
            self.failure_rate() * 100.0
        ));
        report.push_str(&format!("Rejected snapshots: {}\n", self.rejected_snapshots));
        report.push_str(&format!(
            "Values: {} appended, {} stale\n",
            self.values_appended, self.values_stale
        ));

        if let Some(ms) = self.last_cycle_ms {
            if let Some(at) = chrono::DateTime::from_timestamp_millis(ms) {
                report.push_str(&format!("Last cycle: {}\n", at.to_rfc3339()));
            }
        }

        report
    }
}
