//! Core data types for scope-rs
//!
//! # Main Types
//!
//! - [`SampleVector`] - One parsed record: a fixed-length row of channel values
//! - [`RunState`] - Lifecycle of the acquisition loop
//! - [`AcquisitionStats`] - Counters reported by the acquisition loop

use chrono::{DateTime, Utc};
use std::ops::Deref;

/// One parsed record, one value per channel
#[derive(Debug, Clone, PartialEq)]
pub struct SampleVector(Vec<f64>);

impl SampleVector {
    /// Create a sample vector from channel values
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Number of channels in this sample
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Channel values, in channel order
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Consume into the underlying values
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for SampleVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for SampleVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Lifecycle of the acquisition loop. One-way: a stopped loop never resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Reading records
    #[default]
    Running,
    /// Stopped; the transport has been released
    Stopped,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Running => write!(f, "Running"),
            RunState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Why the acquisition loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was requested by the owner or consumer
    Requested,
    /// The transport failed; carries the error message
    TransportFailed(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Requested => write!(f, "stop requested"),
            StopReason::TransportFailed(e) => write!(f, "transport failed: {}", e),
        }
    }
}

/// Statistics about acquisition
#[derive(Debug, Clone)]
pub struct AcquisitionStats {
    /// When the loop started
    pub started_at: DateTime<Utc>,
    /// Records returned by the transport
    pub records_received: u64,
    /// Records parsed and appended to the buffer
    pub samples_appended: u64,
    /// Records rejected by the pattern
    pub pattern_mismatches: u64,
    /// Records with the wrong number of fields
    pub arity_mismatches: u64,
    /// Records with a non-numeric field
    pub numeric_errors: u64,
    /// Reads that timed out without a record
    pub read_timeouts: u64,
    /// Appended samples per second since start
    pub effective_sample_rate: f64,
}

impl Default for AcquisitionStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            records_received: 0,
            samples_appended: 0,
            pattern_mismatches: 0,
            arity_mismatches: 0,
            numeric_errors: 0,
            read_timeouts: 0,
            effective_sample_rate: 0.0,
        }
    }
}

impl AcquisitionStats {
    /// Total records dropped for any parse failure
    pub fn dropped_records(&self) -> u64 {
        self.pattern_mismatches + self.arity_mismatches + self.numeric_errors
    }

    /// Percentage of received records that made it into the buffer
    pub fn success_rate(&self) -> f64 {
        if self.records_received == 0 {
            100.0
        } else {
            (self.samples_appended as f64 / self.records_received as f64) * 100.0
        }
    }

    /// Count one parse failure by kind
    pub fn record_parse_error(&mut self, err: &crate::error::ParseError) {
        use crate::error::ParseError;
        match err {
            ParseError::PatternMismatch => self.pattern_mismatches += 1,
            ParseError::ArityMismatch { .. } => self.arity_mismatches += 1,
            ParseError::NumericConversion { .. } => self.numeric_errors += 1,
        }
    }

    /// Recompute the effective sample rate against the current time
    pub fn update_rate(&mut self) {
        let elapsed = (Utc::now() - self.started_at).num_milliseconds();
        if elapsed > 0 {
            self.effective_sample_rate = self.samples_appended as f64 * 1000.0 / elapsed as f64;
        }
    }
}
