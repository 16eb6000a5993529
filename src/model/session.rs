//! Session Model
//!
//! Session phase, live counters polled by presentation, and the summary handed
//! to persistence and export.

use super::sample::Sample;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Phase of the settling gate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    Settling,
    Ready,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => f.write_str("IDLE"),
            SessionPhase::Settling => f.write_str("SETTLING..."),
            SessionPhase::Ready => f.write_str("READY"),
        }
    }
}

/// Snapshot of the settling gate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Session clock value at `start`, in seconds.
    pub session_start_time: Option<f64>,
    pub settling_start_time: Option<f64>,
}

/// Point-in-time counters for status displays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveCounters {
    pub phase: SessionPhase,
    /// Number of samples in the raw series.
    pub sample_count: usize,
    /// Samples waiting in the aggregation buffer.
    pub buffered: usize,
    pub aggregate_count: usize,
    pub downsampled_count: usize,
    /// Records dropped because they could not be parsed.
    pub dropped_records: usize,
    /// Most recent accepted online BPM reading.
    pub last_bpm: Option<f64>,
    pub latest_sample: Option<Sample>,
}

impl LiveCounters {
    pub fn is_ready(&self) -> bool {
        self.phase == SessionPhase::Ready
    }
}

impl fmt::Display for LiveCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data: {} | Buffer: {} | Aggregates: {} | {}",
            self.sample_count, self.buffered, self.aggregate_count, self.phase
        )?;
        if let Some(bpm) = self.last_bpm {
            write!(f, " | BPM: {:.1}", bpm)?;
        }
        Ok(())
    }
}

/// Measurement metadata, the only session data persistence receives besides the report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub subject: String,
    /// Wall-clock time the session was first started.
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// Timestamp of the last raw sample in seconds.
    pub duration_seconds: f64,
    pub total_samples: usize,
    pub sampling_rate_hz: f64,
}

/// Record counts behind the storage-efficiency figure.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub raw_samples: usize,
    pub aggregates: usize,
    pub downsampled: usize,
}

impl StorageInfo {
    /// Share of raw samples saved by keeping aggregates instead, in percent.
    pub fn efficiency(&self) -> f64 {
        (1.0 - self.aggregates as f64 / self.raw_samples.max(1) as f64) * 100.0
    }
}
