//! HRV Model
//!
//! This module defines the results of the offline beat detection and the HRV
//! report derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

/// A beat re-derived from the filtered waveform.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Session time of the peak in seconds.
    pub timestamp: f64,
    /// Filtered amplitude at the peak.
    pub amplitude: f64,
}

/// Output of one offline detection run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detected beats in time order.
    pub beats: Vec<Beat>,
    /// One entry per adjacent beat pair; `None` marks an implausible interval.
    pub heart_rates: Vec<Option<f64>>,
    /// `false` if the band-pass stage was skipped and raw amplitude was searched.
    pub filtered: bool,
}

impl Detection {
    /// Returns the heart rates that passed the plausibility check.
    pub fn valid_heart_rates(&self) -> Vec<f64> {
        self.heart_rates.iter().flatten().copied().collect()
    }

    /// Returns the beat timestamps.
    pub fn beat_times(&self) -> Vec<f64> {
        self.beats.iter().map(|b| b.timestamp).collect()
    }
}

/// Heart-rate classification by average heart rate.
///
/// The thresholds are fixed: below 60 BPM, 60 to 100 BPM inclusive, above 100 BPM.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartRateClass {
    Bradycardia,
    Normal,
    Tachycardia,
}

impl HeartRateClass {
    pub fn from_avg_hr(avg_hr: f64) -> Self {
        if avg_hr < 60.0 {
            HeartRateClass::Bradycardia
        } else if avg_hr <= 100.0 {
            HeartRateClass::Normal
        } else {
            HeartRateClass::Tachycardia
        }
    }

    /// Short description of the condition the class stands for.
    pub fn condition(&self) -> &'static str {
        match self {
            HeartRateClass::Bradycardia => "Below normal",
            HeartRateClass::Normal => "Healthy",
            HeartRateClass::Tachycardia => "Above normal",
        }
    }
}

impl fmt::Display for HeartRateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HeartRateClass::Bradycardia => "Bradycardia (slow)",
            HeartRateClass::Normal => "Normal",
            HeartRateClass::Tachycardia => "Tachycardia (fast)",
        };
        f.write_str(label)
    }
}

/// Heart-rate and variability statistics of one analysis run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HrvReport {
    /// Average heart rate over valid intervals (BPM).
    pub avg_hr: f64,
    pub min_hr: f64,
    pub max_hr: f64,
    /// Population standard deviation of the valid heart rates.
    pub std_hr: f64,
    pub beats_detected: usize,
    pub valid_beats: usize,
    /// Root Mean Square of Successive Differences (ms).
    pub rmssd: f64,
    /// Standard deviation of RR intervals (ms).
    pub sdnn: f64,
    /// Mean RR interval (ms).
    pub avg_rr: f64,
    pub classification: HeartRateClass,
    pub condition: String,
    /// Detected beat times in seconds.
    pub beat_times: Vec<f64>,
    /// RR intervals in milliseconds.
    pub rr_intervals: Vec<f64>,
    /// Wall-clock time the analysis finished.
    #[serde(with = "time::serde::rfc3339")]
    pub analyzed_at: OffsetDateTime,
}

/// Why no report could be produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("not enough data for analysis: {have} samples, at least {need} required")]
    InsufficientSamples { have: usize, need: usize },
    #[error("at least {need} heart beats required: detected {detected}, valid {valid}")]
    InsufficientBeats {
        detected: usize,
        valid: usize,
        need: usize,
    },
    #[error("analysis task failed: {0}")]
    TaskFailed(String),
}
