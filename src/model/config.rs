//! Configuration Model
//!
//! Tunable parameters of the acquisition and detection pipeline. Defaults come
//! from [`crate::core::constants`]; a JSON file may override any subset.

use crate::core::constants::*;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Parameters of the live acquisition path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Settling period in seconds.
    pub settling_duration: f64,
    /// Aggregation window in samples.
    pub buffer_size: usize,
    /// Down-sample stride for the raw reference history.
    pub downsample_rate: usize,
    /// Number of recent samples searched by the online estimator.
    pub online_window: usize,
    /// Timeout of a single source read in milliseconds.
    pub read_timeout_ms: u64,
    /// Nominal sampling rate in Hz.
    pub sampling_rate_hz: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            settling_duration: SETTLING_DURATION,
            buffer_size: BUFFER_SIZE,
            downsample_rate: DOWNSAMPLE_RATE,
            online_window: ONLINE_WINDOW,
            read_timeout_ms: READ_TIMEOUT_MS,
            sampling_rate_hz: SAMPLING_RATE_HZ,
        }
    }
}

impl AcquisitionConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Parameters of the offline detector and the HRV analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub bandpass_low_hz: f64,
    pub bandpass_high_hz: f64,
    pub filter_order: usize,
    pub min_peak_height: f64,
    pub min_peak_distance: usize,
    pub min_peak_prominence: f64,
    pub min_heart_rate: f64,
    pub max_heart_rate: f64,
    pub min_detection_samples: usize,
    pub min_analysis_samples: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            bandpass_low_hz: BANDPASS_LOW_HZ,
            bandpass_high_hz: BANDPASS_HIGH_HZ,
            filter_order: BANDPASS_ORDER,
            min_peak_height: MIN_PEAK_HEIGHT,
            min_peak_distance: MIN_PEAK_DISTANCE,
            min_peak_prominence: MIN_PEAK_PROMINENCE,
            min_heart_rate: MIN_HEART_RATE,
            max_heart_rate: MAX_HEART_RATE,
            min_detection_samples: MIN_DETECTION_SAMPLES,
            min_analysis_samples: MIN_ANALYSIS_SAMPLES,
        }
    }
}

impl DetectionConfig {
    /// Checks a heart rate against the plausibility bounds (inclusive).
    pub fn is_plausible(&self, bpm: f64) -> bool {
        (self.min_heart_rate..=self.max_heart_rate).contains(&bpm)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub acquisition: AcquisitionConfig,
    pub detection: DetectionConfig,
}

impl PulseConfig {
    /// Loads a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("could not parse config {}", path.display()))
    }
}
