//! Aggregate Model
//!
//! Compact summaries produced by the stream aggregator. These are what the
//! session keeps for export instead of the full-rate stream.

use super::sample::Sample;
use serde::{Deserialize, Serialize};

/// Summary of one flushed aggregation window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub time_start: f64,
    pub time_end: f64,
    pub time_avg: f64,
    /// `time_end - time_start`.
    pub duration: f64,
    pub ac_avg: f64,
    pub ac_min: f64,
    pub ac_max: f64,
    /// Population standard deviation of the amplitude.
    pub ac_std: f64,
    pub threshold_avg: f64,
    pub beat_count: usize,
    pub sample_count: usize,
}

/// A raw sample retained by the down-sampler.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DownsampledSample {
    pub time: f64,
    pub ac: f64,
    pub threshold: f64,
    pub beat: bool,
}

impl From<&Sample> for DownsampledSample {
    fn from(sample: &Sample) -> Self {
        Self {
            time: sample.timestamp,
            ac: sample.amplitude,
            threshold: sample.threshold,
            beat: sample.beat,
        }
    }
}
