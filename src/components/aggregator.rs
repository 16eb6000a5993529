//! Stream Buffer & Aggregator
//!
//! Turns the full-rate stream of eligible samples into compact per-window
//! summaries plus a sparse down-sampled reference history. Windows are closed
//! by sample count; a partial window is only flushed on request.

use crate::{
    math::hrv::{mean, population_std},
    model::{
        aggregate::{AggregateRecord, DownsampledSample},
        sample::Sample,
    },
};
use log::{debug, trace};

#[derive(Debug, Clone)]
pub struct StreamAggregator {
    capacity: usize,
    downsample_rate: usize,
    buffer: Vec<Sample>,
    records: Vec<AggregateRecord>,
    downsampled: Vec<DownsampledSample>,
}

impl StreamAggregator {
    /// Creates an aggregator flushing every `capacity` samples and keeping every
    /// `downsample_rate`-th buffered sample. Zero values act as 1.
    pub fn new(capacity: usize, downsample_rate: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            downsample_rate: downsample_rate.max(1),
            buffer: Vec::with_capacity(capacity),
            records: Vec::new(),
            downsampled: Vec::new(),
        }
    }

    /// Buffers an eligible sample. Returns the record if this sample filled the window.
    pub fn offer(&mut self, sample: Sample) -> Option<AggregateRecord> {
        trace!("buffering sample at {:.3}s", sample.timestamp);
        self.buffer.push(sample);
        if self.buffer.len() >= self.capacity {
            self.flush()
        } else {
            None
        }
    }

    /// Summarizes and drains the buffer. A no-op returning `None` when empty.
    pub fn flush(&mut self) -> Option<AggregateRecord> {
        let (first, last) = match (self.buffer.first(), self.buffer.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => return None,
        };

        let times: Vec<f64> = self.buffer.iter().map(|s| s.timestamp).collect();
        let ac: Vec<f64> = self.buffer.iter().map(|s| s.amplitude).collect();
        let thresholds: Vec<f64> = self.buffer.iter().map(|s| s.threshold).collect();

        let record = AggregateRecord {
            time_start: first,
            time_end: last,
            time_avg: mean(&times),
            duration: last - first,
            ac_avg: mean(&ac),
            ac_min: ac.iter().copied().fold(f64::INFINITY, f64::min),
            ac_max: ac.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ac_std: population_std(&ac),
            threshold_avg: mean(&thresholds),
            beat_count: self.buffer.iter().filter(|s| s.beat).count(),
            sample_count: self.buffer.len(),
        };

        self.downsampled.extend(
            self.buffer
                .iter()
                .step_by(self.downsample_rate)
                .map(DownsampledSample::from),
        );
        self.buffer.clear();

        debug!(
            "flushed aggregate {:.2}s..{:.2}s: {} samples, {} beats",
            record.time_start, record.time_end, record.sample_count, record.beat_count
        );
        self.records.push(record.clone());
        Some(record)
    }

    pub fn records(&self) -> &[AggregateRecord] {
        &self.records
    }

    pub fn downsampled(&self) -> &[DownsampledSample] {
        &self.downsampled
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drops the buffer and both histories.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.records.clear();
        self.downsampled.clear();
    }
}
