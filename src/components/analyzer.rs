//! HRV / Statistics Analyzer
//!
//! Turns an offline detection into an [`HrvReport`].

use crate::{
    core::constants::{MIN_ANALYSIS_SAMPLES, MIN_VALID_HEART_RATES},
    math::hrv::{calc_rmssd, calc_sdnn, mean, population_std, rr_intervals_ms},
    model::hrv::{AnalysisError, Detection, HeartRateClass, HrvReport},
};
use log::info;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy)]
pub struct HrvAnalyzer {
    min_samples: usize,
    min_valid_rates: usize,
}

impl HrvAnalyzer {
    pub fn new(min_samples: usize, min_valid_rates: usize) -> Self {
        Self {
            min_samples,
            min_valid_rates,
        }
    }

    /// Computes the report for a detection made on `raw_sample_count` samples.
    pub fn analyze(
        &self,
        raw_sample_count: usize,
        detection: &Detection,
    ) -> Result<HrvReport, AnalysisError> {
        if raw_sample_count < self.min_samples {
            return Err(AnalysisError::InsufficientSamples {
                have: raw_sample_count,
                need: self.min_samples,
            });
        }
        let rates = detection.valid_heart_rates();
        if rates.len() < self.min_valid_rates {
            return Err(AnalysisError::InsufficientBeats {
                detected: detection.beats.len(),
                valid: rates.len(),
                need: self.min_valid_rates,
            });
        }

        let beat_times = detection.beat_times();
        let rr_intervals = rr_intervals_ms(&beat_times);
        let avg_hr = mean(&rates);
        let classification = HeartRateClass::from_avg_hr(avg_hr);

        let report = HrvReport {
            avg_hr,
            min_hr: rates.iter().copied().fold(f64::INFINITY, f64::min),
            max_hr: rates.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std_hr: population_std(&rates),
            beats_detected: detection.beats.len(),
            valid_beats: rates.len(),
            rmssd: calc_rmssd(&rr_intervals),
            sdnn: calc_sdnn(&rr_intervals),
            avg_rr: mean(&rr_intervals),
            classification,
            condition: classification.condition().to_owned(),
            beat_times,
            rr_intervals,
            analyzed_at: OffsetDateTime::now_utc(),
        };
        info!(
            "analysis: {:.1} BPM avg, RMSSD {:.1} ms, SDNN {:.1} ms, {}",
            report.avg_hr, report.rmssd, report.sdnn, report.classification
        );
        Ok(report)
    }
}

impl Default for HrvAnalyzer {
    fn default() -> Self {
        Self::new(MIN_ANALYSIS_SAMPLES, MIN_VALID_HEART_RATES)
    }
}
