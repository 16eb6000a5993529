//! Offline Batch Detector
//!
//! Re-derives beats from the raw amplitude waveform, independent of the device
//! flags: zero-phase band-pass filtering followed by a constrained peak search.
//! Detection never fails. When the band-pass stage is unusable the raw
//! amplitude is searched instead and the result is marked unfiltered.

use crate::{
    math::{
        filter::{BandpassFilter, FilterError},
        peaks::{find_peaks, PeakConstraints},
    },
    model::{
        config::DetectionConfig,
        hrv::{Beat, Detection},
        sample::Sample,
    },
};
use log::{debug, warn};

#[derive(Debug, Clone)]
pub struct OfflineBeatDetector {
    config: DetectionConfig,
    filter: Result<BandpassFilter, FilterError>,
}

impl OfflineBeatDetector {
    pub fn new(config: DetectionConfig, sampling_rate_hz: f64) -> Self {
        let filter = BandpassFilter::butterworth(
            config.filter_order,
            config.bandpass_low_hz,
            config.bandpass_high_hz,
            sampling_rate_hz,
        );
        if let Err(e) = &filter {
            warn!("band-pass design failed, detection runs on raw amplitude: {}", e);
        }
        Self { config, filter }
    }

    fn constraints(&self) -> PeakConstraints {
        PeakConstraints {
            min_height: self.config.min_peak_height,
            min_distance: self.config.min_peak_distance,
            min_prominence: self.config.min_peak_prominence,
        }
    }

    /// Band-passes the amplitude channel, falling back to the raw values.
    fn prepare(&self, amplitude: Vec<f64>) -> (Vec<f64>, bool) {
        let result = self
            .filter
            .as_ref()
            .map_err(Clone::clone)
            .and_then(|filter| filter.filtfilt(&amplitude));
        match result {
            Ok(filtered) => (filtered, true),
            Err(e) => {
                warn!("filtering skipped, using raw amplitude: {}", e);
                (amplitude, false)
            }
        }
    }

    /// Detects beats in `samples` and derives one heart rate per adjacent pair.
    pub fn detect(&self, samples: &[Sample]) -> Detection {
        if samples.len() < self.config.min_detection_samples {
            debug!(
                "skipping detection: {} samples, {} required",
                samples.len(),
                self.config.min_detection_samples
            );
            return Detection::default();
        }

        let amplitude: Vec<f64> = samples.iter().map(|s| s.amplitude).collect();
        let (signal, filtered) = self.prepare(amplitude);
        let peaks = find_peaks(&signal, &self.constraints());

        let beats: Vec<Beat> = peaks
            .iter()
            .map(|&idx| Beat {
                timestamp: samples[idx].timestamp,
                amplitude: signal[idx],
            })
            .collect();

        let heart_rates: Vec<Option<f64>> = beats
            .windows(2)
            .map(|pair| {
                let dt = pair[1].timestamp - pair[0].timestamp;
                if dt <= 0.0 {
                    return None;
                }
                let bpm = 60.0 / dt;
                self.config.is_plausible(bpm).then_some(bpm)
            })
            .collect();

        debug!(
            "detected {} beats ({} plausible intervals), filtered: {}",
            beats.len(),
            heart_rates.iter().flatten().count(),
            filtered
        );
        Detection {
            beats,
            heart_rates,
            filtered,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// 50 Hz PPG-like sinusoid with a peak every 0.8 s.
    pub(crate) fn synthetic_series(seconds: f64) -> Vec<Sample> {
        let fs = 50.0;
        let n = (seconds * fs) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                Sample {
                    timestamp: t,
                    amplitude: 500.0 + 200.0 * (2.0 * PI * 1.25 * t).sin(),
                    threshold: 500.0,
                    beat: false,
                }
            })
            .collect()
    }

    #[test]
    fn test_sinusoid_gives_regular_beats() {
        let detector = OfflineBeatDetector::new(DetectionConfig::default(), 50.0);
        let detection = detector.detect(&synthetic_series(10.0));
        assert!(detection.filtered);
        assert!(detection.beats.len() >= 10, "{} beats", detection.beats.len());
        let rates = detection.valid_heart_rates();
        assert_eq!(rates.len(), detection.beats.len() - 1);
        for bpm in rates {
            assert!((bpm - 75.0).abs() <= 5.0, "bpm {}", bpm);
        }
    }

    #[test]
    fn test_short_series_is_empty() {
        let detector = OfflineBeatDetector::new(DetectionConfig::default(), 50.0);
        let detection = detector.detect(&synthetic_series(0.9));
        assert!(detection.beats.is_empty());
        assert!(detection.heart_rates.is_empty());
    }

    #[test]
    fn test_bad_band_falls_back_to_raw() {
        let config = DetectionConfig {
            bandpass_high_hz: 40.0,
            ..DetectionConfig::default()
        };
        let detector = OfflineBeatDetector::new(config, 50.0);
        let detection = detector.detect(&synthetic_series(10.0));
        assert!(!detection.filtered);
        assert!(detection.beats.len() >= 10);
        // raw peaks sit on top of the DC offset
        assert!(detection.beats.iter().all(|b| b.amplitude > 650.0));
    }

    #[test]
    fn test_implausible_interval_is_none() {
        let config = DetectionConfig {
            max_heart_rate: 70.0,
            ..DetectionConfig::default()
        };
        let detector = OfflineBeatDetector::new(config, 50.0);
        let detection = detector.detect(&synthetic_series(10.0));
        assert!(!detection.beats.is_empty());
        assert!(detection.heart_rates.iter().all(Option::is_none));
    }
}
