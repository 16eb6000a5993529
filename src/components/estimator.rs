//! Online Beat Estimator
//!
//! Produces immediate BPM readings from the device's own beat flags. No
//! filtering is applied; implausible intervals are silently discarded.

use crate::model::sample::Sample;
use log::trace;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct OnlineBeatEstimator {
    window: VecDeque<Sample>,
    capacity: usize,
    min_bpm: f64,
    max_bpm: f64,
}

impl OnlineBeatEstimator {
    pub fn new(capacity: usize, min_bpm: f64, max_bpm: f64) -> Self {
        let capacity = capacity.max(2);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            min_bpm,
            max_bpm,
        }
    }

    /// Feeds one eligible sample. Returns a BPM reading when the sample is a
    /// flagged beat and the interval to the previous flagged beat in the
    /// window is plausible.
    pub fn on_sample(&mut self, sample: &Sample) -> Option<f64> {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(*sample);

        if !sample.beat {
            return None;
        }

        let mut flagged = self.window.iter().rev().filter(|s| s.beat);
        let t0 = flagged.next()?.timestamp;
        let t1 = flagged.next()?.timestamp;
        if t0 <= t1 {
            return None;
        }

        let bpm = 60.0 / (t0 - t1);
        if (self.min_bpm..=self.max_bpm).contains(&bpm) {
            trace!("online reading {:.1} BPM", bpm);
            Some(bpm)
        } else {
            trace!("discarded online reading {:.1} BPM", bpm);
            None
        }
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, beat: bool) -> Sample {
        Sample {
            timestamp: t,
            amplitude: 0.0,
            threshold: 0.0,
            beat,
        }
    }

    #[test]
    fn test_reading_from_two_flags() {
        let mut est = OnlineBeatEstimator::new(10, 40.0, 200.0);
        assert_eq!(est.on_sample(&sample(0.0, true)), None);
        for i in 1..5 {
            assert_eq!(est.on_sample(&sample(i as f64 * 0.2, false)), None);
        }
        let bpm = est.on_sample(&sample(1.0, true)).unwrap();
        assert!((bpm - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_fast_is_discarded() {
        let mut est = OnlineBeatEstimator::new(10, 40.0, 200.0);
        est.on_sample(&sample(0.0, true));
        assert_eq!(est.on_sample(&sample(0.1, true)), None);
    }

    #[test]
    fn test_previous_flag_outside_window_gives_nothing() {
        let mut est = OnlineBeatEstimator::new(10, 40.0, 200.0);
        est.on_sample(&sample(0.0, true));
        for i in 1..10 {
            est.on_sample(&sample(i as f64 * 0.1, false));
        }
        // window is now full; the next sample evicts the flag at 0.0
        assert_eq!(est.on_sample(&sample(1.0, true)), None);
    }

    #[test]
    fn test_non_increasing_timestamps_ignored() {
        let mut est = OnlineBeatEstimator::new(10, 40.0, 200.0);
        est.on_sample(&sample(1.0, true));
        assert_eq!(est.on_sample(&sample(1.0, true)), None);
    }
}
