//! HRV (Heart Rate Variability) Computation
//!
//! This module contains functions for the statistics the analyzer and the
//! aggregator need. Inputs are plain slices; RR intervals are in milliseconds.

use log::trace;
use nalgebra::DVector;

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    DVector::from_row_slice(data).mean()
}

/// Population standard deviation, 0 for an empty slice.
pub fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    DVector::from_row_slice(data).variance().sqrt()
}

/// `calc_rmssd` function.
///
/// Calculates RMSSD (Root Mean Square of Successive Differences).
///
/// # Arguments
/// - `data`: A slice of RR intervals in milliseconds.
///
/// # Returns
/// RMSSD value as a `f64`, or 0 if fewer than two intervals are given.
pub fn calc_rmssd(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    let rr_points_a = DVector::from_row_slice(&data[0..data.len() - 1]);
    let rr_points_b = DVector::from_row_slice(&data[1..]);
    let successive_diffs = rr_points_b - rr_points_a;

    trace!(
        "Calculating RMSSD with successive differences: {:?}",
        successive_diffs
    );
    (successive_diffs.dot(&successive_diffs) / (successive_diffs.len() as f64)).sqrt()
}

/// `calc_sdnn` function.
///
/// Calculates SDNN, the population standard deviation of the RR intervals.
///
/// # Returns
/// SDNN value as a `f64`, or 0 if fewer than two intervals are given.
pub fn calc_sdnn(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    let variance = DVector::from_row_slice(data).variance();
    trace!("Calculating SDNN with variance: {}", variance);
    variance.sqrt()
}

/// Converts beat timestamps (seconds) into RR intervals (milliseconds).
pub fn rr_intervals_ms(beat_times: &[f64]) -> Vec<f64> {
    beat_times
        .windows(2)
        .map(|win| (win[1] - win[0]) * 1000.0)
        .collect()
}
