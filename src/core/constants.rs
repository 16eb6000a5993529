//! Session-wide default constants.
//!
//! Every value here is the default of a field in [`crate::model::config::PulseConfig`].

/// Seconds the sensor needs after `start` before its readings are trusted.
pub const SETTLING_DURATION: f64 = 4.0;
/// Number of eligible samples per aggregate record (~1s at 50 Hz).
pub const BUFFER_SIZE: usize = 50;
/// Keep one of every `DOWNSAMPLE_RATE` buffered samples as raw reference.
pub const DOWNSAMPLE_RATE: usize = 10;
/// Number of most recent samples the online estimator searches for beat flags.
pub const ONLINE_WINDOW: usize = 10;
/// Nominal sampling rate of the sensor stream in Hz.
pub const SAMPLING_RATE_HZ: f64 = 50.0;

/// Lower plausibility bound for heart rates (BPM).
pub const MIN_HEART_RATE: f64 = 40.0;
/// Upper plausibility bound for heart rates (BPM).
pub const MAX_HEART_RATE: f64 = 200.0;

/// Band-pass lower cutoff (Hz).
pub const BANDPASS_LOW_HZ: f64 = 0.5;
/// Band-pass upper cutoff (Hz).
pub const BANDPASS_HIGH_HZ: f64 = 5.0;
/// Butterworth prototype order.
pub const BANDPASS_ORDER: usize = 4;

/// Minimum filtered amplitude of an accepted peak.
pub const MIN_PEAK_HEIGHT: f64 = 80.0;
/// Minimum distance between accepted peaks in samples (~0.4s at 50 Hz).
pub const MIN_PEAK_DISTANCE: usize = 15;
/// Minimum prominence of an accepted peak.
pub const MIN_PEAK_PROMINENCE: f64 = 10.0;

/// Below this many raw samples the detector returns nothing.
pub const MIN_DETECTION_SAMPLES: usize = 50;
/// Below this many raw samples the analyzer reports insufficient data.
pub const MIN_ANALYSIS_SAMPLES: usize = 100;
/// Minimum number of valid heart rates for a report.
pub const MIN_VALID_HEART_RATES: usize = 2;

/// Read timeout of a single source read, in milliseconds.
pub const READ_TIMEOUT_MS: u64 = 1000;
