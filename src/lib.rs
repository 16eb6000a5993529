//! Pulse Analysis Library
//!
//! Processes the stream of a PPG pulse sensor into live heart-rate readings,
//! a compact aggregated history and a batch heart-rate-variability report.
//! Sensor transport and presentation live outside this crate; they talk to a
//! [`components::session::SessionCoordinator`] through the traits in [`api`].

/// Core utilities used throughout the crate.
pub mod core {
    /// Default values of all tunable parameters.
    pub mod constants;
    /// Events published on a session's broadcast bus.
    pub mod events;
}

/// Traits at the seams of the session.
pub mod api {
    /// Mutating session APIs and external collaborator traits.
    pub mod controller;
    /// Read-only session snapshots.
    pub mod model;
}

/// Numerical building blocks.
pub mod math {
    /// Zero-phase Butterworth band-pass filtering.
    pub mod filter;
    /// HRV statistics.
    pub mod hrv;
    /// Constrained peak search.
    pub mod peaks;
}

/// Data models representing the domain.
pub mod model {
    /// Aggregate records and down-sampled samples.
    pub mod aggregate;
    /// Runtime configuration.
    pub mod config;
    /// Beat detections and HRV reports.
    pub mod hrv;
    /// Sensor records and samples.
    pub mod sample;
    /// Session phase, counters and summary.
    pub mod session;
}

/// The processing pipeline and its collaborators.
pub mod components {
    /// Task reading records from a source into a session.
    pub mod acquisition;
    /// Windowed aggregation of eligible samples.
    pub mod aggregator;
    /// HRV report computation.
    pub mod analyzer;
    /// Offline beat detection on the raw waveform.
    pub mod detector;
    /// Live BPM from device beat flags.
    pub mod estimator;
    /// JSON, CSV and text export.
    pub mod export;
    /// Settling period state machine.
    pub mod gate;
    /// Session lifecycle and shared state.
    pub mod session;
    /// Synthetic sensor for running without hardware.
    #[cfg(feature = "mock")]
    pub mod simulator;
    /// JSON-lines measurement store.
    pub mod storage;
}
