//! This module defines the read only API for interacting with a session.
//! Presentation, export and persistence use it to take snapshots; none of the
//! methods mutate the session.
use async_trait::async_trait;
use std::fmt::Debug;

use crate::model::{
    aggregate::{AggregateRecord, DownsampledSample},
    hrv::HrvReport,
    sample::Sample,
    session::{LiveCounters, SessionState, SessionSummary},
};

/// `SessionModelApi` trait.
///
/// Snapshots are copies; they do not track later changes to the session.
#[async_trait]
pub trait SessionModelApi: Debug + Send + Sync {
    /// Retrieves the settling gate state.
    async fn get_state(&self) -> SessionState;

    /// Retrieves the live counters polled by status displays.
    async fn get_counters(&self) -> LiveCounters;

    /// Retrieves the full raw series.
    ///
    /// # Returns
    /// A copy of all samples received since the last reset.
    async fn get_raw_series(&self) -> Vec<Sample>;

    /// Retrieves the aggregate history.
    async fn get_aggregates(&self) -> Vec<AggregateRecord>;

    /// Retrieves the down-sampled history.
    async fn get_downsampled(&self) -> Vec<DownsampledSample>;

    /// Retrieves every accepted live reading as `[timestamp, bpm]`.
    async fn get_bpm_history(&self) -> Vec<[f64; 2]>;

    /// Retrieves the most recent analysis, if any.
    async fn get_report(&self) -> Option<HrvReport>;

    /// Retrieves the measurement metadata.
    async fn get_summary(&self) -> SessionSummary;

    /// Storage efficiency of the aggregate history in percent.
    ///
    /// # Returns
    /// `(1 - aggregates / max(1, raw samples)) * 100`
    async fn get_storage_efficiency(&self) -> f64;
}
