//! Controller Module
//!
//! This module defines the traits through which a session is driven and through
//! which it talks to its external collaborators: the sample source feeding it
//! and the persistence layer receiving the results.
use crate::model::{hrv::HrvReport, sample::SensorRecord, session::SessionSummary};
use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;

/// RecordingApi trait
///
/// This trait defines the asynchronous API for managing the recording process.
/// It provides methods to start and stop a session.
#[async_trait]
pub trait RecordingApi {
    /// Start the recording process; settling begins immediately.
    async fn start_recording(&self) -> Result<()>;
    /// Stop the recording process.
    ///
    /// Flushes the partial aggregation window and, if enough samples exist,
    /// spawns the offline analysis. The returned handle resolves once that
    /// analysis is done.
    async fn stop_recording(&self) -> Result<Option<JoinHandle<()>>>;
}

/// SessionApi trait
///
/// This trait defines the mutating operations on a session besides start/stop.
#[async_trait]
pub trait SessionApi {
    /// Record one sensor triple at the current session time.
    ///
    /// Ignored while the session is idle.
    async fn record(&self, record: SensorRecord) -> Result<()>;

    /// Count one record that was dropped because it could not be parsed.
    async fn record_dropped(&self);

    /// Run offline detection and HRV analysis on the raw series.
    ///
    /// # Returns
    /// The new report, which also becomes the current one.
    async fn analyze(&self) -> Result<HrvReport>;

    /// Clear all session data. Waits for an in-flight analysis to finish.
    async fn reset(&self) -> Result<()>;
}

/// SampleSource trait
///
/// The streaming transport delivering one text record per call.
#[async_trait]
pub trait SampleSource: Send {
    /// Read the next line.
    ///
    /// # Returns
    /// `Ok(None)` at the end of the stream.
    async fn next_line(&mut self) -> Result<Option<String>>;
}

#[async_trait]
impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    async fn next_line(&mut self) -> Result<Option<String>> {
        (**self).next_line().await
    }
}

/// PersistenceApi trait
///
/// Receives the measurement metadata and the analysis of a finished session.
/// Raw samples and aggregates are never handed over.
#[async_trait]
pub trait PersistenceApi: Send + Sync {
    /// Store one measurement.
    ///
    /// # Arguments
    /// * `summary` - Measurement metadata.
    /// * `report` - The analysis, if one could be computed.
    /// * `report_text` - The rendered report.
    async fn store(
        &self,
        summary: SessionSummary,
        report: Option<HrvReport>,
        report_text: String,
    ) -> Result<()>;
}
