//! Data Acquisition
//!
//! This module defines the task that reads sensor records from a source and
//! feeds them into a session. It runs concurrently with presentation and stops
//! cooperatively through a shared flag.

use crate::{
    api::controller::{SampleSource, SessionApi},
    model::sample::SensorRecord,
};
use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, trace, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, Lines},
    task::JoinHandle,
    time::timeout,
};

/// A [`SampleSource`] reading newline separated records from any buffered reader
/// (a serial device file, a pipe, stdin).
pub struct LineSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> SampleSource for LineSource<R> {
    async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }
}

/// Counters of one acquisition run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionStats {
    /// Parsed records handed to the session.
    pub records: usize,
    /// Unparsable records.
    pub dropped: usize,
    /// Reads that hit the timeout.
    pub timeouts: usize,
}

/// The acquisition task.
///
/// # Type Parameters
/// * `S` - The source of text records.
/// * `T` - The session receiving the parsed records.
pub struct Acquisition<S: SampleSource, T: SessionApi> {
    source: S,
    session: T,
    stop: Arc<AtomicBool>,
    read_timeout: Duration,
}

impl<S, T> Acquisition<S, T>
where
    S: SampleSource + 'static,
    T: SessionApi + Send + Sync + 'static,
{
    pub fn new(source: S, session: T, read_timeout: Duration) -> Self {
        Self {
            source,
            session,
            stop: Arc::new(AtomicBool::new(false)),
            read_timeout,
        }
    }

    /// The flag that ends the loop once set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Reads until the stream ends, the stop flag is set or the source fails.
    ///
    /// A read timeout is transient and the loop continues. Unparsable records
    /// are dropped and counted. Source errors end the run.
    pub async fn run(mut self) -> Result<AcquisitionStats> {
        let mut stats = AcquisitionStats::default();
        info!("acquisition started");
        while !self.stop.load(Ordering::Acquire) {
            let line = match timeout(self.read_timeout, self.source.next_line()).await {
                Err(_) => {
                    trace!("source read timed out");
                    stats.timeouts += 1;
                    continue;
                }
                Ok(Err(e)) => {
                    error!("source read failed: {}", e);
                    return Err(e);
                }
                Ok(Ok(None)) => {
                    info!("end of stream");
                    break;
                }
                Ok(Ok(Some(line))) => line,
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<SensorRecord>() {
                Ok(record) => {
                    self.session.record(record).await?;
                    stats.records += 1;
                }
                Err(e) => {
                    warn!("dropping record {:?}: {}", line, e);
                    self.session.record_dropped().await;
                    stats.dropped += 1;
                }
            }
        }
        info!(
            "acquisition finished: {} records, {} dropped",
            stats.records, stats.dropped
        );
        Ok(stats)
    }

    /// Runs the task on the tokio runtime.
    ///
    /// # Returns
    /// The stop flag and the handle of the spawned task.
    pub fn spawn(self) -> (Arc<AtomicBool>, JoinHandle<Result<AcquisitionStats>>) {
        let stop = self.stop_flag();
        (stop, tokio::spawn(self.run()))
    }
}
