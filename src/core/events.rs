//! Core Events
//!
//! This module defines the events published by a session on its broadcast bus.
//! Presentation and maintenance tasks subscribe to them instead of polling the
//! session for every change.

use crate::model::{aggregate::AggregateRecord, hrv::HrvReport};

/// Enumeration of all session-level events.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A session was started; settling begins at the contained session time.
    Started(f64),

    /// The settling period elapsed; samples are now eligible.
    Ready(f64),

    /// A live BPM reading from the online estimator.
    ///
    /// # Fields
    /// - `timestamp`: Session time of the beat that produced the reading.
    /// - `bpm`: The reading.
    Bpm { timestamp: f64, bpm: f64 },

    /// The aggregation window was flushed into a new record.
    AggregateFlushed(AggregateRecord),

    /// The session was stopped. Contains the number of raw samples.
    Stopped(usize),

    /// An offline analysis finished and its report is now current.
    AnalysisFinished(Box<HrvReport>),

    /// An offline analysis could not produce a report.
    AnalysisFailed(String),

    /// All session data was cleared.
    Reset,
}
