//! Sample Model
//!
//! This module defines the records delivered by the sensor stream and the
//! timestamped samples the session stores.
//!
//! A sensor record is one text line of the form `AC THRESHOLD BEAT`, three
//! whitespace separated integers. Additional trailing fields are ignored.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Error for a sensor line that cannot be turned into a [`SensorRecord`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SampleParseError {
    /// The line has fewer than three fields.
    #[error("expected 3 fields, got {0}")]
    MissingFields(usize),
    /// One of the fields is not an integer.
    #[error("field `{field}` is not an integer: {value:?}")]
    NotAnInteger { field: &'static str, value: String },
}

/// One untimed `(amplitude, threshold, beat flag)` triple as sent by the device.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// AC amplitude of the PPG signal.
    pub amplitude: i64,
    /// The device's running comparison threshold.
    pub threshold: i64,
    /// Beat flag as sent; any positive value marks a beat.
    pub beat_marker: i64,
}

impl SensorRecord {
    pub fn new(amplitude: i64, threshold: i64, beat: bool) -> Self {
        Self {
            amplitude,
            threshold,
            beat_marker: beat as i64,
        }
    }

    /// Returns `true` if the device flagged a heartbeat on this record.
    pub fn is_beat(&self) -> bool {
        self.beat_marker > 0
    }

    /// Stamps the record with the session time it was received at.
    pub fn at(&self, timestamp: f64) -> Sample {
        Sample {
            timestamp,
            amplitude: self.amplitude as f64,
            threshold: self.threshold as f64,
            beat: self.is_beat(),
        }
    }
}

impl FromStr for SensorRecord {
    type Err = SampleParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(SampleParseError::MissingFields(fields.len()));
        }
        let parse = |field: &'static str, value: &str| {
            value
                .parse::<i64>()
                .map_err(|_| SampleParseError::NotAnInteger {
                    field,
                    value: value.to_owned(),
                })
        };
        Ok(Self {
            amplitude: parse("amplitude", fields[0])?,
            threshold: parse("threshold", fields[1])?,
            beat_marker: parse("beat", fields[2])?,
        })
    }
}

/// A timestamped sensor sample. Immutable once produced.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the session started.
    pub timestamp: f64,
    pub amplitude: f64,
    pub threshold: f64,
    pub beat: bool,
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AC: {:.0}, Beat: {}, Time: {:.2}s",
            self.amplitude,
            if self.beat { "yes" } else { "no" },
            self.timestamp
        )
    }
}
