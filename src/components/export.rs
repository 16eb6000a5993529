//! Export
//!
//! Collects the exportable part of a session into an [`ExportBundle`] and
//! writes it to disk: the bundle as JSON, aggregate and down-sampled histories
//! as CSV tables, and the rendered analysis report as text.

use crate::{
    components::session::SessionCoordinator,
    model::{
        aggregate::{AggregateRecord, DownsampledSample},
        hrv::HrvReport,
        session::{SessionSummary, StorageInfo},
    },
};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use time::{macros::format_description, OffsetDateTime};

/// Number of beat times and RR intervals listed in the report.
const REPORT_LIST_LIMIT: usize = 10;

/// Everything a session exports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub summary: SessionSummary,
    pub storage: StorageInfo,
    pub aggregates: Vec<AggregateRecord>,
    pub downsampled: Vec<DownsampledSample>,
    pub report: Option<HrvReport>,
}

impl ExportBundle {
    /// Snapshots a session. The partial aggregation window is flushed first so
    /// the export covers every eligible sample; a concurrent reset lands either
    /// before or after the whole snapshot.
    pub async fn collect(session: &SessionCoordinator) -> Self {
        session.export_bundle(false).await
    }

    /// The rendered analysis report.
    pub fn report_text(&self) -> String {
        ReportText {
            summary: &self.summary,
            report: self.report.as_ref(),
            storage: self.storage,
        }
        .to_string()
    }

    /// File name stem `pulse_<subject>_<utc timestamp>`.
    pub fn file_stem(&self) -> Result<String> {
        let stamp = OffsetDateTime::now_utc()
            .format(format_description!("[year][month][day]_[hour][minute][second]"))?;
        let subject: String = self
            .summary
            .subject
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let subject = if subject.is_empty() {
            "subject".to_string()
        } else {
            subject
        };
        Ok(format!("pulse_{}_{}", subject, stamp))
    }

    /// Writes the bundle, both tables and the report into `dir`.
    ///
    /// # Returns
    /// The paths of the written files.
    pub async fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("could not create {}", dir.display()))?;
        let stem = self.file_stem()?;

        let json_path = dir.join(format!("{}.json", stem));
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&json_path, json).await?;

        let aggregates_path = dir.join(format!("{}_aggregates.csv", stem));
        let downsampled_path = dir.join(format!("{}_downsampled.csv", stem));
        {
            let subject = self.summary.subject.as_str();
            let aggregates: Vec<AggregateRow> = self
                .aggregates
                .iter()
                .map(|r| AggregateRow::new(subject, r))
                .collect();
            let downsampled: Vec<DownsampledRow> = self
                .downsampled
                .iter()
                .map(|d| DownsampledRow::new(subject, d))
                .collect();
            let aggregates_path = aggregates_path.clone();
            let downsampled_path = downsampled_path.clone();
            tokio::task::spawn_blocking(move || -> Result<()> {
                write_csv(&aggregates_path, &aggregates)?;
                write_csv(&downsampled_path, &downsampled)
            })
            .await??;
        }

        let report_path = dir.join(format!("{}_report.txt", stem));
        tokio::fs::write(&report_path, self.report_text()).await?;

        info!("exported session to {}", dir.display());
        Ok(vec![json_path, aggregates_path, downsampled_path, report_path])
    }
}

/// One row of the aggregate table, tagged with the subject.
#[derive(Debug, Clone, Serialize)]
struct AggregateRow {
    subject: String,
    time_start: f64,
    time_end: f64,
    time_avg: f64,
    duration: f64,
    ac_avg: f64,
    ac_min: f64,
    ac_max: f64,
    ac_std: f64,
    threshold_avg: f64,
    beat_count: usize,
    sample_count: usize,
}

impl AggregateRow {
    fn new(subject: &str, r: &AggregateRecord) -> Self {
        Self {
            subject: subject.to_owned(),
            time_start: r.time_start,
            time_end: r.time_end,
            time_avg: r.time_avg,
            duration: r.duration,
            ac_avg: r.ac_avg,
            ac_min: r.ac_min,
            ac_max: r.ac_max,
            ac_std: r.ac_std,
            threshold_avg: r.threshold_avg,
            beat_count: r.beat_count,
            sample_count: r.sample_count,
        }
    }
}

/// One row of the down-sampled table, tagged with the subject.
#[derive(Debug, Clone, Serialize)]
struct DownsampledRow {
    subject: String,
    time: f64,
    ac: f64,
    threshold: f64,
    beat: bool,
}

impl DownsampledRow {
    fn new(subject: &str, d: &DownsampledSample) -> Self {
        Self {
            subject: subject.to_owned(),
            time: d.time,
            ac: d.ac,
            threshold: d.threshold,
            beat: d.beat,
        }
    }
}

/// Writes `rows` as a comma separated table with a header row.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn rmssd_rating(rmssd: f64) -> &'static str {
    if rmssd > 50.0 {
        "Good"
    } else if rmssd > 20.0 {
        "Attention"
    } else {
        "Low"
    }
}

fn joined(values: &[f64], precision: usize) -> String {
    let mut text = values
        .iter()
        .take(REPORT_LIST_LIMIT)
        .map(|v| format!("{:.*}", precision, v))
        .collect::<Vec<_>>()
        .join(", ");
    if values.len() > REPORT_LIST_LIMIT {
        text.push_str("...");
    }
    text
}

/// Plain-text rendering of a session's analysis.
pub struct ReportText<'a> {
    pub summary: &'a SessionSummary,
    pub report: Option<&'a HrvReport>,
    pub storage: StorageInfo,
}

impl fmt::Display for ReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        let thin = "-".repeat(60);
        let s = self.summary;

        writeln!(f, "{}", rule)?;
        writeln!(f, "    HEART RATE ANALYSIS - {}", s.subject.to_uppercase())?;
        writeln!(f, "{}", rule)?;
        writeln!(f)?;
        writeln!(f, "MEASUREMENT:")?;
        writeln!(f, "  Subject                : {}", s.subject)?;
        writeln!(f, "  Duration               : {:.2} s", s.duration_seconds)?;
        writeln!(f, "  Data points            : {}", s.total_samples)?;
        writeln!(f, "  Aggregate records      : {}", self.storage.aggregates)?;
        writeln!(f, "  Sampling rate          : ~{:.0} Hz", s.sampling_rate_hz)?;
        writeln!(f, "  Storage efficiency     : {:.1}%", self.storage.efficiency())?;
        writeln!(f)?;

        let Some(r) = self.report else {
            writeln!(f, "{}", thin)?;
            writeln!(f, "No analysis available.")?;
            return writeln!(f, "{}", rule);
        };

        writeln!(f, "{}", thin)?;
        writeln!(f, "BEAT DETECTION:")?;
        writeln!(f, "  Beats detected         : {}", r.beats_detected)?;
        writeln!(f, "  Valid beats            : {}", r.valid_beats)?;
        writeln!(f, "  Beat times (s)         : {}", joined(&r.beat_times, 2))?;
        writeln!(f, "  RR intervals (ms)      : {}", joined(&r.rr_intervals, 0))?;
        writeln!(f)?;
        writeln!(f, "{}", thin)?;
        writeln!(f, "HEART RATE:")?;
        writeln!(f, "  Average                : {:.1} BPM", r.avg_hr)?;
        writeln!(f, "  Minimum                : {:.1} BPM", r.min_hr)?;
        writeln!(f, "  Maximum                : {:.1} BPM", r.max_hr)?;
        writeln!(f, "  Standard deviation     : {:.2} BPM", r.std_hr)?;
        writeln!(f, "  Range                  : {:.1} BPM", r.max_hr - r.min_hr)?;
        writeln!(f)?;
        writeln!(f, "{}", thin)?;
        writeln!(f, "HEART RATE VARIABILITY:")?;
        writeln!(f, "  SDNN                   : {:.2} ms", r.sdnn)?;
        writeln!(f, "  RMSSD                  : {:.2} ms", r.rmssd)?;
        writeln!(f, "  Mean RR interval       : {:.1} ms", r.avg_rr)?;
        writeln!(
            f,
            "  RMSSD rating           : {:.1} ms ({})",
            r.rmssd,
            rmssd_rating(r.rmssd)
        )?;
        writeln!(f)?;
        writeln!(f, "{}", thin)?;
        writeln!(f, "CLASSIFICATION:")?;
        writeln!(f, "  Category               : {}", r.classification)?;
        writeln!(f, "  Condition              : {}", r.condition)?;
        writeln!(
            f,
            "  Health status          : {}",
            if (60.0..=100.0).contains(&r.avg_hr) {
                "Normal"
            } else {
                "Needs attention"
            }
        )?;
        writeln!(f)?;
        writeln!(f, "{}", thin)?;
        writeln!(f, "STORAGE:")?;
        writeln!(f, "  Raw samples            : {}", self.storage.raw_samples)?;
        writeln!(f, "  Aggregate records      : {}", self.storage.aggregates)?;
        writeln!(f, "  Down-sampled samples   : {}", self.storage.downsampled)?;
        writeln!(f)?;
        writeln!(f, "{}", rule)?;
        let finished = r
            .analyzed_at
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .map_err(|_| fmt::Error)?;
        writeln!(f, "Analysis of {} finished at {} UTC", s.subject, finished)?;
        writeln!(f, "Span: 0.00 - {:.2} s", s.duration_seconds)?;
        writeln!(f, "{}", rule)
    }
}
