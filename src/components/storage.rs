//! Measurement Storage
//!
//! A file-backed [`PersistenceApi`] keeping one JSON document per line. Each
//! line is one finished measurement: its summary, its analysis (if any) and
//! the rendered report. Raw samples never reach this store.

use std::path::{Path, PathBuf};

use crate::{
    api::controller::PersistenceApi,
    components::{export::ExportBundle, session::SessionCoordinator},
    model::{hrv::HrvReport, session::SessionSummary},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{macros::format_description, OffsetDateTime};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use uuid::Uuid;

/// One persisted measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMeasurement {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub stored_at: OffsetDateTime,
    pub summary: SessionSummary,
    pub analysis: Option<HrvReport>,
    pub report_text: String,
}

impl fmt::Display for StoredMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stored = self
            .stored_at
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
            .map_err(|_| fmt::Error)?;
        write!(
            f,
            "{}  {:<16} {:>7.1} s {:>6} samples",
            stored,
            self.summary.subject,
            self.summary.duration_seconds,
            self.summary.total_samples
        )?;
        match &self.analysis {
            Some(r) => write!(
                f,
                "  {:>5.1} BPM  RMSSD {:>6.1} ms  SDNN {:>6.1} ms  {}",
                r.avg_hr, r.rmssd, r.sdnn, r.classification
            ),
            None => f.write_str("  no analysis"),
        }
    }
}

/// Append-only JSON-lines measurement store.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    /// Keeps concurrent appends from interleaving.
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every stored measurement. A missing file is an empty store.
    pub async fn load_all(&self) -> Result<Vec<StoredMeasurement>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        tokio::task::spawn_blocking(move || {
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .enumerate()
                .map(|(n, line)| {
                    serde_json::from_str(line)
                        .with_context(|| format!("invalid measurement on line {}", n + 1))
                })
                .collect::<Result<Vec<StoredMeasurement>>>()
        })
        .await?
    }
}

#[async_trait]
impl PersistenceApi for JsonLinesStore {
    async fn store(
        &self,
        summary: SessionSummary,
        report: Option<HrvReport>,
        report_text: String,
    ) -> Result<()> {
        let measurement = StoredMeasurement {
            id: Uuid::new_v4(),
            stored_at: OffsetDateTime::now_utc(),
            summary,
            analysis: report,
            report_text,
        };
        let mut line = serde_json::to_string(&measurement)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("could not open {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        info!(
            "stored measurement {} of {:?}",
            measurement.id, measurement.summary.subject
        );
        Ok(())
    }
}

/// Hands a session's summary and analysis to `store`.
///
/// The partial aggregation window is flushed first. If the session has no
/// report yet the analysis is run on demand; a failed analysis is stored as
/// absent. Summary and analysis always describe the same session, even with
/// a concurrent reset.
pub async fn persist_session<P>(session: &SessionCoordinator, store: &P) -> Result<()>
where
    P: PersistenceApi + ?Sized,
{
    let bundle: ExportBundle = session.export_bundle(true).await;
    let text = bundle.report_text();
    store.store(bundle.summary, bundle.report, text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{components::session::tests::feed, model::config::PulseConfig};
    use mockall::{mock, predicate::*};
    use tempdir::TempDir;

    mock! {
        Store {}
        #[async_trait]
        impl PersistenceApi for Store {
            async fn store(
                &self,
                summary: SessionSummary,
                report: Option<HrvReport>,
                report_text: String,
            ) -> Result<()>;
        }
    }

    fn summary(subject: &str) -> SessionSummary {
        SessionSummary {
            subject: subject.to_string(),
            duration_seconds: 30.0,
            total_samples: 1500,
            sampling_rate_hz: 50.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let dir = TempDir::new("pulse-store").unwrap();
        let store = JsonLinesStore::new(dir.path().join("measurements.jsonl"));
        assert!(store.load_all().await.unwrap().is_empty());

        store
            .store(summary("A"), None, "first".to_string())
            .await
            .unwrap();
        store
            .store(summary("B"), None, "second".to_string())
            .await
            .unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].summary.subject, "A");
        assert_eq!(all[1].report_text, "second");
        assert_ne!(all[0].id, all[1].id);
    }

    #[tokio::test]
    async fn test_corrupt_line_is_error() {
        let dir = TempDir::new("pulse-store").unwrap();
        let path = dir.path().join("measurements.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();
        assert!(JsonLinesStore::new(path).load_all().await.is_err());
    }

    #[tokio::test]
    async fn test_persist_runs_missing_analysis() {
        let session = SessionCoordinator::new(PulseConfig::default());
        session.set_subject("Kim").await;
        session.start_at(0.0).await;
        feed(&session, 0..600).await;

        let mut store = MockStore::new();
        store
            .expect_store()
            .withf(|summary, report, text| {
                summary.subject == "Kim"
                    && summary.total_samples == 600
                    && report.is_some()
                    && text.contains("HEART RATE ANALYSIS - KIM")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        persist_session(&session, &store).await.unwrap();
        assert!(session.current_report().await.is_some());
        assert_eq!(session.counters().await.buffered, 0);
    }

    #[tokio::test]
    async fn test_persist_without_enough_data() {
        let session = SessionCoordinator::new(PulseConfig::default());
        session.start_at(0.0).await;
        feed(&session, 0..20).await;

        let mut store = MockStore::new();
        store
            .expect_store()
            .with(always(), eq(None), always())
            .times(1)
            .returning(|_, _, _| Ok(()));
        persist_session(&session, &store).await.unwrap();
    }

    #[test]
    fn test_listing_line() {
        let mut measurement = StoredMeasurement {
            id: Uuid::new_v4(),
            stored_at: OffsetDateTime::UNIX_EPOCH,
            summary: summary("Robin"),
            analysis: None,
            report_text: String::new(),
        };
        let line = measurement.to_string();
        assert!(line.starts_with("1970-01-01 00:00  Robin"));
        assert!(line.contains("30.0 s"));
        assert!(line.contains("1500 samples"));
        assert!(line.ends_with("no analysis"));

        let session_report = crate::components::export::tests::report();
        measurement.analysis = Some(session_report);
        let line = measurement.to_string();
        assert!(line.contains("75.0 BPM"));
        assert!(line.contains("RMSSD   35.0 ms"));
        assert!(line.ends_with("Normal"));
    }
}
