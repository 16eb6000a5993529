//! Session Coordinator
//!
//! Owns all state of one measurement session and wires the pipeline together:
//! settling gate, aggregator, online estimator, offline detector and analyzer.
//! The coordinator is a cheap, cloneable handle; every clone refers to the same
//! session.

use crate::{
    api::{
        controller::{RecordingApi, SessionApi},
        model::SessionModelApi,
    },
    components::{
        aggregator::StreamAggregator, analyzer::HrvAnalyzer, detector::OfflineBeatDetector,
        estimator::OnlineBeatEstimator, export::ExportBundle, gate::SettlingGate,
    },
    core::{constants::MIN_VALID_HEART_RATES, events::SessionEvent},
    model::{
        aggregate::{AggregateRecord, DownsampledSample},
        config::PulseConfig,
        hrv::{AnalysisError, HrvReport},
        sample::{Sample, SensorRecord},
        session::{LiveCounters, SessionPhase, SessionState, SessionSummary, StorageInfo},
    },
};
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, trace, warn};
use std::{fmt, sync::Arc};
use time::OffsetDateTime;
use tokio::{
    sync::{
        broadcast::{self, Receiver, Sender},
        Mutex, RwLock,
    },
    task::JoinHandle,
    time::Instant,
};

const EVENT_BUS_CAPACITY: usize = 256;

/// Everything that is cleared by a reset.
struct SessionData {
    subject: String,
    /// Origin of the session clock.
    clock: Option<Instant>,
    started_at: Option<OffsetDateTime>,
    gate: SettlingGate,
    raw: Vec<Sample>,
    aggregator: StreamAggregator,
    estimator: OnlineBeatEstimator,
    bpm_history: Vec<[f64; 2]>,
    dropped_records: usize,
    report: Option<HrvReport>,
    /// Incremented on every reset.
    epoch: u64,
}

impl SessionData {
    fn new(config: &PulseConfig) -> Self {
        let acq = &config.acquisition;
        let det = &config.detection;
        Self {
            subject: String::new(),
            clock: None,
            started_at: None,
            gate: SettlingGate::new(acq.settling_duration),
            raw: Vec::new(),
            aggregator: StreamAggregator::new(acq.buffer_size, acq.downsample_rate),
            estimator: OnlineBeatEstimator::new(
                acq.online_window,
                det.min_heart_rate,
                det.max_heart_rate,
            ),
            bpm_history: Vec::new(),
            dropped_records: 0,
            report: None,
            epoch: 0,
        }
    }

    fn counters(&self) -> LiveCounters {
        LiveCounters {
            phase: self.gate.phase(),
            sample_count: self.raw.len(),
            buffered: self.aggregator.buffered_len(),
            aggregate_count: self.aggregator.records().len(),
            downsampled_count: self.aggregator.downsampled().len(),
            dropped_records: self.dropped_records,
            last_bpm: self.bpm_history.last().map(|[_, bpm]| *bpm),
            latest_sample: self.raw.last().copied(),
        }
    }

    fn storage(&self) -> StorageInfo {
        StorageInfo {
            raw_samples: self.raw.len(),
            aggregates: self.aggregator.records().len(),
            downsampled: self.aggregator.downsampled().len(),
        }
    }

    fn summary(&self, config: &PulseConfig) -> SessionSummary {
        SessionSummary {
            subject: self.subject.clone(),
            started_at: self.started_at,
            duration_seconds: self.raw.last().map(|s| s.timestamp).unwrap_or_default(),
            total_samples: self.raw.len(),
            sampling_rate_hz: config.acquisition.sampling_rate_hz,
        }
    }
}

/// The session coordinator.
#[derive(Clone)]
pub struct SessionCoordinator {
    config: Arc<PulseConfig>,
    data: Arc<RwLock<SessionData>>,
    /// Serializes offline analysis against reset.
    analysis_lock: Arc<Mutex<()>>,
    detector: Arc<OfflineBeatDetector>,
    analyzer: HrvAnalyzer,
    event_bus: Sender<SessionEvent>,
}

impl SessionCoordinator {
    pub fn new(config: PulseConfig) -> Self {
        let (event_bus, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let detector = OfflineBeatDetector::new(
            config.detection.clone(),
            config.acquisition.sampling_rate_hz,
        );
        let analyzer = HrvAnalyzer::new(
            config.detection.min_analysis_samples,
            MIN_VALID_HEART_RATES,
        );
        Self {
            data: Arc::new(RwLock::new(SessionData::new(&config))),
            config: Arc::new(config),
            analysis_lock: Arc::new(Mutex::new(())),
            detector: Arc::new(detector),
            analyzer,
            event_bus,
        }
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// Returns a receiver for all events published after this call.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.event_bus.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is not an error
        let _ = self.event_bus.send(event);
    }

    pub async fn set_subject(&self, subject: impl Into<String>) {
        self.data.write().await.subject = subject.into();
    }

    /// Starts (or resumes) the session and begins settling.
    ///
    /// The session clock starts on the first call after a reset; a resumed
    /// session keeps counting from there so timestamps never go backwards.
    ///
    /// # Returns
    /// `false` if the session was not idle.
    pub async fn start(&self) -> bool {
        let now = {
            let mut data = self.data.write().await;
            data.clock
                .get_or_insert_with(Instant::now)
                .elapsed()
                .as_secs_f64()
        };
        self.start_at(now).await
    }

    /// Starts the session with settling beginning at session time `now`.
    pub async fn start_at(&self, now: f64) -> bool {
        {
            let mut data = self.data.write().await;
            if data.gate.phase() != SessionPhase::Idle {
                warn!("start ignored, session is {}", data.gate.phase());
                return false;
            }
            data.clock.get_or_insert_with(Instant::now);
            data.started_at.get_or_insert_with(OffsetDateTime::now_utc);
            data.gate.start(now);
            data.estimator.clear();
            data.bpm_history.clear();
            data.dropped_records = 0;
        }
        info!("session started at {:.2}s", now);
        self.publish(SessionEvent::Started(now));
        true
    }

    /// Current reading of the session clock in seconds.
    pub async fn now(&self) -> Option<f64> {
        self.data
            .read()
            .await
            .clock
            .map(|clock| clock.elapsed().as_secs_f64())
    }

    /// Ingests one record at the current session time.
    pub async fn ingest(&self, record: SensorRecord) -> bool {
        match self.now().await {
            Some(now) => self.ingest_at(record, now).await,
            None => false,
        }
    }

    /// Ingests one record at session time `now`. Every record reaches the raw
    /// series; only records arriving while ready are aggregated and searched
    /// for live beats.
    ///
    /// # Returns
    /// `false` if the record was ignored because the session is idle.
    pub async fn ingest_at(&self, record: SensorRecord, now: f64) -> bool {
        let mut events = Vec::new();
        {
            let mut data = self.data.write().await;
            if data.gate.phase() == SessionPhase::Idle {
                trace!("record ignored while idle");
                return false;
            }
            let sample = record.at(now);
            data.raw.push(sample);

            if data.gate.on_sample(now) {
                events.push(SessionEvent::Ready(now));
            }
            if data.gate.is_eligible() {
                if let Some(record) = data.aggregator.offer(sample) {
                    events.push(SessionEvent::AggregateFlushed(record));
                }
                if let Some(bpm) = data.estimator.on_sample(&sample) {
                    data.bpm_history.push([now, bpm]);
                    events.push(SessionEvent::Bpm {
                        timestamp: now,
                        bpm,
                    });
                }
            }
        }
        for event in events {
            self.publish(event);
        }
        true
    }

    /// Counts a record that could not be parsed.
    pub async fn note_dropped(&self) {
        self.data.write().await.dropped_records += 1;
    }

    /// Drains a partially filled aggregation window.
    pub async fn flush(&self) -> Option<AggregateRecord> {
        let record = self.data.write().await.aggregator.flush();
        if let Some(record) = &record {
            self.publish(SessionEvent::AggregateFlushed(record.clone()));
        }
        record
    }

    /// Stops the session: flushes the aggregator, returns the gate to idle and
    /// spawns the offline analysis when enough raw samples exist.
    ///
    /// # Returns
    /// The handle of the spawned analysis, if any.
    pub async fn stop(&self) -> Option<JoinHandle<()>> {
        let (flushed, raw_len) = {
            let mut data = self.data.write().await;
            if data.gate.phase() == SessionPhase::Idle {
                debug!("stop ignored, session is idle");
                return None;
            }
            let flushed = data.aggregator.flush();
            data.gate.stop();
            (flushed, data.raw.len())
        };
        if let Some(record) = flushed {
            self.publish(SessionEvent::AggregateFlushed(record));
        }
        info!("session stopped with {} samples", raw_len);
        self.publish(SessionEvent::Stopped(raw_len));

        if raw_len < self.config.detection.min_analysis_samples {
            info!("not enough samples for analysis");
            return None;
        }
        let session = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = session.analyze().await {
                warn!("analysis after stop failed: {}", e);
            }
        }))
    }

    /// Runs offline detection and HRV analysis on a snapshot of the raw series.
    /// On success the report becomes the current one.
    pub async fn analyze(&self) -> Result<HrvReport, AnalysisError> {
        let _analysis = self.analysis_lock.lock().await;
        self.analyze_locked().await
    }

    /// Body of [`Self::analyze`]; the caller holds the analysis lock.
    async fn analyze_locked(&self) -> Result<HrvReport, AnalysisError> {
        let (raw, epoch) = {
            let data = self.data.read().await;
            (data.raw.clone(), data.epoch)
        };
        debug!("analyzing {} samples", raw.len());

        let detector = self.detector.clone();
        let analyzer = self.analyzer;
        let result = tokio::task::spawn_blocking(move || {
            let detection = detector.detect(&raw);
            analyzer.analyze(raw.len(), &detection)
        })
        .await
        .unwrap_or_else(|e| Err(AnalysisError::TaskFailed(e.to_string())));

        if let Ok(report) = &result {
            let stored = {
                let mut data = self.data.write().await;
                if data.epoch == epoch {
                    data.report = Some(report.clone());
                    true
                } else {
                    false
                }
            };
            if stored {
                self.publish(SessionEvent::AnalysisFinished(Box::new(report.clone())));
            } else {
                debug!("discarding report computed before reset");
            }
        }
        if let Err(e) = &result {
            warn!("analysis failed: {}", e);
            self.publish(SessionEvent::AnalysisFailed(e.to_string()));
        }
        result
    }

    /// Snapshots everything a session exports in one critical section.
    ///
    /// Holds the analysis lock throughout, so a concurrent reset lands either
    /// before or after the snapshot. The partial aggregation window is flushed
    /// first. With `analyze_missing` the analysis runs first when there is no
    /// current report; a failed analysis leaves the report absent.
    pub async fn export_bundle(&self, analyze_missing: bool) -> ExportBundle {
        let _analysis = self.analysis_lock.lock().await;
        let missing = analyze_missing && self.data.read().await.report.is_none();
        if missing {
            if let Err(e) = self.analyze_locked().await {
                warn!("exporting without analysis: {}", e);
            }
        }
        let (bundle, flushed) = {
            let mut data = self.data.write().await;
            let flushed = data.aggregator.flush();
            let bundle = ExportBundle {
                summary: data.summary(&self.config),
                storage: data.storage(),
                aggregates: data.aggregator.records().to_vec(),
                downsampled: data.aggregator.downsampled().to_vec(),
                report: data.report.clone(),
            };
            (bundle, flushed)
        };
        if let Some(record) = flushed {
            self.publish(SessionEvent::AggregateFlushed(record));
        }
        bundle
    }

    /// Clears all session data and returns the gate to idle. The subject is
    /// kept. Waits for a running analysis first.
    pub async fn reset(&self) {
        let _analysis = self.analysis_lock.lock().await;
        {
            let mut data = self.data.write().await;
            let subject = std::mem::take(&mut data.subject);
            let epoch = data.epoch + 1;
            *data = SessionData::new(&self.config);
            data.subject = subject;
            data.epoch = epoch;
        }
        info!("session data reset");
        self.publish(SessionEvent::Reset);
    }

    pub async fn state(&self) -> SessionState {
        self.data.read().await.gate.state()
    }

    pub async fn counters(&self) -> LiveCounters {
        self.data.read().await.counters()
    }

    pub async fn raw_series(&self) -> Vec<Sample> {
        self.data.read().await.raw.clone()
    }

    pub async fn aggregates(&self) -> Vec<AggregateRecord> {
        self.data.read().await.aggregator.records().to_vec()
    }

    pub async fn downsampled(&self) -> Vec<DownsampledSample> {
        self.data.read().await.aggregator.downsampled().to_vec()
    }

    pub async fn bpm_history(&self) -> Vec<[f64; 2]> {
        self.data.read().await.bpm_history.clone()
    }

    pub async fn current_report(&self) -> Option<HrvReport> {
        self.data.read().await.report.clone()
    }

    pub async fn summary(&self) -> SessionSummary {
        self.data.read().await.summary(&self.config)
    }

    pub async fn efficiency(&self) -> f64 {
        self.data.read().await.storage().efficiency()
    }
}

impl fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RecordingApi for SessionCoordinator {
    async fn start_recording(&self) -> Result<()> {
        if self.start().await {
            Ok(())
        } else {
            Err(anyhow::anyhow!("session is already recording"))
        }
    }

    async fn stop_recording(&self) -> Result<Option<JoinHandle<()>>> {
        Ok(self.stop().await)
    }
}

#[async_trait]
impl SessionApi for SessionCoordinator {
    async fn record(&self, record: SensorRecord) -> Result<()> {
        self.ingest(record).await;
        Ok(())
    }

    async fn record_dropped(&self) {
        self.note_dropped().await
    }

    async fn analyze(&self) -> Result<HrvReport> {
        Ok(SessionCoordinator::analyze(self).await?)
    }

    async fn reset(&self) -> Result<()> {
        SessionCoordinator::reset(self).await;
        Ok(())
    }
}

#[async_trait]
impl SessionModelApi for SessionCoordinator {
    async fn get_state(&self) -> SessionState {
        self.state().await
    }
    async fn get_counters(&self) -> LiveCounters {
        self.counters().await
    }
    async fn get_raw_series(&self) -> Vec<Sample> {
        self.raw_series().await
    }
    async fn get_aggregates(&self) -> Vec<AggregateRecord> {
        self.aggregates().await
    }
    async fn get_downsampled(&self) -> Vec<DownsampledSample> {
        self.downsampled().await
    }
    async fn get_bpm_history(&self) -> Vec<[f64; 2]> {
        self.bpm_history().await
    }
    async fn get_report(&self) -> Option<HrvReport> {
        self.current_report().await
    }
    async fn get_summary(&self) -> SessionSummary {
        self.summary().await
    }
    async fn get_storage_efficiency(&self) -> f64 {
        self.efficiency().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::hrv::HeartRateClass;
    use std::f64::consts::PI;

    const FS: f64 = 50.0;

    /// PPG-like record at sample index `i`: 75 BPM sinusoid, flag on every peak.
    pub(crate) fn record(i: usize) -> SensorRecord {
        let t = i as f64 / FS;
        let ac = 500.0 + 200.0 * (2.0 * PI * 1.25 * t).sin();
        SensorRecord::new(ac.round() as i64, 500, i % 40 == 10)
    }

    /// Feeds samples `range` at their nominal 50 Hz times.
    pub(crate) async fn feed(session: &SessionCoordinator, range: std::ops::Range<usize>) {
        for i in range {
            session.ingest_at(record(i), i as f64 / FS).await;
        }
    }

    #[tokio::test]
    async fn test_idle_session_ignores_records() {
        let session = SessionCoordinator::new(PulseConfig::default());
        assert!(!session.ingest_at(record(0), 0.0).await);
        assert!(!session.ingest(record(1)).await);
        assert!(session.raw_series().await.is_empty());
        assert!(session.stop().await.is_none());
    }

    #[tokio::test]
    async fn test_settling_samples_are_not_aggregated() {
        let session = SessionCoordinator::new(PulseConfig::default());
        let mut events = session.subscribe();
        assert!(session.start_at(0.0).await);
        assert!(!session.start().await);

        // 0.00 .. 3.98 s settling, 4.00 s onwards ready
        feed(&session, 0..325).await;
        let counters = session.counters().await;
        assert_eq!(counters.sample_count, 325);
        assert!(counters.is_ready());
        assert_eq!(counters.buffered, 25);

        let handle = session.stop().await.unwrap();
        handle.await.unwrap();

        let aggregates = session.aggregates().await;
        let counts: Vec<usize> = aggregates.iter().map(|r| r.sample_count).collect();
        assert_eq!(counts, vec![50, 50, 25]);
        assert!(aggregates.iter().all(|r| r.time_start >= 4.0));
        assert!(session
            .downsampled()
            .await
            .iter()
            .all(|d| d.time >= 4.0));
        assert_eq!(session.downsampled().await.len(), 5 + 5 + 3);

        let mut ready = 0;
        let mut stopped = None;
        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::Ready(t) => {
                    ready += 1;
                    assert_eq!(t, 4.0);
                }
                SessionEvent::Stopped(n) => stopped = Some(n),
                _ => {}
            }
        }
        assert_eq!(ready, 1);
        assert_eq!(stopped, Some(325));
    }

    #[tokio::test]
    async fn test_stop_runs_analysis() {
        let session = SessionCoordinator::new(PulseConfig::default());
        session.set_subject("Alex").await;
        session.start_at(0.0).await;
        feed(&session, 0..600).await;
        session.stop().await.unwrap().await.unwrap();

        let report = session.current_report().await.unwrap();
        assert!(report.beats_detected >= 10);
        assert!((report.avg_hr - 75.0).abs() < 5.0);
        assert_eq!(report.classification, HeartRateClass::Normal);

        let summary = session.summary().await;
        assert_eq!(summary.subject, "Alex");
        assert_eq!(summary.total_samples, 600);
        assert!((summary.duration_seconds - 11.98).abs() < 1e-9);
        assert!(summary.started_at.is_some());
    }

    #[tokio::test]
    async fn test_short_session_skips_analysis() {
        let session = SessionCoordinator::new(PulseConfig::default());
        session.start_at(0.0).await;
        feed(&session, 0..99).await;
        assert!(session.stop().await.is_none());
        assert_eq!(
            session.analyze().await,
            Err(AnalysisError::InsufficientSamples { have: 99, need: 100 })
        );
        assert!(session.current_report().await.is_none());
    }

    #[tokio::test]
    async fn test_live_bpm_from_flags() {
        let mut config = PulseConfig::default();
        config.acquisition.online_window = 64;
        let session = SessionCoordinator::new(config);
        session.start_at(0.0).await;
        feed(&session, 0..400).await;

        let history = session.bpm_history().await;
        assert!(!history.is_empty());
        for [t, bpm] in &history {
            assert!(*t >= 4.0);
            assert!((bpm - 75.0).abs() < 1e-6);
        }
        assert_eq!(session.counters().await.last_bpm, Some(history[history.len() - 1][1]));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let session = SessionCoordinator::new(PulseConfig::default());
        session.set_subject("Sam").await;
        session.start_at(0.0).await;
        feed(&session, 0..600).await;
        session.note_dropped().await;
        let handle = session.stop().await.unwrap();
        // reset waits for the analysis spawned by stop
        session.reset().await;
        handle.await.unwrap();

        assert!(session.raw_series().await.is_empty());
        assert!(session.aggregates().await.is_empty());
        assert!(session.downsampled().await.is_empty());
        assert!(session.current_report().await.is_none());
        assert_eq!(session.state().await, SessionState::default());
        let counters = session.counters().await;
        assert_eq!(counters.sample_count, 0);
        assert_eq!(counters.dropped_records, 0);
        assert_eq!(session.summary().await.subject, "Sam");
        assert_eq!(session.efficiency().await, 100.0);
    }

    #[tokio::test]
    async fn test_efficiency() {
        let session = SessionCoordinator::new(PulseConfig::default());
        session.start_at(0.0).await;
        feed(&session, 0..400).await;
        // 200 ready samples make 4 aggregates out of 400 raw samples
        assert!((session.efficiency().await - 99.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_restart_keeps_clock_monotonic() {
        let session = SessionCoordinator::new(PulseConfig::default());
        assert!(session.start().await);
        for i in 0..5 {
            assert!(session.ingest(record(i)).await);
        }
        session.stop().await;
        assert!(session.start().await);
        assert_eq!(session.state().await.phase, SessionPhase::Settling);
        for i in 5..10 {
            assert!(session.ingest(record(i)).await);
        }
        // resuming keeps the raw series and its ordering
        let raw = session.raw_series().await;
        assert_eq!(raw.len(), 10);
        assert!(raw.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    fn assert_consistent(bundle: &ExportBundle) {
        let aggregated: usize = bundle.aggregates.iter().map(|r| r.sample_count).sum();
        assert!(aggregated <= bundle.summary.total_samples);
        assert_eq!(bundle.aggregates.is_empty(), bundle.downsampled.is_empty());
        assert_eq!(bundle.storage.raw_samples, bundle.summary.total_samples);
        assert_eq!(bundle.storage.aggregates, bundle.aggregates.len());
        assert_eq!(bundle.storage.downsampled, bundle.downsampled.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_export_is_atomic_against_reset() {
        for _ in 0..50 {
            let session = SessionCoordinator::new(PulseConfig::default());
            session.start_at(0.0).await;
            feed(&session, 0..330).await;

            let exporter = session.clone();
            let resetter = session.clone();
            let (bundle, _) = tokio::join!(
                tokio::spawn(async move { exporter.export_bundle(false).await }),
                tokio::spawn(async move { resetter.reset().await }),
            );
            let bundle = bundle.unwrap();
            assert_consistent(&bundle);
            // either the whole session or nothing of it
            if bundle.summary.total_samples == 0 {
                assert!(bundle.aggregates.is_empty());
            } else {
                assert_eq!(bundle.summary.total_samples, 330);
                assert_eq!(bundle.aggregates.len(), 3);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_analyzed_export_matches_its_summary() {
        for _ in 0..20 {
            let session = SessionCoordinator::new(PulseConfig::default());
            session.start_at(0.0).await;
            feed(&session, 0..600).await;

            let exporter = session.clone();
            let resetter = session.clone();
            let (bundle, _) = tokio::join!(
                tokio::spawn(async move { exporter.export_bundle(true).await }),
                tokio::spawn(async move { resetter.reset().await }),
            );
            let bundle = bundle.unwrap();
            assert_consistent(&bundle);
            assert_eq!(bundle.report.is_some(), bundle.summary.total_samples == 600);
        }
    }

    #[tokio::test]
    async fn test_export_flushes_and_keeps_report() {
        let session = SessionCoordinator::new(PulseConfig::default());
        session.start_at(0.0).await;
        feed(&session, 0..260).await;
        assert!(session.export_bundle(false).await.report.is_none());
        assert_eq!(session.counters().await.buffered, 0);

        let bundle = session.export_bundle(true).await;
        assert!(bundle.report.is_some());
        assert_eq!(bundle.report, session.current_report().await);
        assert!((bundle.storage.efficiency() - session.efficiency().await).abs() < 1e-12);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_analysis_leaves_runtime_responsive() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        let session = SessionCoordinator::new(PulseConfig::default());
        session.start_at(0.0).await;
        feed(&session, 0..15_000).await;

        let done = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let done = done.clone();
            let ticks = ticks.clone();
            tokio::spawn(async move {
                while !done.load(Ordering::Acquire) {
                    ticks.fetch_add(1, Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            })
        };
        // the only thread of this runtime must stay free while detection runs
        session.analyze().await.unwrap();
        done.store(true, Ordering::Release);
        ticker.await.unwrap();
        assert!(ticks.load(Ordering::Relaxed) > 0);
    }
}
