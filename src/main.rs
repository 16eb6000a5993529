//! Pulse Recorder
//!
//! Records the stream of a PPG pulse sensor (a serial device, a file or
//! stdin), prints live status while recording and an HRV report at the end.
//! Recording ends with the stream or on Ctrl-C.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};
use pulse_rs::{
    api::{
        controller::{RecordingApi, SampleSource},
        model::SessionModelApi,
    },
    components::{
        acquisition::{Acquisition, AcquisitionStats, LineSource},
        export::ExportBundle,
        session::SessionCoordinator,
        storage::{persist_session, JsonLinesStore},
    },
    core::events::SessionEvent,
    model::config::PulseConfig,
};
use std::{
    path::{Path, PathBuf},
    sync::atomic::Ordering,
    time::Duration,
};
use tokio::{
    io::BufReader,
    runtime::Runtime,
    sync::broadcast::{error::RecvError, Receiver},
    task::{JoinError, JoinHandle},
};

#[derive(Parser, Debug)]
#[command(
    name = "pulse",
    version,
    about = "Records a PPG pulse stream and analyzes heart rate variability"
)]
struct Cli {
    /// Read `AC THRESHOLD BEAT` records from this file or device instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,
    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Name of the measured subject
    #[arg(long, default_value = "")]
    subject: String,
    /// Settling period in seconds
    #[arg(long)]
    settling: Option<f64>,
    /// Samples per aggregate record
    #[arg(long)]
    buffer_size: Option<usize>,
    /// Nominal sampling rate in Hz
    #[arg(long)]
    sampling_rate: Option<f64>,
    /// Export JSON, CSV and the report into this directory
    #[arg(long)]
    export: Option<PathBuf>,
    /// Append the measurement to this JSON-lines store
    #[arg(long)]
    store: Option<PathBuf>,
    /// List the measurements in the `--store` file instead of recording
    #[arg(long, requires = "store")]
    list: bool,
    /// Seconds between status lines
    #[arg(long, default_value_t = 1.0)]
    status_interval: f64,
    /// Use the simulated sensor at this heart rate (BPM)
    #[cfg(feature = "mock")]
    #[arg(long)]
    simulate: Option<f64>,
    /// Seconds of simulated data
    #[cfg(feature = "mock")]
    #[arg(long, default_value_t = 30.0)]
    duration: f64,
}

impl Cli {
    fn load_config(&self) -> Result<PulseConfig> {
        let mut config = match &self.config {
            Some(path) => PulseConfig::from_file(path)?,
            None => PulseConfig::default(),
        };
        if let Some(settling) = self.settling {
            config.acquisition.settling_duration = settling;
        }
        if let Some(buffer_size) = self.buffer_size {
            config.acquisition.buffer_size = buffer_size;
        }
        if let Some(rate) = self.sampling_rate {
            config.acquisition.sampling_rate_hz = rate;
        }
        Ok(config)
    }

    async fn open_source(&self, config: &PulseConfig) -> Result<Box<dyn SampleSource>> {
        #[cfg(feature = "mock")]
        if let Some(bpm) = self.simulate {
            use pulse_rs::components::simulator::SimulatedSource;
            let fs = config.acquisition.sampling_rate_hz;
            let limit = (self.duration * fs) as u64;
            info!("simulating {:.0} BPM for {:.0}s", bpm, self.duration);
            return Ok(Box::new(SimulatedSource::new(fs, bpm).with_limit(limit)));
        }
        #[cfg(not(feature = "mock"))]
        let _ = config;

        Ok(match &self.input {
            Some(path) => {
                info!("reading records from {}", path.display());
                let file = tokio::fs::File::open(path).await?;
                Box::new(LineSource::new(BufReader::new(file)))
            }
            None => {
                info!("reading records from stdin");
                Box::new(LineSource::new(BufReader::new(tokio::io::stdin())))
            }
        })
    }
}

/// Logs live status until aborted.
fn spawn_status<M>(model: M, mut events: Receiver<SessionEvent>, period: Duration) -> JoinHandle<()>
where
    M: SessionModelApi + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => info!("{}", model.get_counters().await),
                event = events.recv() => match event {
                    Ok(SessionEvent::Ready(t)) => info!("settling done at {:.2}s", t),
                    Ok(SessionEvent::Bpm { bpm, .. }) => info!("beat: {:.1} BPM", bpm),
                    Ok(SessionEvent::AnalysisFinished(report)) => {
                        info!("analysis finished: {:.1} BPM", report.avg_hr)
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => debug!("status skipped {} events", n),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    })
}

fn log_acquisition(result: std::result::Result<Result<AcquisitionStats>, JoinError>) {
    match result {
        Ok(Ok(stats)) => info!(
            "{} records, {} dropped, {} read timeouts",
            stats.records, stats.dropped, stats.timeouts
        ),
        Ok(Err(e)) => error!("acquisition failed: {:#}", e),
        Err(e) => error!("acquisition task failed: {}", e),
    }
}

async fn list_store(path: &Path) -> Result<()> {
    let measurements = JsonLinesStore::new(path).load_all().await?;
    if measurements.is_empty() {
        println!("No stored measurements in {}", path.display());
    }
    for measurement in &measurements {
        println!("{}", measurement);
    }
    Ok(())
}

async fn run(cli: Cli, config: PulseConfig) -> Result<()> {
    let source = cli.open_source(&config).await?;
    let read_timeout = config.acquisition.read_timeout();
    let session = SessionCoordinator::new(config);
    session.set_subject(cli.subject.clone()).await;

    let status = spawn_status(
        session.clone(),
        session.subscribe(),
        Duration::from_secs_f64(cli.status_interval.max(0.1)),
    );
    session.start_recording().await?;

    let (stop, mut acquisition) = Acquisition::new(source, session.clone(), read_timeout).spawn();
    tokio::select! {
        result = &mut acquisition => log_acquisition(result),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, stopping acquisition");
            stop.store(true, Ordering::Release);
            log_acquisition(acquisition.await);
        }
    }

    if let Some(analysis) = session.stop_recording().await? {
        analysis.await?;
    }
    status.abort();

    let bundle = ExportBundle::collect(&session).await;
    println!("{}", bundle.report_text());

    if let Some(dir) = &cli.export {
        for path in bundle.write_to_dir(dir).await? {
            info!("wrote {}", path.display());
        }
    }
    if let Some(path) = &cli.store {
        persist_session(&session, &JsonLinesStore::new(path)).await?;
    }
    Ok(())
}

/// Main entry point of the application.
///
/// Initializes logging, sets up the asynchronous runtime and records one session.
fn main() -> Result<()> {
    // Initialize logger with environment-specific settings.
    env_logger::Builder::from_env(
        Env::default()
            .filter_or("PULSE_LOG_LEVEL", "info")
            .write_style_or("PULSE_LOG_STYLE", "always"),
    )
    .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Create a new Tokio runtime for asynchronous operations.
    let rt = Runtime::new()?;
    if let (true, Some(store)) = (cli.list, cli.store.as_deref()) {
        return rt.block_on(list_store(store));
    }
    rt.block_on(run(cli, config))
}
