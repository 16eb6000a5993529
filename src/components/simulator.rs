//! Simulated Sensor
//!
//! A [`SampleSource`] producing synthetic PPG records for running without
//! hardware. The waveform is a sinusoid at the configured heart rate with
//! uniform amplitude noise; the beat flag is raised on the sample that crosses
//! each waveform peak, the way the device flags beats.

use crate::api::controller::SampleSource;
use anyhow::Result;
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{f64::consts::PI, time::Duration};
use tokio::time::{interval, Interval, MissedTickBehavior};

const BASELINE: f64 = 500.0;
const AMPLITUDE: f64 = 200.0;
const THRESHOLD: i64 = 520;

pub struct SimulatedSource {
    rng: StdRng,
    sampling_rate_hz: f64,
    bpm: f64,
    noise: f64,
    index: u64,
    limit: Option<u64>,
    real_time: bool,
    ticker: Option<Interval>,
}

impl SimulatedSource {
    pub fn new(sampling_rate_hz: f64, bpm: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            sampling_rate_hz,
            bpm,
            noise: 10.0,
            index: 0,
            limit: None,
            real_time: true,
            ticker: None,
        }
    }

    /// Uses a fixed seed so runs are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Ends the stream after `samples` records.
    pub fn with_limit(mut self, samples: u64) -> Self {
        self.limit = Some(samples);
        self
    }

    /// Peak-to-peak amplitude of the uniform noise.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(0.0);
        self
    }

    /// Produces records as fast as they are read instead of at the sampling rate.
    pub fn unpaced(mut self) -> Self {
        self.real_time = false;
        self
    }

    fn phase(&self, index: u64) -> f64 {
        let t = index as f64 / self.sampling_rate_hz;
        (t * self.bpm / 60.0).fract()
    }

    fn next_record(&mut self) -> String {
        let index = self.index;
        self.index += 1;

        let phase = self.phase(index);
        let noise = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise / 2.0..self.noise / 2.0)
        } else {
            0.0
        };
        let ac = BASELINE + AMPLITUDE * (2.0 * PI * phase).sin() + noise;
        let previous = if index == 0 { 0.0 } else { self.phase(index - 1) };
        // sin peaks at a quarter period
        let beat = previous < 0.25 && phase >= 0.25;
        format!("{} {} {}", ac.round() as i64, THRESHOLD, beat as u8)
    }
}

#[async_trait]
impl SampleSource for SimulatedSource {
    async fn next_line(&mut self) -> Result<Option<String>> {
        if self.limit.is_some_and(|limit| self.index >= limit) {
            return Ok(None);
        }
        if self.real_time {
            let period = Duration::from_secs_f64(1.0 / self.sampling_rate_hz);
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
                ticker
            });
            ticker.tick().await;
        }
        Ok(Some(self.next_record()))
    }
}
