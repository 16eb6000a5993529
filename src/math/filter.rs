//! Band-pass Filtering
//!
//! Digital Butterworth band-pass design and zero-phase (forward-backward)
//! filtering.
//!
//! The design starts from the analog low-pass prototype of order `N`,
//! applies the low-pass to band-pass transform (doubling the pole count to
//! `2N`) and maps every pole through the pre-warped bilinear transform. The
//! result is realized as `N` cascaded biquads, each with zeros at `z = 1` and
//! `z = -1`, normalized to unity gain at the band centre.

use log::trace;
use nalgebra::Complex;
use std::f64::consts::PI;
use thiserror::Error;

/// Poles with an imaginary part below this are treated as real.
const REAL_POLE_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("filter order must be at least 1")]
    ZeroOrder,
    #[error("invalid pass-band {low_hz} - {high_hz} Hz for a sampling rate of {fs} Hz")]
    InvalidBand { low_hz: f64, high_hz: f64, fs: f64 },
    #[error("filter design is numerically degenerate")]
    Degenerate,
    #[error("signal of {len} samples is shorter than the minimum of {min}")]
    TooShort { len: usize, min: usize },
}

/// One second-order section in transposed direct form II. `a[0]` is always 1.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    /// Gain of the section at DC.
    fn dc_gain(&self) -> Option<f64> {
        let den = self.a.iter().sum::<f64>();
        if den.abs() < f64::EPSILON {
            None
        } else {
            Some(self.b.iter().sum::<f64>() / den)
        }
    }

    /// Complex response at `z^-1 = e^{-jw}`.
    fn response(&self, w: f64) -> Complex<f64> {
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = z2 * self.b[2] + z1 * self.b[1] + self.b[0];
        let den = z2 * self.a[2] + z1 * self.a[1] + self.a[0];
        num / den
    }

    /// Steady-state delay line for a unit step at the input.
    fn step_state(&self, dc_gain: f64) -> [f64; 2] {
        let z1 = self.b[2] - self.a[2] * dc_gain;
        let z0 = self.b[1] - self.a[1] * dc_gain + z1;
        [z0, z1]
    }

    #[inline]
    fn step(&self, state: &mut [f64; 2], x: f64) -> f64 {
        let y = self.b[0] * x + state[0];
        state[0] = self.b[1] * x - self.a[1] * y + state[1];
        state[1] = self.b[2] * x - self.a[2] * y;
        y
    }
}

/// A digital Butterworth band-pass filter.
#[derive(Clone, Debug, PartialEq)]
pub struct BandpassFilter {
    order: usize,
    sections: Vec<Biquad>,
    /// Per-section step response state, already scaled by the upstream DC gain.
    zi: Vec<[f64; 2]>,
}

impl BandpassFilter {
    /// Designs an order `order` Butterworth band-pass for `low_hz..high_hz` at `fs` Hz.
    pub fn butterworth(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        fs: f64,
    ) -> Result<Self, FilterError> {
        if order == 0 {
            return Err(FilterError::ZeroOrder);
        }
        let nyquist = fs * 0.5;
        let band_ok = fs.is_finite()
            && low_hz.is_finite()
            && high_hz.is_finite()
            && low_hz > 0.0
            && low_hz < high_hz
            && high_hz < nyquist;
        if !band_ok {
            return Err(FilterError::InvalidBand { low_hz, high_hz, fs });
        }

        // pre-warped analog band edges (rad/s)
        let fs2 = 2.0 * fs;
        let wl = fs2 * (PI * low_hz / fs).tan();
        let wh = fs2 * (PI * high_hz / fs).tan();
        let bw = wh - wl;
        let w0 = (wl * wh).sqrt();

        let mut poles = Vec::with_capacity(2 * order);
        for k in 0..order {
            let theta = PI * (2 * k + 1 + order) as f64 / (2 * order) as f64;
            let proto = Complex::from_polar(1.0, theta);
            let half = proto * (bw / 2.0);
            let disc = (half * half - w0 * w0).sqrt();
            for s in [half + disc, half - disc] {
                poles.push((Complex::new(fs2, 0.0) + s) / (Complex::new(fs2, 0.0) - s));
            }
        }
        trace!("band-pass digital poles: {:?}", poles);

        let mut sections = Self::pair_poles(&poles)?;
        if sections.len() != order {
            return Err(FilterError::Degenerate);
        }

        // unity gain at the centre frequency
        let w_center = 2.0 * (w0 / fs2).atan();
        let response = sections
            .iter()
            .fold(Complex::new(1.0, 0.0), |acc, s| acc * s.response(w_center));
        let magnitude = response.norm();
        if !magnitude.is_finite() || magnitude < f64::EPSILON {
            return Err(FilterError::Degenerate);
        }
        for coeff in sections[0].b.iter_mut() {
            *coeff /= magnitude;
        }

        let mut zi = Vec::with_capacity(sections.len());
        let mut scale = 1.0;
        for section in &sections {
            let gain = section.dc_gain().ok_or(FilterError::Degenerate)?;
            let state = section.step_state(gain);
            zi.push([state[0] * scale, state[1] * scale]);
            scale *= gain;
        }

        let finite = sections
            .iter()
            .flat_map(|s| s.a.iter().chain(s.b.iter()))
            .chain(zi.iter().flatten())
            .all(|c| c.is_finite());
        if !finite {
            return Err(FilterError::Degenerate);
        }

        Ok(Self { order, sections, zi })
    }

    /// Groups conjugate pairs (and leftover real poles) into biquads with zeros at +1 and -1.
    fn pair_poles(poles: &[Complex<f64>]) -> Result<Vec<Biquad>, FilterError> {
        let mut sections = Vec::new();
        let mut real = Vec::new();
        for p in poles {
            if !p.re.is_finite() || !p.im.is_finite() {
                return Err(FilterError::Degenerate);
            }
            if p.im > REAL_POLE_TOLERANCE {
                sections.push(Biquad {
                    b: [1.0, 0.0, -1.0],
                    a: [1.0, -2.0 * p.re, p.norm_sqr()],
                });
            } else if p.im.abs() <= REAL_POLE_TOLERANCE {
                real.push(p.re);
            }
        }
        if real.len() % 2 != 0 {
            return Err(FilterError::Degenerate);
        }
        for pair in real.chunks(2) {
            sections.push(Biquad {
                b: [1.0, 0.0, -1.0],
                a: [1.0, -(pair[0] + pair[1]), pair[0] * pair[1]],
            });
        }
        Ok(sections)
    }

    /// Shortest signal the filter is applied to: `6 * order`, at least 20 samples.
    pub fn min_length(order: usize) -> usize {
        (6 * order).max(20)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Zero-phase filtering: odd-extend both ends, filter forward, filter the
    /// reversed result, reverse back and strip the padding.
    pub fn filtfilt(&self, data: &[f64]) -> Result<Vec<f64>, FilterError> {
        let min = Self::min_length(self.order);
        if data.len() < min {
            return Err(FilterError::TooShort {
                len: data.len(),
                min,
            });
        }
        let n = data.len();
        let padlen = (3 * (2 * self.sections.len() + 1)).min(n - 1);

        let first = data[0];
        let last = data[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * padlen);
        ext.extend((1..=padlen).rev().map(|i| 2.0 * first - data[i]));
        ext.extend_from_slice(data);
        ext.extend((n - 1 - padlen..n - 1).rev().map(|i| 2.0 * last - data[i]));

        let mut forward = self.run(&ext);
        forward.reverse();
        let mut backward = self.run(&forward);
        backward.reverse();

        Ok(backward[padlen..padlen + n].to_vec())
    }

    /// Runs the cascade once, starting from the steady state of `input[0]`.
    fn run(&self, input: &[f64]) -> Vec<f64> {
        let x0 = input.first().copied().unwrap_or_default();
        let mut states: Vec<[f64; 2]> = self.zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect();
        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter()
                    .zip(states.iter_mut())
                    .fold(x, |acc, (section, state)| section.step(state, acc))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn test_design_has_order_sections() {
        let filter = BandpassFilter::butterworth(4, 0.5, 5.0, 50.0).unwrap();
        assert_eq!(filter.sections().len(), 4);
        for section in filter.sections() {
            // stable: both poles inside the unit circle
            assert!(section.a[2].abs() < 1.0);
        }
    }

    #[test]
    fn test_unity_gain_in_passband() {
        let filter = BandpassFilter::butterworth(4, 0.5, 5.0, 50.0).unwrap();
        let input = sine(1.25, 50.0, 1000, 200.0);
        let output = filter.filtfilt(&input).unwrap();
        let mid_in = rms(&input[200..800]);
        let mid_out = rms(&output[200..800]);
        assert!((mid_out / mid_in - 1.0).abs() < 0.05, "ratio {}", mid_out / mid_in);
    }

    #[test]
    fn test_zero_phase() {
        let filter = BandpassFilter::butterworth(4, 0.5, 5.0, 50.0).unwrap();
        let input = sine(1.25, 50.0, 1000, 200.0);
        let output = filter.filtfilt(&input).unwrap();
        // the peak of one period stays on the same sample
        let window = 480..520;
        let argmax = |data: &[f64]| {
            window
                .clone()
                .max_by(|&a, &b| data[a].total_cmp(&data[b]))
                .unwrap()
        };
        assert_eq!(argmax(&input[..]), argmax(&output[..]));
    }

    #[test]
    fn test_rejects_dc_and_high_frequency() {
        let filter = BandpassFilter::butterworth(4, 0.5, 5.0, 50.0).unwrap();
        let dc = vec![500.0; 500];
        let out = filter.filtfilt(&dc).unwrap();
        assert!(out.iter().all(|x| x.abs() < 1e-6));

        let high = sine(20.0, 50.0, 500, 100.0);
        let out = filter.filtfilt(&high).unwrap();
        assert!(rms(&out[100..400]) < 1.0);
    }

    #[test]
    fn test_invalid_band_is_rejected() {
        assert!(matches!(
            BandpassFilter::butterworth(4, 5.0, 0.5, 50.0),
            Err(FilterError::InvalidBand { .. })
        ));
        assert!(matches!(
            BandpassFilter::butterworth(4, 0.5, 30.0, 50.0),
            Err(FilterError::InvalidBand { .. })
        ));
        assert_eq!(
            BandpassFilter::butterworth(0, 0.5, 5.0, 50.0),
            Err(FilterError::ZeroOrder)
        );
    }

    #[test]
    fn test_short_signal_is_rejected() {
        let filter = BandpassFilter::butterworth(4, 0.5, 5.0, 50.0).unwrap();
        assert_eq!(BandpassFilter::min_length(4), 24);
        assert_eq!(BandpassFilter::min_length(2), 20);
        assert_eq!(
            filter.filtfilt(&[1.0; 23]),
            Err(FilterError::TooShort { len: 23, min: 24 })
        );
        assert_eq!(filter.filtfilt(&[1.0; 24]).unwrap().len(), 24);
    }
}
