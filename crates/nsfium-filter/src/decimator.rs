//! Polyphase windowed-sinc decimator.
//!
//! The kernel is a Blackman-windowed sinc with its cutoff just below the
//! output Nyquist frequency, sampled at a fixed number of sub-sample offsets. Each
//! output sample is a dot product of one phase against `taps` consecutive
//! input samples.

use std::f64::consts::PI;

use crate::FilterError;

const PHASES: usize = 64;
const ZERO_CROSSINGS: f64 = 8.0;
/// Fraction of the output Nyquist frequency kept in the passband.
const PASSBAND: f64 = 0.9;
const FRAC_BITS: u32 = 32;
const FRAC_MASK: u64 = (1 << FRAC_BITS) - 1;

#[derive(Debug, Clone)]
pub struct Decimator {
    /// Input samples advanced per output sample, 32.32 fixed point.
    step: u64,
    /// Position of the next window start relative to the next input buffer,
    /// 32.32 fixed point.
    position: u64,
    taps: usize,
    kernel: Vec<f32>,
}

impl Decimator {
    pub fn new(input_rate: f64, output_rate: f64) -> Result<Self, FilterError> {
        if !(input_rate.is_finite() && input_rate > 0.0) {
            return Err(FilterError::InvalidSampleRate(input_rate));
        }
        if !(output_rate.is_finite() && output_rate > 0.0 && output_rate <= input_rate) {
            return Err(FilterError::InvalidSampleRate(output_rate));
        }

        let step = input_rate / output_rate;
        // Cutoff in cycles per input sample.
        let cutoff = 0.5 * PASSBAND / step;
        let half_width = (ZERO_CROSSINGS / (2.0 * cutoff)).ceil() as usize;
        let taps = (half_width * 2).max(2);

        let mut kernel = vec![0.0f32; PHASES * taps];
        for phase in 0..PHASES {
            let frac = phase as f64 / PHASES as f64;
            let row = &mut kernel[phase * taps..(phase + 1) * taps];
            let mut sum = 0.0;
            let mut raw = vec![0.0f64; taps];
            for (t, slot) in raw.iter_mut().enumerate() {
                // Distance from this tap to the output instant.
                let u = frac + (half_width as f64 - 1.0) - t as f64;
                *slot = windowed_sinc(u, cutoff, half_width as f64);
                sum += *slot;
            }
            for (dst, src) in row.iter_mut().zip(raw) {
                *dst = (src / sum) as f32;
            }
        }

        Ok(Self {
            step: (step * (1u64 << FRAC_BITS) as f64).round() as u64,
            position: 0,
            taps,
            kernel,
        })
    }

    /// Number of input samples one output sample looks at. Callers must carry
    /// at least this much history between buffers.
    pub fn taps(&self) -> usize {
        self.taps
    }

    /// Input samples per output sample.
    pub fn ratio(&self) -> f64 {
        self.step as f64 / (1u64 << FRAC_BITS) as f64
    }

    /// Upper bound on the number of output samples `process` can emit for an
    /// input of `len` samples.
    pub fn max_output(&self, len: usize) -> usize {
        (len as f64 / self.ratio()).ceil() as usize + 1
    }

    /// Decimates as much of `input` as a full window allows, appending to
    /// `out`. Returns the number of leading input samples that are no longer
    /// needed; the rest must be presented again at the start of the next call.
    pub fn process(&mut self, input: &[f32], out: &mut Vec<f32>) -> usize {
        let mut pos = self.position;
        loop {
            let start = (pos >> FRAC_BITS) as usize;
            if start + self.taps > input.len() {
                break;
            }
            let phase = (((pos & FRAC_MASK) * PHASES as u64) >> FRAC_BITS) as usize;
            let row = &self.kernel[phase * self.taps..][..self.taps];
            let window = &input[start..start + self.taps];
            let acc: f32 = row.iter().zip(window).map(|(k, x)| k * x).sum();
            out.push(acc);
            pos += self.step;
        }

        let consumed = ((pos >> FRAC_BITS) as usize).min(input.len());
        self.position = pos - ((consumed as u64) << FRAC_BITS);
        consumed
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

fn windowed_sinc(u: f64, cutoff: f64, half_width: f64) -> f64 {
    if u.abs() >= half_width {
        return 0.0;
    }
    let x = 2.0 * cutoff * u;
    let sinc = if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    };
    // Blackman over [-half_width, half_width].
    let r = (u + half_width) / (2.0 * half_width);
    let window = 0.42 - 0.5 * (2.0 * PI * r).cos() + 0.08 * (4.0 * PI * r).cos();
    2.0 * cutoff * sinc * window
}
