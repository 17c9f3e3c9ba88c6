use std::f64::consts::PI;

use crate::{
    FilterError,
    spec::{FilterSpec, Response, Transform},
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn scale(self, k: f64) -> Self {
        Self::new(self.re * k, self.im * k)
    }

    fn add(self, o: Self) -> Self {
        Self::new(self.re + o.re, self.im + o.im)
    }

    fn sub(self, o: Self) -> Self {
        Self::new(self.re - o.re, self.im - o.im)
    }

    fn div(self, o: Self) -> Self {
        let d = o.re * o.re + o.im * o.im;
        Self::new(
            (self.re * o.re + self.im * o.im) / d,
            (self.im * o.re - self.re * o.im) / d,
        )
    }

    fn exp(self) -> Self {
        let m = self.re.exp();
        Self::new(m * self.im.cos(), m * self.im.sin())
    }

    fn norm_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }
}

/// One second- or first-order section, transposed direct form II.
#[derive(Debug, Clone)]
struct Section {
    b: [f64; 3],
    a: [f64; 3],
    s: [f64; 2],
}

impl Section {
    fn step(&mut self, x: f64) -> f64 {
        let y = self.b[0] * x + self.s[0];
        self.s[0] = self.b[1] * x - self.a[1] * y + self.s[1];
        self.s[1] = self.b[2] * x - self.a[2] * y;
        y
    }

    /// Response at `z = 1/w` for real `w` (used at DC and Nyquist).
    fn gain_at(&self, w: f64) -> f64 {
        let num = self.b[0] + self.b[1] * w + self.b[2] * w * w;
        let den = self.a[0] + self.a[1] * w + self.a[2] * w * w;
        num / den
    }
}

/// An IIR filter ready to run. Design-time poles and zeros are not retained.
#[derive(Debug, Clone)]
pub struct FilterHandle {
    sections: Vec<Section>,
    gain: f64,
}

impl FilterHandle {
    /// Filters one sample.
    pub fn step(&mut self, sample: f32) -> f32 {
        let mut y = sample as f64 * self.gain;
        for section in &mut self.sections {
            y = section.step(y);
        }
        y as f32
    }

    /// Clears the delay lines.
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.s = [0.0; 2];
        }
    }
}

/// Builds a filter from a spec string such as `"LpBuZ2/8000"`.
pub fn design_filter(spec: &str, sample_rate: f64) -> Result<FilterHandle, FilterError> {
    let spec: FilterSpec = spec.parse()?;
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(FilterError::InvalidSampleRate(sample_rate));
    }
    let nyquist_hz = sample_rate / 2.0;
    if !(spec.corner_hz > 0.0 && spec.corner_hz < nyquist_hz) {
        return Err(FilterError::InvalidFrequency {
            corner_hz: spec.corner_hz,
            nyquist_hz,
        });
    }
    Ok(butterworth(&spec, sample_rate))
}

fn butterworth(spec: &FilterSpec, fs: f64) -> FilterHandle {
    let n = spec.order as usize;
    let omega = match spec.transform {
        Transform::Bilinear => 2.0 * fs * (PI * spec.corner_hz / fs).tan(),
        Transform::MatchedZ => 2.0 * PI * spec.corner_hz,
    };

    // Zeros: lowpass has them at s = inf, highpass at s = 0.
    let zero = match (spec.response, spec.transform) {
        (Response::Lowpass, Transform::Bilinear) => Some(-1.0),
        (Response::Lowpass, Transform::MatchedZ) => None,
        (Response::Highpass, _) => Some(1.0),
    };

    let map = |s: Complex| match spec.transform {
        Transform::Bilinear => {
            let k = Complex::new(2.0 * fs, 0.0);
            k.add(s).div(k.sub(s))
        }
        Transform::MatchedZ => s.scale(1.0 / fs).exp(),
    };

    let analog = |k: usize| {
        let theta = PI * (2 * k + n + 1) as f64 / (2 * n) as f64;
        let p = Complex::new(theta.cos(), theta.sin());
        match spec.response {
            Response::Lowpass => p.scale(omega),
            Response::Highpass => Complex::new(omega, 0.0).div(p),
        }
    };

    let mut sections = Vec::with_capacity(n.div_ceil(2));
    for k in 0..n / 2 {
        let p = map(analog(k));
        let (b1, b2) = match zero {
            Some(z) => (-2.0 * z, z * z),
            None => (0.0, 0.0),
        };
        sections.push(Section {
            b: [1.0, b1, b2],
            a: [1.0, -2.0 * p.re, p.norm_sqr()],
            s: [0.0; 2],
        });
    }
    if n % 2 == 1 {
        let p = map(analog(n / 2));
        sections.push(Section {
            b: [1.0, zero.map_or(0.0, |z| -z), 0.0],
            a: [1.0, -p.re, 0.0],
            s: [0.0; 2],
        });
    }

    // Unity gain in the passband: DC for lowpass, Nyquist for highpass.
    let w = match spec.response {
        Response::Lowpass => 1.0,
        Response::Highpass => -1.0,
    };
    let passband: f64 = sections.iter().map(|s| s.gain_at(w)).product();

    FilterHandle {
        sections,
        gain: 1.0 / passband.abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(filter: &mut FilterHandle, signal: impl Fn(usize) -> f32, len: usize) -> f32 {
        let mut peak = 0.0f32;
        for i in 0..len {
            let y = filter.step(signal(i));
            if i > len / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn lowpass_has_unity_dc_gain() {
        for spec in ["LpBu2/1000", "LpBuZ2/1000", "LpBu3/5000", "LpBuZ5/5000"] {
            let mut f = design_filter(spec, 48_000.0).unwrap();
            let y = settle(&mut f, |_| 1.0, 20_000);
            assert!((y - 1.0).abs() < 1e-3, "{spec}: dc gain {y}");
        }
    }

    #[test]
    fn lowpass_attenuates_above_corner() {
        let mut f = design_filter("LpBuZ4/1000", 48_000.0).unwrap();
        let tone = |i: usize| (2.0 * std::f32::consts::PI * 12_000.0 * i as f32 / 48_000.0).sin();
        let y = settle(&mut f, tone, 10_000);
        assert!(y < 0.01, "12 kHz leaked through at {y}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = design_filter("HpBu1/20", 48_000.0).unwrap();
        let y = settle(&mut f, |_| 1.0, 200_000);
        assert!(y < 1e-3, "dc leaked through at {y}");
    }

    #[test]
    fn reset_clears_state() {
        let mut f = design_filter("LpBu2/500", 48_000.0).unwrap();
        for _ in 0..100 {
            f.step(1.0);
        }
        f.reset();
        let mut fresh = design_filter("LpBu2/500", 48_000.0).unwrap();
        assert_eq!(f.step(0.5), fresh.step(0.5));
    }

    #[test]
    fn corner_must_be_below_nyquist() {
        assert!(matches!(
            design_filter("LpBu2/30000", 48_000.0),
            Err(FilterError::InvalidFrequency { .. })
        ));
        assert_eq!(
            design_filter("LpBu2/100", 0.0).err(),
            Some(FilterError::InvalidSampleRate(0.0))
        );
    }
}
