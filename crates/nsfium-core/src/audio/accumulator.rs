//! Shared per-cycle audio accumulator.
//!
//! One slot per CPU cycle of the current frame window, in three planes:
//! the pulse sum, the weighted triangle/noise/DMC sum, and a linear f32 plane
//! for expansion chips. Fill routines add into `[from, to)` spans; the flush
//! mixes `[0, len)` and clears it.

use crate::audio::mixer;

#[derive(Debug, Clone)]
pub struct Accumulator {
    square: Vec<u8>,
    tnd: Vec<u16>,
    linear: Vec<f32>,
}

impl Accumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            square: vec![0; capacity],
            tnd: vec![0; capacity],
            linear: vec![0.0; capacity],
        }
    }

    /// Cycles the window can hold.
    pub fn capacity(&self) -> usize {
        self.square.len()
    }

    fn check(&self, from: u32, to: u32) -> (usize, usize) {
        let (from, to) = (from as usize, to as usize);
        assert!(
            to <= self.capacity(),
            "audio accumulator overrun: filled to {to}, capacity {}",
            self.capacity()
        );
        (from, to)
    }

    pub fn square_span(&mut self, from: u32, to: u32) -> &mut [u8] {
        let (from, to) = self.check(from, to);
        &mut self.square[from..to]
    }

    pub fn tnd_span(&mut self, from: u32, to: u32) -> &mut [u16] {
        let (from, to) = self.check(from, to);
        &mut self.tnd[from..to]
    }

    pub fn linear_span(&mut self, from: u32, to: u32) -> &mut [f32] {
        let (from, to) = self.check(from, to);
        &mut self.linear[from..to]
    }

    pub fn square(&self) -> &[u8] {
        &self.square
    }

    pub fn tnd(&self) -> &[u16] {
        &self.tnd
    }

    pub fn linear(&self) -> &[f32] {
        &self.linear
    }

    /// Mixes the first `len` slots onto `out` and clears them.
    pub fn mix_into(&mut self, len: u32, out: &mut Vec<f32>) {
        let (_, len) = self.check(0, len);
        out.reserve(len);
        let square = &mut self.square[..len];
        let tnd = &mut self.tnd[..len];
        let linear = &mut self.linear[..len];
        out.extend(
            square
                .iter()
                .zip(tnd.iter())
                .zip(linear.iter())
                .map(|((&s, &t), &l)| mixer::mix(s, t, l)),
        );
        square.fill(0);
        tnd.fill(0);
        linear.fill(0.0);
    }

    pub fn clear(&mut self) {
        self.square.fill(0);
        self.tnd.fill(0);
        self.linear.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mixer::{SQUARE_TABLE, TND_TABLE};

    #[test]
    fn mix_consumes_prefix_only() {
        let mut acc = Accumulator::new(8);
        acc.square_span(0, 4).fill(15);
        acc.tnd_span(2, 6).fill(45);
        acc.linear_span(5, 8).fill(0.25);

        let mut out = Vec::new();
        acc.mix_into(4, &mut out);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], SQUARE_TABLE[15]);
        assert_eq!(out[3], SQUARE_TABLE[15] + TND_TABLE[45]);
        assert!(acc.square()[..4].iter().all(|&s| s == 0));
        // Untouched beyond the mixed prefix.
        assert_eq!(acc.tnd()[5], 45);
        assert_eq!(acc.linear()[7], 0.25);
    }

    #[test]
    #[should_panic(expected = "overrun")]
    fn overrun_is_fatal() {
        let mut acc = Accumulator::new(16);
        acc.square_span(10, 17);
    }
}
