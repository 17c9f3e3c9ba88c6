//! Noise channel state and linear feedback shift register (LFSR).

use super::{envelope::Envelope, length_counter::LengthCounter};
use crate::audio::Accumulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Noise {
    envelope: Envelope,
    length: LengthCounter,
    /// Short ("metallic") mode, bit 7 of `$400E`.
    mode: bool,
    timer_period: u16,
    timer: u16,
    shift_register: u16,
    enabled: bool,
    periods: &'static [u16; 16],
    last: u32,
}

impl Noise {
    pub(super) fn new(periods: &'static [u16; 16]) -> Self {
        Self {
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            mode: false,
            timer_period: periods[0] - 1,
            timer: 0,
            shift_register: 1,
            enabled: false,
            periods,
            last: 0,
        }
    }

    pub(super) fn write_control(&mut self, value: u8) {
        self.envelope.configure(value);
    }

    pub(super) fn write_mode_and_period(&mut self, value: u8) {
        self.mode = value & 0b1000_0000 != 0;
        self.timer_period = self.periods[(value & 0b0000_1111) as usize] - 1;
    }

    pub(super) fn write_length(&mut self, value: u8) {
        self.length.load(value >> 3, self.enabled);
        self.envelope.restart();
    }

    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length.clear();
        }
    }

    /// Long mode feeds back bit 1 (period 32767), short mode bit 6 (period
    /// 93 or 31 depending on the seed).
    fn step_lfsr(&mut self) {
        let tap = if self.mode { 6 } else { 1 };
        let bit = (self.shift_register ^ (self.shift_register >> tap)) & 1;
        self.shift_register >>= 1;
        self.shift_register |= bit << 14;
    }

    pub(super) fn clock_envelope(&mut self) {
        self.envelope.clock();
    }

    pub(super) fn clock_length(&mut self) {
        self.length.clock(self.envelope.halt_length());
    }

    pub(super) fn length_active(&self) -> bool {
        self.length.active()
    }

    fn output(&self) -> u8 {
        if !self.length.active() || (self.shift_register & 1) != 0 {
            0
        } else {
            self.envelope.output()
        }
    }

    pub(super) fn fill(&mut self, to: u32, acc: &mut Accumulator, audible: bool) {
        let from = self.last;
        if to <= from {
            return;
        }
        let span = acc.tnd_span(from, to);
        let mut pos = 0usize;
        while pos < span.len() {
            let run = (self.timer as usize + 1).min(span.len() - pos);
            let level = if audible { 2 * self.output() as u16 } else { 0 };
            if level != 0 {
                span[pos..pos + run].iter_mut().for_each(|s| *s += level);
            }
            pos += run;
            if run == self.timer as usize + 1 {
                self.timer = self.timer_period;
                self.step_lfsr();
            } else {
                self.timer -= run as u16;
            }
        }
        self.last = to;
    }

    pub(super) fn rebase(&mut self) {
        self.last = 0;
    }
}
