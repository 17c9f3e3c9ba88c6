//! Triangle channel state and linear counter.

use super::{length_counter::LengthCounter, tables::TRIANGLE_SEQUENCE};
use crate::audio::Accumulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(super) struct Triangle {
    control_flag: bool,
    linear_reload_value: u8,
    linear_counter: u8,
    linear_reload: bool,
    length: LengthCounter,
    timer: u16,
    timer_period: u16,
    sequence_pos: u8,
    enabled: bool,
    last: u32,
}

impl Triangle {
    pub(super) fn write_control(&mut self, value: u8) {
        self.control_flag = value & 0b1000_0000 != 0;
        self.linear_reload_value = value & 0b0111_1111;
    }

    pub(super) fn write_timer_low(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0xFF00) | value as u16;
    }

    pub(super) fn write_timer_high(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | (((value & 0b0000_0111) as u16) << 8);
        self.length.load(value >> 3, self.enabled);
        self.linear_reload = true;
        // Writing $400B does not reset the timer or the sequence position.
    }

    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length.clear();
        }
    }

    /// Quarter-frame clock.
    pub(super) fn clock_linear_counter(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_reload_value;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }

        if !self.control_flag {
            self.linear_reload = false;
        }
    }

    pub(super) fn clock_length(&mut self) {
        self.length.clock(self.control_flag);
    }

    pub(super) fn length_active(&self) -> bool {
        self.length.active()
    }

    fn gated(&self) -> bool {
        !self.length.active() || self.linear_counter == 0
    }

    /// The DAC holds the current step while the sequencer is gated.
    pub(super) fn fill(&mut self, to: u32, acc: &mut Accumulator, audible: bool) {
        let from = self.last;
        if to <= from {
            return;
        }
        let span = acc.tnd_span(from, to);
        let gated = self.gated();
        let mut pos = 0usize;
        while pos < span.len() {
            let run = (self.timer as usize + 1).min(span.len() - pos);
            if audible {
                let level = 3 * TRIANGLE_SEQUENCE[self.sequence_pos as usize] as u16;
                if level != 0 {
                    span[pos..pos + run].iter_mut().for_each(|s| *s += level);
                }
            }
            pos += run;
            if run == self.timer as usize + 1 {
                self.timer = self.timer_period;
                if !gated {
                    self.sequence_pos = (self.sequence_pos + 1) & 0b1_1111;
                }
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
