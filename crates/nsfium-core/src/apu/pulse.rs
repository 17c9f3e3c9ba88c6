//! Pulse channel state, including sweep and envelope units.

use super::{envelope::Envelope, length_counter::LengthCounter, tables::PULSE_DUTY_TABLE};
use crate::audio::Accumulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum PulseChannel {
    Pulse1,
    Pulse2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Sweep {
    enabled: bool,
    negate: bool,
    shift: u8,
    period: u8,
    divider: u8,
    reload: bool,
    channel: PulseChannel,
}

impl Sweep {
    fn new(channel: PulseChannel) -> Self {
        Self {
            enabled: false,
            negate: false,
            shift: 0,
            period: 0,
            divider: 0,
            reload: false,
            channel,
        }
    }

    fn write(&mut self, value: u8) {
        self.enabled = value & 0b1000_0000 != 0;
        self.period = (value >> 4) & 0b0000_0111;
        self.negate = value & 0b0000_1000 != 0;
        self.shift = value & 0b0000_0111;
        self.reload = true;
    }

    fn muted(&self, timer_period: u16) -> bool {
        timer_period < 8 || self.target_period(timer_period) > 0x07FF
    }

    /// Pulse 1 negates with ones' complement, pulse 2 with two's complement.
    fn target_period(&self, timer_period: u16) -> u16 {
        let delta = timer_period >> self.shift;
        if self.negate {
            match self.channel {
                PulseChannel::Pulse1 => timer_period.wrapping_sub(delta).wrapping_sub(1),
                PulseChannel::Pulse2 => timer_period.wrapping_sub(delta),
            }
        } else {
            timer_period.wrapping_add(delta)
        }
    }

    /// Half-frame clock.
    fn clock(&mut self, timer_period: &mut u16) {
        if self.divider == 0 || self.reload {
            if self.divider == 0 && self.enabled && self.shift != 0 && !self.muted(*timer_period)
            {
                // A negated target can only wrap below zero when the period
                // is under 8, which `muted` already rules out.
                *timer_period = self.target_period(*timer_period) & 0x07FF;
            }
            self.divider = self.period;
            self.reload = false;
        } else {
            self.divider -= 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Pulse {
    duty: u8,
    duty_pos: u8,
    timer: u16,
    timer_period: u16,
    /// The sequencer advances on every other timer reload (APU clock).
    phase_toggle: bool,
    envelope: Envelope,
    length: LengthCounter,
    sweep: Sweep,
    enabled: bool,
    /// Timestamp up to which this channel has been written into the
    /// accumulator.
    last: u32,
}

impl Pulse {
    pub(super) fn new(channel: PulseChannel) -> Self {
        Self {
            duty: 0,
            duty_pos: 0,
            timer: 0,
            timer_period: 0,
            phase_toggle: false,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            sweep: Sweep::new(channel),
            enabled: false,
            last: 0,
        }
    }

    pub(super) fn write_control(&mut self, value: u8) {
        self.duty = (value >> 6) & 0b0000_0011;
        self.envelope.configure(value);
    }

    pub(super) fn write_sweep(&mut self, value: u8) {
        self.sweep.write(value);
    }

    pub(super) fn write_timer_low(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0xFF00) | value as u16;
    }

    pub(super) fn write_timer_high(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | (((value & 0b0000_0111) as u16) << 8);
        self.duty_pos = 0;
        self.envelope.restart();
        self.length.load(value >> 3, self.enabled);
    }

    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length.clear();
        }
    }

    pub(super) fn clock_envelope(&mut self) {
        self.envelope.clock();
    }

    pub(super) fn clock_length(&mut self) {
        self.length.clock(self.envelope.halt_length());
    }

    pub(super) fn clock_sweep(&mut self) {
        self.sweep.clock(&mut self.timer_period);
    }

    pub(super) fn length_active(&self) -> bool {
        self.length.active()
    }

    fn output(&self) -> u8 {
        if !self.length.active() || self.sweep.muted(self.timer_period) {
            return 0;
        }

        if PULSE_DUTY_TABLE[self.duty as usize][self.duty_pos as usize] == 0 {
            0
        } else {
            self.envelope.output()
        }
    }

    /// Adds this channel's output for every cycle in `[last, to)` into the
    /// square plane, advancing the timer exactly as per-cycle clocking would.
    pub(super) fn fill(&mut self, to: u32, acc: &mut Accumulator, audible: bool) {
        let from = self.last;
        if to <= from {
            return;
        }
        let span = acc.square_span(from, to);
        let mut pos = 0usize;
        while pos < span.len() {
            let run = (self.timer as usize + 1).min(span.len() - pos);
            let level = if audible { self.output() } else { 0 };
            if level != 0 {
                span[pos..pos + run].iter_mut().for_each(|s| *s += level);
            }
            pos += run;
            if run == self.timer as usize + 1 {
                self.timer = self.timer_period;
                self.phase_toggle = !self.phase_toggle;
                if self.phase_toggle {
                    self.duty_pos = (self.duty_pos + 1) & 0b111;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sweeping(channel: PulseChannel, period: u16, sweep: u8) -> Pulse {
        let mut pulse = Pulse::new(channel);
        pulse.set_enabled(true);
        pulse.write_control(0b1011_1111);
        pulse.write_timer_low(period as u8);
        pulse.write_timer_high(((period >> 8) as u8) | 0b0000_1000);
        pulse.write_sweep(sweep);
        pulse
    }

    #[test]
    fn low_period_mutes() {
        let pulse = sweeping(PulseChannel::Pulse1, 7, 0);
        assert!(pulse.sweep.muted(pulse.timer_period));
        let pulse = sweeping(PulseChannel::Pulse1, 8, 0);
        assert!(!pulse.sweep.muted(pulse.timer_period));
    }

    #[test]
    fn overflowing_target_mutes_even_with_sweep_disabled() {
        // Shift 0, add mode: target = 2 * period.
        let pulse = sweeping(PulseChannel::Pulse2, 0x400, 0b0000_0000);
        assert!(pulse.sweep.muted(pulse.timer_period));
        assert_eq!(pulse.output(), 0);
    }

    #[test]
    fn shift_zero_never_updates_period() {
        let mut pulse = sweeping(PulseChannel::Pulse1, 0x100, 0b1000_0000);
        for _ in 0..8 {
            pulse.clock_sweep();
        }
        assert_eq!(pulse.timer_period, 0x100);
    }

    #[test]
    fn negate_differs_between_pulses() {
        let mut p1 = sweeping(PulseChannel::Pulse1, 0x100, 0b1000_1001);
        let mut p2 = sweeping(PulseChannel::Pulse2, 0x100, 0b1000_1001);
        p1.clock_sweep();
        p2.clock_sweep();
        assert_eq!(p1.timer_period, 0x100 - 0x80 - 1);
        assert_eq!(p2.timer_period, 0x100 - 0x80);
    }

    #[test]
    fn split_fill_matches_single_fill() {
        let mut a = sweeping(PulseChannel::Pulse1, 0x0FD, 0);
        let mut b = a;
        let mut acc_a = Accumulator::new(10_000);
        let mut acc_b = Accumulator::new(10_000);
        a.fill(9_000, &mut acc_a, true);
        for to in [1, 2, 255, 1_000, 1_001, 4_093, 9_000] {
            b.fill(to, &mut acc_b, true);
        }
        assert_eq!(acc_a.square(), acc_b.square());
        assert!(acc_a.square().iter().any(|&s| s == 15));
    }
}
