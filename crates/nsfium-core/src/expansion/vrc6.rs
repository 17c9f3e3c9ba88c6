//! Konami VRC6: two pulse voices with eight duty settings and a sawtooth.
//!
//! | Address        | Bits        | Meaning                                   |
//! |----------------|-------------|-------------------------------------------|
//! | `$9000/$A000`  | `MDDD VVVV` | digitized mode, duty, volume              |
//! | `$9001/$A001`  | `PPPP PPPP` | period bits 0-7                           |
//! | `$9002/$A002`  | `E... PPPP` | enable, period bits 8-11                  |
//! | `$9003`        | `.... .ABH` | halt, period shift by 4 (B) or 8 (A)      |
//! | `$B000`        | `..RR RRRR` | accumulator rate                          |
//! | `$B001-$B002`  |             | period, as for the pulses                 |

use crate::{
    audio::Accumulator,
    bus::{Bus, Port},
    expansion::{ChipKind, ExpansionChip},
    memory::vrc6 as vrc6_mem,
};

const VOICES: usize = 3;
const SAW: usize = 2;
/// A full-volume pulse lands near a native pulse at full volume.
const OUTPUT_SCALE: f32 = 1.0 / 101.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
struct Voice {
    /// Pulse: `MDDD VVVV`. Saw: accumulator rate in bits 0-5.
    control: u8,
    period: u16,
    enabled: bool,
    /// Cycles until the next timer clock, minus one.
    timer: u16,
    /// Pulse duty step (counts down from 15) or saw clock count (0..14).
    step: u8,
    accumulator: u8,
}

impl Voice {
    fn write_period_high(&mut self, value: u8) {
        self.period = (self.period & 0x00FF) | ((value as u16 & 0x0F) << 8);
        self.enabled = value & 0x80 != 0;
    }

    fn write_period_low(&mut self, value: u8) {
        self.period = (self.period & 0x0F00) | value as u16;
    }

    fn pulse_level(&self) -> u8 {
        let volume = self.control & 0x0F;
        let duty = (self.control >> 4) & 0x07;
        let digitized = self.control & 0x80 != 0;
        if self.enabled && (digitized || self.step <= duty) {
            volume
        } else {
            0
        }
    }

    fn saw_level(&self) -> u8 {
        if self.enabled {
            self.accumulator >> 3
        } else {
            0
        }
    }

    fn clock_pulse(&mut self) {
        self.step = self.step.wrapping_sub(1) & 0x0F;
    }

    fn clock_saw(&mut self) {
        self.step = self.step.wrapping_add(1);
        if self.step >= 14 {
            self.step = 0;
            self.accumulator = 0;
        } else if self.step & 1 == 0 {
            self.accumulator = self.accumulator.wrapping_add(self.control & 0x3F);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vrc6 {
    voices: [Voice; VOICES],
    halt: bool,
    /// Right shift applied to every period by `$9003`.
    period_shift: u8,
    mask: u32,
    last: u32,
}

impl Vrc6 {
    pub fn new(bus: &mut Bus<Port>, slot: u8) -> Self {
        bus.set_writer(
            vrc6_mem::PULSE1_START..=vrc6_mem::FREQUENCY_CONTROL,
            Port::Chip(slot),
        );
        bus.set_writer(vrc6_mem::PULSE2_START..=vrc6_mem::PULSE2_END, Port::Chip(slot));
        bus.set_writer(vrc6_mem::SAW_START..=vrc6_mem::SAW_END, Port::Chip(slot));
        Self::power_on()
    }

    fn power_on() -> Self {
        let pulse = Voice {
            step: 15,
            ..Voice::default()
        };
        Self {
            voices: [pulse, pulse, Voice::default()],
            halt: false,
            period_shift: 0,
            mask: u32::MAX,
            last: 0,
        }
    }

    fn level(&self, index: usize) -> u8 {
        if self.mask & (1 << index) == 0 {
            return 0;
        }
        let voice = &self.voices[index];
        if index == SAW {
            voice.saw_level()
        } else {
            voice.pulse_level()
        }
    }

    fn reload(&self, index: usize) -> u16 {
        self.voices[index].period >> self.period_shift
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        let index = match addr & 0xF000 {
            0x9000 => 0,
            0xA000 => 1,
            _ => SAW,
        };
        match addr & 0x0003 {
            0 => self.voices[index].control = value,
            1 => self.voices[index].write_period_low(value),
            2 => {
                let voice = &mut self.voices[index];
                voice.write_period_high(value);
                if !voice.enabled {
                    if index == SAW {
                        voice.step = 0;
                        voice.accumulator = 0;
                    } else {
                        voice.step = 15;
                    }
                }
            }
            _ if index == 0 => {
                self.halt = value & 0x01 != 0;
                self.period_shift = if value & 0x04 != 0 {
                    8
                } else if value & 0x02 != 0 {
                    4
                } else {
                    0
                };
            }
            _ => {}
        }
    }

    fn fill_voice(&mut self, index: usize, to: u32, acc: &mut Accumulator) {
        let mut t = self.last;
        while t < to {
            let voice = self.voices[index];
            let run = if self.halt || !voice.enabled {
                to - t
            } else {
                (voice.timer as u32 + 1).min(to - t)
            };
            let level = self.level(index);
            if level != 0 {
                let sample = level as f32 * OUTPUT_SCALE;
                acc.linear_span(t, t + run).iter_mut().for_each(|s| *s += sample);
            }
            t += run;
            if self.halt || !voice.enabled {
                continue;
            }
            let reload = self.reload(index);
            let voice = &mut self.voices[index];
            if run == voice.timer as u32 + 1 {
                voice.timer = reload;
                if index == SAW {
                    voice.clock_saw();
                } else {
                    voice.clock_pulse();
                }
            } else {
                voice.timer -= run as u16;
            }
        }
    }
}

impl ExpansionChip for Vrc6 {
    fn kind(&self) -> ChipKind {
        ChipKind::Vrc6
    }

    fn channel_count(&self) -> u32 {
        VOICES as u32
    }

    fn write(&mut self, addr: u16, value: u8, now: u32, acc: &mut Accumulator) {
        self.fill_up_to(now, acc);
        self.write_register(addr, value);
    }

    fn fill_up_to(&mut self, ts: u32, acc: &mut Accumulator) {
        if ts <= self.last {
            return;
        }
        for index in 0..VOICES {
            self.fill_voice(index, ts, acc);
        }
        self.last = ts;
    }

    fn resync_to(&mut self, ts: u32) {
        self.last = ts;
    }

    fn set_channel_mask(&mut self, mask: u32) {
        self.mask = mask;
    }

    fn shutdown(&mut self) {
        let (last, mask) = (self.last, self.mask);
        *self = Self::power_on();
        self.last = last;
        self.mask = mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip() -> (Vrc6, Accumulator) {
        let mut bus = Bus::new();
        (Vrc6::new(&mut bus, 0), Accumulator::new(20_000))
    }

    fn levels(acc: &Accumulator, to: usize) -> Vec<f32> {
        let mut seen: Vec<f32> = Vec::new();
        for &s in &acc.linear()[..to] {
            if !seen.contains(&s) {
                seen.push(s);
            }
        }
        seen
    }

    #[test]
    fn installs_all_register_ranges() {
        let mut bus = Bus::new();
        Vrc6::new(&mut bus, 2);
        for addr in [0x9000, 0x9003, 0xA002, 0xB000, 0xB002] {
            assert_eq!(bus.writers(addr), &[Port::Chip(2)], "{addr:04x}");
        }
        assert!(bus.writers(0xA003).is_empty());
    }

    #[test]
    fn pulse_duty_is_eight_steps_of_sixteen() {
        let (mut chip, mut acc) = chip();
        // Duty 7 (8/16), volume 15, period 9 -> 10 cycles per step.
        chip.write(0x9000, 0b0111_1111, 0, &mut acc);
        chip.write(0x9001, 9, 0, &mut acc);
        chip.write(0x9002, 0x80, 0, &mut acc);
        chip.fill_up_to(1_600, &mut acc);
        let high = acc.linear()[..1_600].iter().filter(|&&s| s > 0.0).count();
        assert_eq!(high, 800);
        assert_eq!(levels(&acc, 1_600).len(), 2);
    }

    #[test]
    fn digitized_mode_outputs_volume() {
        let (mut chip, mut acc) = chip();
        chip.write(0xA000, 0x80 | 6, 0, &mut acc);
        chip.write(0xA002, 0x80, 0, &mut acc);
        chip.fill_up_to(100, &mut acc);
        assert!(acc.linear()[..100].iter().all(|&s| s == 6.0 * OUTPUT_SCALE));
    }

    #[test]
    fn saw_ramps_and_resets() {
        let (mut chip, mut acc) = chip();
        chip.write(0xB000, 42, 0, &mut acc);
        chip.write(0xB001, 0, 0, &mut acc);
        chip.write(0xB002, 0x80, 0, &mut acc);
        chip.fill_up_to(14, &mut acc);
        // 42 * 6 = 252 -> 31 at the peak, back to 0 after 14 clocks.
        let steps: Vec<u8> = acc.linear()[..14]
            .iter()
            .map(|s| (s / OUTPUT_SCALE).round() as u8)
            .collect();
        assert_eq!(steps, vec![0, 0, 5, 5, 10, 10, 15, 15, 21, 21, 26, 26, 31, 31]);
        chip.fill_up_to(15, &mut acc);
        assert_eq!(acc.linear()[14], 0.0);
    }

    #[test]
    fn saw_starts_from_zero_after_power_on() {
        let (mut chip, mut acc) = chip();
        assert_eq!(chip.voices[SAW].step, 0);
        chip.write(0xB000, 8, 0, &mut acc);
        chip.write(0xB001, 0, 0, &mut acc);
        chip.write(0xB002, 0x80, 0, &mut acc);
        // Several full cycles; the ramp must never pass 6 * 8 = 48 (level 6).
        chip.fill_up_to(14 * 20, &mut acc);
        let peak = acc.linear()[..14 * 20]
            .iter()
            .map(|s| (s / OUTPUT_SCALE).round() as u8)
            .max();
        assert_eq!(peak, Some(6));

        // A stray out-of-range step folds back into the cycle.
        chip.voices[SAW].step = 200;
        chip.fill_up_to(14 * 20 + 1, &mut acc);
        assert_eq!(chip.voices[SAW].step, 0);
    }

    #[test]
    fn halt_and_mask_freeze_output() {
        let (mut chip, mut acc) = chip();
        chip.write(0x9000, 0x8F, 0, &mut acc);
        chip.write(0x9002, 0x80, 0, &mut acc);
        chip.set_channel_mask(0b110);
        chip.fill_up_to(50, &mut acc);
        assert!(acc.linear()[..50].iter().all(|&s| s == 0.0));

        chip.set_channel_mask(!0);
        chip.write(0x9003, 0x01, 50, &mut acc);
        chip.fill_up_to(100, &mut acc);
        assert!(acc.linear()[50..100].iter().all(|&s| s == 15.0 * OUTPUT_SCALE));
    }
}
