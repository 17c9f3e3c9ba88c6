//! Namco 163 wavetable audio.
//!
//! The chip keeps 128 bytes of internal RAM behind an address port at
//! `$F800` (bit 7 enables auto-increment) and a data port at `$4800`. The
//! top 64 bytes hold eight 8-byte voice records; the rest (and any unused
//! record) is free for 4-bit waveform samples, two per byte.
//!
//! Only one voice is updated every 15 CPU cycles, walking down from voice 7
//! through the `(ram[$7F] >> 4) & 7` + 1 active voices, and the output is the
//! average of the active voices.

use crate::{
    audio::Accumulator,
    bus::{Bus, Port},
    expansion::{ChipKind, ExpansionChip},
    memory::n163 as n163_mem,
};

const RAM_SIZE: usize = 0x80;
const VOICES: usize = 8;
const CYCLES_PER_UPDATE: u32 = 15;
const OUTPUT_SCALE: f32 = 1.0 / 512.0;

#[derive(Debug, Clone)]
pub struct Namco163 {
    ram: [u8; RAM_SIZE],
    ram_position: u8,
    auto_increment: bool,
    /// Last computed `sample * volume` per voice.
    voice_output: [i16; VOICES],
    current_voice: usize,
    countdown: u32,
    level: f32,
    mask: u32,
    last: u32,
}

impl Namco163 {
    pub fn new(bus: &mut Bus<Port>, slot: u8) -> Self {
        bus.set_reader(n163_mem::DATA_START..=n163_mem::DATA_END, Port::Chip(slot));
        bus.set_writer(n163_mem::DATA_START..=n163_mem::DATA_END, Port::Chip(slot));
        bus.set_writer(
            n163_mem::ADDRESS_START..=n163_mem::ADDRESS_END,
            Port::Chip(slot),
        );
        Self::power_on()
    }

    fn power_on() -> Self {
        Self {
            ram: [0; RAM_SIZE],
            ram_position: 0,
            auto_increment: false,
            voice_output: [0; VOICES],
            current_voice: VOICES - 1,
            countdown: CYCLES_PER_UPDATE,
            level: 0.0,
            mask: u32::MAX,
            last: 0,
        }
    }

    /// Active voices minus one.
    fn voice_span(&self) -> usize {
        ((self.ram[0x7F] >> 4) & 0x07) as usize
    }

    fn record(channel: usize) -> usize {
        0x40 + channel * 8
    }

    fn frequency(&self, channel: usize) -> u32 {
        let base = Self::record(channel);
        let lo = self.ram[base] as u32;
        let mid = self.ram[base + 2] as u32;
        let hi = (self.ram[base + 4] & 0x03) as u32;
        (hi << 16) | (mid << 8) | lo
    }

    fn phase(&self, channel: usize) -> u32 {
        let base = Self::record(channel);
        let lo = self.ram[base + 1] as u32;
        let mid = self.ram[base + 3] as u32;
        let hi = self.ram[base + 5] as u32;
        (hi << 16) | (mid << 8) | lo
    }

    fn set_phase(&mut self, channel: usize, phase: u32) {
        let base = Self::record(channel);
        self.ram[base + 5] = (phase >> 16) as u8;
        self.ram[base + 3] = (phase >> 8) as u8;
        self.ram[base + 1] = phase as u8;
    }

    /// Waveform length in 4-bit samples.
    fn wave_length(&self, channel: usize) -> u32 {
        256 - (self.ram[Self::record(channel) + 4] & 0xFC) as u32
    }

    fn update_voice(&mut self, channel: usize) {
        let base = Self::record(channel);
        let length = self.wave_length(channel);
        let phase = (self.phase(channel) + self.frequency(channel)) % (length << 16);
        self.set_phase(channel, phase);

        let position = ((phase >> 16) as u8).wrapping_add(self.ram[base + 6]);
        let byte = self.ram[(position >> 1) as usize & (RAM_SIZE - 1)];
        let nibble = if position & 1 != 0 { byte >> 4 } else { byte & 0x0F };
        let volume = (self.ram[base + 7] & 0x0F) as i16;
        self.voice_output[channel] = (nibble as i16 - 8) * volume;
        self.update_level();
    }

    fn update_level(&mut self) {
        let span = self.voice_span();
        let first = VOICES - 1 - span;
        let sum: i32 = (first..VOICES)
            .filter(|&ch| self.mask & (1 << ch) != 0)
            .map(|ch| self.voice_output[ch] as i32)
            .sum();
        self.level = sum as f32 / (span + 1) as f32 * OUTPUT_SCALE;
    }

    fn step(&mut self) {
        let channel = self.current_voice;
        self.update_voice(channel);
        let first = VOICES - 1 - self.voice_span();
        self.current_voice = if channel <= first {
            VOICES - 1
        } else {
            channel - 1
        };
    }

    fn advance_position(&mut self) {
        if self.auto_increment {
            self.ram_position = (self.ram_position + 1) & 0x7F;
        }
    }
}

impl ExpansionChip for Namco163 {
    fn kind(&self) -> ChipKind {
        ChipKind::Namco163
    }

    fn channel_count(&self) -> u32 {
        VOICES as u32
    }

    fn read(&mut self, addr: u16, bus_value: u8) -> u8 {
        match addr {
            n163_mem::DATA_START..=n163_mem::DATA_END => {
                let value = self.ram[self.ram_position as usize];
                self.advance_position();
                value
            }
            _ => bus_value,
        }
    }

    fn write(&mut self, addr: u16, value: u8, now: u32, acc: &mut Accumulator) {
        match addr {
            n163_mem::DATA_START..=n163_mem::DATA_END => {
                self.fill_up_to(now, acc);
                self.ram[self.ram_position as usize] = value;
                self.advance_position();
            }
            n163_mem::ADDRESS_START..=n163_mem::ADDRESS_END => {
                self.ram_position = value & 0x7F;
                self.auto_increment = value & 0x80 != 0;
            }
            _ => {}
        }
    }

    fn fill_up_to(&mut self, ts: u32, acc: &mut Accumulator) {
        let mut t = self.last;
        while t < ts {
            let run = self.countdown.min(ts - t);
            if self.level != 0.0 {
                let level = self.level;
                acc.linear_span(t, t + run).iter_mut().for_each(|s| *s += level);
            }
            t += run;
            self.countdown -= run;
            if self.countdown == 0 {
                self.countdown = CYCLES_PER_UPDATE;
                self.step();
            }
        }
        self.last = self.last.max(ts);
    }

    fn resync_to(&mut self, ts: u32) {
        self.last = ts;
    }

    fn set_channel_mask(&mut self, mask: u32) {
        self.mask = mask;
        self.update_level();
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

    fn chip() -> (Namco163, Accumulator) {
        let mut bus = Bus::new();
        (Namco163::new(&mut bus, 0), Accumulator::new(20_000))
    }

    /// Streams `bytes` into RAM from `start` through the auto-increment port.
    fn upload(chip: &mut Namco163, acc: &mut Accumulator, start: u8, bytes: &[u8]) {
        chip.write(0xF800, 0x80 | start, 0, acc);
        for &b in bytes {
            chip.write(0x4800, b, 0, acc);
        }
    }

    /// One voice (voice 7) playing a 16-sample square wave from address 0.
    fn square_voice(chip: &mut Namco163, acc: &mut Accumulator, volume: u8) {
        upload(chip, acc, 0x00, &[0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]);
        // freq 0x02000, length 256 - 0xF0 = 16 samples, wave at 0.
        upload(
            chip,
            acc,
            0x78,
            &[0x00, 0x00, 0x20, 0x00, 0xF0, 0x00, 0x00, volume],
        );
    }

    #[test]
    fn address_port_auto_increments_reads() {
        let (mut chip, mut acc) = chip();
        upload(&mut chip, &mut acc, 0x10, &[1, 2, 3]);
        chip.write(0xF800, 0x90, 0, &mut acc);
        assert_eq!(chip.read(0x4800, 0), 1);
        assert_eq!(chip.read(0x4800, 0), 2);
        // Without auto-increment the position stays put.
        chip.write(0xF800, 0x12, 0, &mut acc);
        assert_eq!(chip.read(0x4800, 0), 3);
        assert_eq!(chip.read(0x4800, 0), 3);
        // Position wraps within the 128 bytes.
        upload(&mut chip, &mut acc, 0x7F, &[0x00, 0xAA]);
        assert_eq!(chip.ram[0], 0xAA);
    }

    #[test]
    fn single_voice_produces_square_output() {
        let (mut chip, mut acc) = chip();
        square_voice(&mut chip, &mut acc, 15);
        chip.fill_up_to(15 * 256, &mut acc);
        let linear = &acc.linear()[..15 * 256];
        let hi = 7.0 * 15.0 * OUTPUT_SCALE;
        let lo = -8.0 * 15.0 * OUTPUT_SCALE;
        assert!(linear.iter().any(|&s| s == hi));
        assert!(linear.iter().any(|&s| s == lo));
        assert!(linear.iter().all(|&s| s == hi || s == lo || s == 0.0));
    }

    #[test]
    fn phase_is_written_back_to_ram() {
        let (mut chip, mut acc) = chip();
        square_voice(&mut chip, &mut acc, 15);
        chip.fill_up_to(15 * 3, &mut acc);
        assert_eq!(chip.phase(7), 3 * 0x2000);
    }

    #[test]
    fn more_voices_lower_each_voice_share() {
        let (mut chip, mut acc) = chip();
        square_voice(&mut chip, &mut acc, 15);
        // Two active voices; voice 6 stays silent at volume 0.
        upload(&mut chip, &mut acc, 0x7F, &[0x1F]);
        chip.fill_up_to(15 * 256, &mut acc);
        let peak = acc.linear()[..15 * 256]
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));
        assert_eq!(peak, 8.0 * 15.0 / 2.0 * OUTPUT_SCALE);
    }

    #[test]
    fn masked_voice_is_silent() {
        let (mut chip, mut acc) = chip();
        chip.set_channel_mask(!(1 << 7));
        square_voice(&mut chip, &mut acc, 15);
        chip.fill_up_to(15 * 256, &mut acc);
        assert!(acc.linear()[..15 * 256].iter().all(|&s| s == 0.0));
    }
}
