//! Konami VRC7: a six-channel two-operator FM synthesizer derived from the
//! YM2413 (OPLL).
//!
//! The chip produces one sample every 36 CPU cycles; between samples the
//! output is held. Registers are reached through an address latch at
//! `$9010` and a data port at `$9030`:
//!
//! | Register    | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | `$00-$07`   | custom instrument (instrument 0)                      |
//! | `$10-$15`   | F-number bits 0-7                                     |
//! | `$20-$25`   | sustain (5), key (4), block (1-3), F-number bit 8 (0) |
//! | `$30-$35`   | instrument (4-7), volume (0-3)                        |

mod patch;
mod slot;
mod tables;

use std::array;

use crate::{
    audio::Accumulator,
    bus::{Bus, Port},
    expansion::{ChipKind, ExpansionChip},
    memory::vrc7 as vrc7_mem,
};

use patch::Patch;
use slot::{EgState, Slot};
use tables::{AM_DP_WIDTH, PM_DP_WIDTH, TABLES};

const CHANNELS: usize = 6;
const CYCLES_PER_SAMPLE: u32 = 36;
/// One carrier at full level lands near a native pulse at full volume.
const OUTPUT_SCALE: f32 = 1.0 / 1700.0;

#[derive(Debug, Clone)]
pub struct Vrc7 {
    address: u8,
    regs: [u8; 0x40],
    /// Decoded instruments; entry 0 mirrors registers `$00-$07`.
    bank: [[Patch; 2]; 16],
    /// `[modulator, carrier]` per channel.
    slots: [[Slot; 2]; CHANNELS],
    keyed: [bool; CHANNELS],
    pm_phase: u32,
    am_phase: u32,

    mask: u32,
    last: u32,
    /// Cycles until the next chip sample.
    countdown: u32,
    level: f32,
}

impl Vrc7 {
    pub fn new(bus: &mut Bus<Port>, slot: u8) -> Self {
        bus.set_writer(vrc7_mem::ADDRESS..=vrc7_mem::ADDRESS, Port::Chip(slot));
        bus.set_writer(vrc7_mem::DATA..=vrc7_mem::DATA, Port::Chip(slot));
        Self::power_on()
    }

    fn power_on() -> Self {
        let regs = [0u8; 0x40];
        let mut chip = Self {
            address: 0,
            regs,
            bank: patch::bank(&[0; 8]),
            slots: array::from_fn(|_| [Slot::new(false), Slot::new(true)]),
            keyed: [false; CHANNELS],
            pm_phase: 0,
            am_phase: 0,
            mask: u32::MAX,
            last: 0,
            countdown: CYCLES_PER_SAMPLE,
            level: 0.0,
        };
        for ch in 0..CHANNELS {
            chip.load_channel(ch);
        }
        chip
    }

    fn custom_patch(&self) -> [u8; 8] {
        let mut dump = [0u8; 8];
        dump.copy_from_slice(&self.regs[..8]);
        dump
    }

    /// Pushes instrument, frequency, volume, and sustain from the channel
    /// registers into both operators and recomputes their derived fields.
    fn load_channel(&mut self, ch: usize) {
        let fnum = self.regs[0x10 + ch] as u32 | ((self.regs[0x20 + ch] as u32 & 1) << 8);
        let block = (self.regs[0x20 + ch] as u32 >> 1) & 7;
        let sustain = self.regs[0x20 + ch] & 0x20 != 0;
        let instrument = (self.regs[0x30 + ch] >> 4) as usize;
        let volume = self.regs[0x30 + ch] & 0x0F;

        let [modulator, carrier] = &mut self.slots[ch];
        modulator.patch = self.bank[instrument][0];
        carrier.patch = self.bank[instrument][1];
        carrier.set_volume(volume);
        carrier.set_sustain(sustain);
        for op in [modulator, carrier] {
            op.set_frequency(fnum, block);
            op.refresh();
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        let reg = reg as usize;
        let Some(slot) = self.regs.get_mut(reg) else {
            return;
        };
        *slot = value;
        match reg {
            0x00..=0x07 => {
                self.bank[0] = patch::decode(&self.custom_patch());
                for ch in 0..CHANNELS {
                    if self.regs[0x30 + ch] >> 4 == 0 {
                        self.load_channel(ch);
                    }
                }
            }
            0x10..=0x15 | 0x30..=0x35 => self.load_channel(reg & 0x0F),
            0x20..=0x25 => {
                let ch = reg & 0x0F;
                let key = value & 0x10 != 0;
                let [modulator, carrier] = &mut self.slots[ch];
                match (self.keyed[ch], key) {
                    (false, true) => {
                        modulator.key_on();
                        carrier.key_on();
                    }
                    (true, false) => carrier.key_off(),
                    _ => {}
                }
                self.keyed[ch] = key;
                self.load_channel(ch);
            }
            _ => {}
        }
    }

    fn render(&mut self) -> f32 {
        let t = &*TABLES;
        self.pm_phase = (self.pm_phase + t.pm_dphase) & (PM_DP_WIDTH - 1);
        self.am_phase = (self.am_phase + t.am_dphase) & (AM_DP_WIDTH - 1);
        let lfo_pm = t.lfo_pm(self.pm_phase);
        let lfo_am = t.lfo_am(self.am_phase);

        let mut sum = 0i32;
        for (ch, [modulator, carrier]) in self.slots.iter_mut().enumerate() {
            modulator.advance(lfo_pm, lfo_am);
            carrier.advance(lfo_pm, lfo_am);
            if carrier.state() == EgState::Finish {
                continue;
            }
            let out = carrier.carry(modulator.modulate());
            if self.mask & (1 << ch) != 0 {
                sum += out;
            }
        }
        sum as f32 * OUTPUT_SCALE
    }
}

impl ExpansionChip for Vrc7 {
    fn kind(&self) -> ChipKind {
        ChipKind::Vrc7
    }

    fn channel_count(&self) -> u32 {
        CHANNELS as u32
    }

    fn write(&mut self, addr: u16, value: u8, now: u32, acc: &mut Accumulator) {
        match addr {
            vrc7_mem::ADDRESS => self.address = value,
            vrc7_mem::DATA => {
                self.fill_up_to(now, acc);
                self.write_register(self.address, value);
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
                self.level = self.render();
                self.countdown = CYCLES_PER_SAMPLE;
            }
        }
        self.last = self.last.max(ts);
    }

    fn resync_to(&mut self, ts: u32) {
        self.last = ts;
    }

    fn set_channel_mask(&mut self, mask: u32) {
        self.mask = mask;
    }

    fn shutdown(&mut self) {
        let last = self.last;
        let mask = self.mask;
        *self = Self::power_on();
        self.last = last;
        self.mask = mask;
    }
}
