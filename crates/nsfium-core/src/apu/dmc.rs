//! Delta Modulation Channel (DMC) state machine.
//!
//! The output unit is clocked by the APU event loop; sample bytes arrive
//! through DMA performed by the system bus hook, which reads the byte at
//! [`Dmc::dma_request`] and hands it to [`Dmc::complete_dma`].

use super::tables::{DMC_SAMPLE_ADDR_STRIDE, DMC_SAMPLE_BASE, DMC_SAMPLE_LEN_STRIDE};
use crate::audio::Accumulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Dmc {
    irq_enable: bool,
    irq_pending: bool,
    loop_flag: bool,
    rates: &'static [u16; 16],
    /// Output clock period in CPU cycles.
    period: u16,
    /// Cycles until the next output clock; always at least 1.
    countdown: u32,
    output_level: u8,
    sample_address: u16,
    sample_length: u16,
    current_address: u16,
    bytes_remaining: u16,
    sample_buffer: Option<u8>,
    shift_register: u8,
    bits_remaining: u8,
    silence: bool,
    last: u32,
}

impl Dmc {
    pub(super) fn new(rates: &'static [u16; 16]) -> Self {
        Self {
            irq_enable: false,
            irq_pending: false,
            loop_flag: false,
            rates,
            period: rates[0],
            countdown: rates[0] as u32,
            output_level: 0,
            sample_address: DMC_SAMPLE_BASE,
            sample_length: 1,
            current_address: DMC_SAMPLE_BASE,
            bytes_remaining: 0,
            sample_buffer: None,
            shift_register: 0,
            bits_remaining: 8,
            silence: true,
            last: 0,
        }
    }

    pub(super) fn write_control(&mut self, value: u8) {
        self.irq_enable = value & 0b1000_0000 != 0;
        if !self.irq_enable {
            self.irq_pending = false;
        }
        self.loop_flag = value & 0b0100_0000 != 0;
        self.period = self.rates[(value & 0b0000_1111) as usize];
    }

    pub(super) fn write_direct_load(&mut self, value: u8) {
        self.output_level = value & 0b0111_1111;
    }

    pub(super) fn write_sample_address(&mut self, value: u8) {
        self.sample_address = DMC_SAMPLE_BASE.wrapping_add(value as u16 * DMC_SAMPLE_ADDR_STRIDE);
    }

    pub(super) fn write_sample_length(&mut self, value: u8) {
        self.sample_length = value as u16 * DMC_SAMPLE_LEN_STRIDE + 1;
    }

    /// `$4015` bit 4. Disabling drops the remaining bytes; enabling restarts
    /// the sample only when it has finished.
    pub(super) fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.bytes_remaining = 0;
        } else if self.bytes_remaining == 0 {
            self.restart();
        }
    }

    fn restart(&mut self) {
        self.current_address = self.sample_address;
        self.bytes_remaining = self.sample_length;
    }

    pub(super) fn active(&self) -> bool {
        self.bytes_remaining > 0
    }

    pub(super) fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    pub(super) fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    pub(super) fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Advances the output timer; returns true when the output unit must be
    /// clocked at the end of this span.
    pub(super) fn advance(&mut self, cycles: u32) -> bool {
        debug_assert!(cycles <= self.countdown);
        self.countdown -= cycles;
        if self.countdown == 0 {
            self.countdown = self.period as u32;
            true
        } else {
            false
        }
    }

    /// Output unit clock. Changes the output level, so the caller must have
    /// filled this channel up to the current time.
    pub(super) fn clock_output(&mut self) {
        if !self.silence {
            if self.shift_register & 1 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
        }
        self.shift_register >>= 1;
        self.bits_remaining -= 1;
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.sample_buffer.take() {
                Some(byte) => {
                    self.silence = false;
                    self.shift_register = byte;
                }
                None => self.silence = true,
            }
        }
    }

    /// Address the memory reader wants fetched, if the buffer is empty and
    /// bytes remain.
    pub(super) fn dma_request(&self) -> Option<u16> {
        (self.sample_buffer.is_none() && self.bytes_remaining > 0).then_some(self.current_address)
    }

    pub(super) fn complete_dma(&mut self, value: u8) {
        self.sample_buffer = Some(value);
        self.current_address = match self.current_address {
            0xFFFF => 0x8000,
            addr => addr + 1,
        };
        self.bytes_remaining -= 1;
        if self.bytes_remaining == 0 {
            if self.loop_flag {
                self.restart();
            } else if self.irq_enable {
                self.irq_pending = true;
            }
        }
    }

    pub(super) fn fill(&mut self, to: u32, acc: &mut Accumulator, audible: bool) {
        let from = self.last;
        if to <= from {
            return;
        }
        let level = self.output_level as u16;
        if audible && level != 0 {
            acc.tnd_span(from, to).iter_mut().for_each(|s| *s += level);
        }
        self.last = to;
    }

    pub(super) fn rebase(&mut self) {
        self.last = 0;
    }
}
