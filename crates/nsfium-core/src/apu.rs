//! Audio Processing Unit (APU).
//!
//! The 2A03 exposes five sound generators (2x pulse, triangle, noise, DMC)
//! behind the `$4000-$4017` registers. Channels do not run every cycle;
//! each remembers how far it has written into the shared [`Accumulator`] and
//! fills forward only when its state is about to change (a register write, a
//! frame-sequencer clock, a DMC output step) or when the frame is flushed.

mod dmc;
mod envelope;
mod frame_counter;
mod length_counter;
mod noise;
mod pulse;
mod tables;
mod triangle;

use core::fmt;

use tracing::trace;

use crate::{
    audio::{Accumulator, ChannelMask},
    bus::{Bus, Port},
    config::Region,
    cpu::IrqSource,
    memory::apu::{self as apu_mem, Register},
};

pub use frame_counter::FrameCounterMode;

use dmc::Dmc;
use frame_counter::{FrameCounter, FrameTick};
use noise::Noise;
use pulse::{Pulse, PulseChannel};
use triangle::Triangle;

#[derive(Clone)]
pub struct Apu {
    region: Region,
    frame_counter: FrameCounter,
    pulse: [Pulse; 2],
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    /// Cycles reported by the CPU hook since the last rebase.
    now: u32,
    mask: ChannelMask,
}

impl fmt::Debug for Apu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Apu")
            .field("region", &self.region)
            .field("frame_counter", &self.frame_counter)
            .field("now", &self.now)
            .field("mask", &self.mask)
            .finish()
    }
}

impl Apu {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            frame_counter: FrameCounter::new(region.frame_step_half_cycles()),
            pulse: [
                Pulse::new(PulseChannel::Pulse1),
                Pulse::new(PulseChannel::Pulse2),
            ],
            triangle: Triangle::default(),
            noise: Noise::new(tables::noise_periods(region)),
            dmc: Dmc::new(tables::dmc_rates(region)),
            now: 0,
            mask: ChannelMask::all(),
        }
    }

    /// Registers the APU's readers and writers on the bus.
    pub fn install_handlers(bus: &mut Bus<Port>) {
        bus.set_reader(apu_mem::STATUS..=apu_mem::STATUS, Port::ApuStatus);
        bus.set_writer(
            apu_mem::REGISTER_BASE..=apu_mem::CHANNEL_REGISTER_END,
            Port::ApuRegister,
        );
        bus.set_writer(apu_mem::STATUS..=apu_mem::STATUS, Port::ApuRegister);
        bus.set_writer(
            apu_mem::FRAME_COUNTER..=apu_mem::FRAME_COUNTER,
            Port::ApuRegister,
        );
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn now(&self) -> u32 {
        self.now
    }

    pub fn frame_mode(&self) -> FrameCounterMode {
        self.frame_counter.mode()
    }

    pub fn set_channel_mask(&mut self, mask: ChannelMask) {
        self.mask = mask;
    }

    /// Levels of the APU's IRQ lines.
    pub fn irq_lines(&self) -> IrqSource {
        let mut lines = IrqSource::empty();
        lines.set(IrqSource::FRAME_COUNTER, self.frame_counter.irq_pending());
        lines.set(IrqSource::DMC, self.dmc.irq_pending());
        lines
    }

    /// Advances the frame sequencer and the DMC timer by `cycles`, firing
    /// their events in time order. Sample fetches the DMC raises on the way
    /// are left to the caller; see [`Apu::run_until_fetch`].
    pub fn on_cpu_cycles(&mut self, cycles: u32, acc: &mut Accumulator) {
        let mut remaining = cycles;
        while remaining > 0 {
            remaining -= self.run_until_fetch(remaining, acc);
        }
    }

    /// Like [`Apu::on_cpu_cycles`], but stops right after the DMC output
    /// clock that empties the sample buffer, so the byte can be fetched at
    /// the cycle it is due. Returns the cycles actually run.
    pub fn run_until_fetch(&mut self, cycles: u32, acc: &mut Accumulator) -> u32 {
        let mut ran = 0;
        while ran < cycles {
            let span = (cycles - ran)
                .min(self.frame_counter.cycles_until_step())
                .min(self.dmc.countdown());
            self.now += span;
            ran += span;

            let mut fetch_due = false;
            if self.dmc.advance(span) {
                self.dmc.fill(self.now, acc, self.mask.contains(ChannelMask::DMC));
                self.dmc.clock_output();
                fetch_due = self.dmc.dma_request().is_some();
            }
            if let Some(tick) = self.frame_counter.advance(span) {
                self.fill_sequenced(acc);
                self.apply_frame_tick(tick);
            }
            if fetch_due {
                break;
            }
        }
        ran
    }

    /// `$4015` read. Clears the frame IRQ.
    pub fn read_status(&mut self, bus_value: u8) -> u8 {
        let mut value = bus_value & 0b0010_0000;
        value |= self.pulse[0].length_active() as u8;
        value |= (self.pulse[1].length_active() as u8) << 1;
        value |= (self.triangle.length_active() as u8) << 2;
        value |= (self.noise.length_active() as u8) << 3;
        value |= (self.dmc.active() as u8) << 4;
        value |= (self.frame_counter.irq_pending() as u8) << 6;
        value |= (self.dmc.irq_pending() as u8) << 7;
        self.frame_counter.clear_irq();
        value
    }

    /// Register write. The channels whose state changes are filled to the
    /// current time first.
    pub fn write(&mut self, addr: u16, value: u8, acc: &mut Accumulator) {
        let Some(reg) = Register::from_cpu_addr(addr) else {
            return;
        };
        let now = self.now;
        let mask = self.mask;
        match reg {
            Register::Pulse1Control
            | Register::Pulse1Sweep
            | Register::Pulse1TimerLow
            | Register::Pulse1TimerHigh => {
                self.pulse[0].fill(now, acc, mask.contains(ChannelMask::PULSE1));
            }
            Register::Pulse2Control
            | Register::Pulse2Sweep
            | Register::Pulse2TimerLow
            | Register::Pulse2TimerHigh => {
                self.pulse[1].fill(now, acc, mask.contains(ChannelMask::PULSE2));
            }
            Register::TriangleControl | Register::TriangleTimerLow | Register::TriangleTimerHigh => {
                self.triangle
                    .fill(now, acc, mask.contains(ChannelMask::TRIANGLE));
            }
            Register::NoiseControl | Register::NoiseModeAndPeriod | Register::NoiseLength => {
                self.noise.fill(now, acc, mask.contains(ChannelMask::NOISE));
            }
            Register::DmcControl
            | Register::DmcDirectLoad
            | Register::DmcSampleAddress
            | Register::DmcSampleLength => {
                self.dmc.fill(now, acc, mask.contains(ChannelMask::DMC));
            }
            Register::Status | Register::FrameCounter => self.fill(acc),
        }

        match reg {
            Register::Pulse1Control => self.pulse[0].write_control(value),
            Register::Pulse1Sweep => self.pulse[0].write_sweep(value),
            Register::Pulse1TimerLow => self.pulse[0].write_timer_low(value),
            Register::Pulse1TimerHigh => self.pulse[0].write_timer_high(value),
            Register::Pulse2Control => self.pulse[1].write_control(value),
            Register::Pulse2Sweep => self.pulse[1].write_sweep(value),
            Register::Pulse2TimerLow => self.pulse[1].write_timer_low(value),
            Register::Pulse2TimerHigh => self.pulse[1].write_timer_high(value),
            Register::TriangleControl => self.triangle.write_control(value),
            Register::TriangleTimerLow => self.triangle.write_timer_low(value),
            Register::TriangleTimerHigh => self.triangle.write_timer_high(value),
            Register::NoiseControl => self.noise.write_control(value),
            Register::NoiseModeAndPeriod => self.noise.write_mode_and_period(value),
            Register::NoiseLength => self.noise.write_length(value),
            Register::DmcControl => self.dmc.write_control(value),
            Register::DmcDirectLoad => self.dmc.write_direct_load(value),
            Register::DmcSampleAddress => self.dmc.write_sample_address(value),
            Register::DmcSampleLength => self.dmc.write_sample_length(value),
            Register::Status => self.write_status(value),
            Register::FrameCounter => {
                if self.frame_counter.configure(value) {
                    self.apply_frame_tick(FrameTick {
                        quarter: true,
                        half: true,
                        irq: false,
                    });
                }
            }
        }
    }

    fn write_status(&mut self, value: u8) {
        self.pulse[0].set_enabled(value & 0b0000_0001 != 0);
        self.pulse[1].set_enabled(value & 0b0000_0010 != 0);
        self.triangle.set_enabled(value & 0b0000_0100 != 0);
        self.noise.set_enabled(value & 0b0000_1000 != 0);
        self.dmc.set_enabled(value & 0b0001_0000 != 0);
        self.dmc.clear_irq();
    }

    /// Pending DMC sample fetch, if any.
    pub fn dma_request(&self) -> Option<u16> {
        self.dmc.dma_request()
    }

    /// Delivers the byte fetched for [`Apu::dma_request`].
    pub fn complete_dma(&mut self, value: u8) {
        trace!("dmc fetched {:02x}", value);
        self.dmc.complete_dma(value);
    }

    fn apply_frame_tick(&mut self, tick: FrameTick) {
        if tick.quarter {
            self.pulse[0].clock_envelope();
            self.pulse[1].clock_envelope();
            self.noise.clock_envelope();
            self.triangle.clock_linear_counter();
        }
        if tick.half {
            for pulse in &mut self.pulse {
                pulse.clock_length();
                pulse.clock_sweep();
            }
            self.triangle.clock_length();
            self.noise.clock_length();
        }
    }

    /// Fills the channels the frame sequencer clocks.
    fn fill_sequenced(&mut self, acc: &mut Accumulator) {
        let now = self.now;
        let mask = self.mask;
        self.pulse[0].fill(now, acc, mask.contains(ChannelMask::PULSE1));
        self.pulse[1].fill(now, acc, mask.contains(ChannelMask::PULSE2));
        self.triangle
            .fill(now, acc, mask.contains(ChannelMask::TRIANGLE));
        self.noise.fill(now, acc, mask.contains(ChannelMask::NOISE));
    }

    /// Fills every channel up to the current time.
    pub fn fill(&mut self, acc: &mut Accumulator) {
        self.fill_sequenced(acc);
        self.dmc
            .fill(self.now, acc, self.mask.contains(ChannelMask::DMC));
    }

    /// Moves the time origin back to zero after a flush. Every channel must
    /// already be filled to [`Apu::now`].
    pub fn rebase(&mut self) {
        self.pulse[0].rebase();
        self.pulse[1].rebase();
        self.triangle.rebase();
        self.noise.rebase();
        self.dmc.rebase();
        self.now = 0;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const CAPACITY: usize = 80_000;

    fn apu() -> (Apu, Accumulator) {
        (Apu::new(Region::Ntsc), Accumulator::new(CAPACITY))
    }

    fn play_pulse(apu: &mut Apu, acc: &mut Accumulator, control: u8, length_index: u8) {
        apu.write(0x4015, 0b0000_0001, acc);
        apu.write(0x4000, control, acc);
        apu.write(0x4002, 0xFD, acc);
        apu.write(0x4003, length_index << 3, acc);
    }

    #[test]
    fn length_counter_silences_channel() {
        let (mut apu, mut acc) = apu();
        // Constant volume 15, halt clear, length index 3 (= 2 half frames).
        play_pulse(&mut apu, &mut acc, 0b1001_1111, 3);
        assert_eq!(apu.read_status(0) & 1, 1);

        // Two half-frame clocks land at 14915 and 29830.
        apu.on_cpu_cycles(30_000, &mut acc);
        apu.fill(&mut acc);
        assert_eq!(apu.read_status(0) & 1, 0);
        assert!(acc.square()[..14_000].iter().any(|&s| s != 0));
        assert!(acc.square()[29_830..30_000].iter().all(|&s| s == 0));

        // Stays silent until reloaded.
        apu.on_cpu_cycles(20_000, &mut acc);
        apu.fill(&mut acc);
        assert!(acc.square()[30_000..50_000].iter().all(|&s| s == 0));
    }

    #[test]
    fn frame_irq_and_status_read() {
        let (mut apu, mut acc) = apu();
        apu.on_cpu_cycles(29_829, &mut acc);
        assert!(apu.irq_lines().is_empty());
        apu.on_cpu_cycles(1, &mut acc);
        assert_eq!(apu.irq_lines(), IrqSource::FRAME_COUNTER);

        let status = apu.read_status(0);
        assert_eq!(status & 0x40, 0x40);
        assert!(apu.irq_lines().is_empty());
        assert_eq!(apu.read_status(0) & 0x40, 0);
    }

    #[test]
    fn frame_counter_write_with_inhibit() {
        let mut apu = Apu::new(Region::Ntsc);
        let mut acc = Accumulator::new(100_000);
        apu.on_cpu_cycles(30_000, &mut acc);
        assert!(!apu.irq_lines().is_empty());
        apu.write(0x4017, 0x40, &mut acc);
        assert!(apu.irq_lines().is_empty());
        apu.on_cpu_cycles(60_000, &mut acc);
        assert!(apu.irq_lines().is_empty());
    }

    #[test]
    fn five_step_write_clocks_immediately() {
        let (mut apu, mut acc) = apu();
        play_pulse(&mut apu, &mut acc, 0b1001_1111, 3);
        apu.write(0x4017, 0x80, &mut acc);
        apu.write(0x4017, 0x80, &mut acc);
        assert_eq!(apu.read_status(0) & 1, 0);
        assert_eq!(apu.frame_mode(), FrameCounterMode::FiveStep);
    }

    #[test]
    fn dmc_request_and_irq() {
        let (mut apu, mut acc) = apu();
        apu.write(0x4010, 0b1000_1111, &mut acc);
        apu.write(0x4012, 0x00, &mut acc);
        apu.write(0x4013, 0x00, &mut acc);
        apu.write(0x4015, 0b0001_0000, &mut acc);
        assert_eq!(apu.dma_request(), Some(0xC000));
        assert_eq!(apu.read_status(0) & 0x10, 0x10);
        apu.complete_dma(0x55);
        assert_eq!(apu.dma_request(), None);
        assert_eq!(apu.irq_lines(), IrqSource::DMC);
        assert_eq!(apu.read_status(0) & 0x90, 0x80);

        // $4015 write acknowledges the DMC IRQ.
        apu.write(0x4015, 0, &mut acc);
        assert!(apu.irq_lines().is_empty());
    }

    #[test]
    fn direct_load_sets_dmc_level() {
        let (mut apu, mut acc) = apu();
        apu.write(0x4011, 0xFF, &mut acc);
        apu.on_cpu_cycles(100, &mut acc);
        apu.fill(&mut acc);
        // The idle triangle DAC sits on step 0 (level 15).
        let expected = 0x7F + 3 * 15;
        assert!(acc.tnd()[..100].iter().all(|&s| s == expected));
    }

    #[test]
    fn muted_channel_contributes_nothing() {
        let (mut apu, mut acc) = apu();
        apu.set_channel_mask(ChannelMask::all() - ChannelMask::PULSE1);
        play_pulse(&mut apu, &mut acc, 0b1011_1111, 1);
        apu.on_cpu_cycles(5_000, &mut acc);
        apu.fill(&mut acc);
        assert!(acc.square()[..5_000].iter().all(|&s| s == 0));
    }

    /// Runs `cycles`, serving every sample fetch with a byte derived from
    /// its address.
    fn run_with_dma(apu: &mut Apu, acc: &mut Accumulator, cycles: u32) -> u32 {
        let mut fetches = 0;
        let mut remaining = cycles;
        loop {
            if let Some(addr) = apu.dma_request() {
                apu.complete_dma((addr as u8) ^ 0xA5);
                fetches += 1;
            }
            if remaining == 0 {
                return fetches;
            }
            remaining -= apu.run_until_fetch(remaining, acc);
        }
    }

    #[test]
    fn fetches_are_due_once_per_sample_byte() {
        let (mut apu, mut acc) = apu();
        // Rate 15 (54 cycles per bit), 17 bytes.
        apu.write(0x4010, 0x0F, &mut acc);
        apu.write(0x4013, 0x01, &mut acc);
        apu.write(0x4015, 0x10, &mut acc);

        // The first byte is fetched at once; the next one when the first
        // leaves the buffer at the end of the initial 8-bit cycle, whose
        // first clock still runs at the power-on rate.
        assert_eq!(run_with_dma(&mut apu, &mut acc, 0), 1);
        assert_eq!(apu.run_until_fetch(10_000, &mut acc), 428 + 7 * 54);
        assert_eq!(run_with_dma(&mut apu, &mut acc, 20 * 8 * 54), 16);
        assert_eq!(apu.read_status(0) & 0x10, 0);
        apu.fill(&mut acc);
        assert!(acc.tnd()[..20 * 8 * 54].iter().any(|&s| s != acc.tnd()[0]));
    }

    /// Register writes the lazy-fill property test draws from.
    fn write_strategy() -> impl Strategy<Value = (u32, u16, u8)> {
        let regs = prop::sample::select(vec![
            0x4000u16, 0x4001, 0x4002, 0x4003, 0x4004, 0x4005, 0x4006, 0x4007, 0x4008, 0x400A,
            0x400B, 0x400C, 0x400E, 0x400F, 0x4010, 0x4011, 0x4012, 0x4013, 0x4015, 0x4017,
        ]);
        (0u32..1_500, regs, any::<u8>())
    }

    proptest! {
        #[test]
        fn fill_after_every_write_matches_single_fill(
            writes in prop::collection::vec(write_strategy(), 1..40)
        ) {
            let (mut lazy, mut lazy_acc) = apu();
            let (mut eager, mut eager_acc) = apu();
            for &(delay, reg, value) in &writes {
                run_with_dma(&mut lazy, &mut lazy_acc, delay);
                lazy.write(reg, value, &mut lazy_acc);

                run_with_dma(&mut eager, &mut eager_acc, delay);
                eager.fill(&mut eager_acc);
                eager.write(reg, value, &mut eager_acc);
                eager.fill(&mut eager_acc);
            }
            run_with_dma(&mut lazy, &mut lazy_acc, 500);
            run_with_dma(&mut eager, &mut eager_acc, 500);
            lazy.fill(&mut lazy_acc);
            eager.fill(&mut eager_acc);

            prop_assert_eq!(lazy_acc.square(), eager_acc.square());
            prop_assert_eq!(lazy_acc.tnd(), eager_acc.tnd());
        }
    }
}
