//! A playback session: one music image wired to the CPU, bus, APU and
//! expansion chips, rendering one play-routine frame at a time.
//!
//! Every frame the player calls the image's play routine (unless the
//! previous call is still running), lets the CPU run for one play period,
//! idles the rest of the period once the routine returns, and flushes the
//! accumulated audio through the decimator.

use tracing::{debug, warn};

use crate::{
    apu::Apu,
    audio::{Accumulator, AudioPipeline, ChannelMask},
    bus::{Bus, BusTarget, CpuBus, Port, TickResult},
    config::{PlayerConfig, Region},
    cpu::{Cpu, CpuRegisters, RunOutcome},
    error::{Error, Result},
    expansion::{ChipKind, ExpansionChip},
    memory::{
        apu as apu_mem,
        cpu::{
            BANK_SELECT_END, BANK_SELECT_START, INTERNAL_RAM_MASK, INTERNAL_RAM_MIRROR_END,
            INTERNAL_RAM_SIZE, PRG_BANK_COUNT, PRG_BANK_SIZE, PRG_END, PRG_START,
            RETURN_SENTINEL, SRAM_END, SRAM_SIZE, SRAM_START,
        },
    },
    nsf::NsfImage,
};

/// CPU cycles lost to one DMC sample fetch.
const DMA_STALL_CYCLES: u32 = 4;
/// Reads the halted CPU repeats before the real sample fetch.
const DMA_DUMMY_READS: u32 = 3;
/// Shortest time the DMC takes to play one sample byte (8 clocks at the
/// fastest PAL rate).
const MIN_DMC_BYTE_CYCLES: f64 = 8.0 * 50.0;
/// Frames the init routine may run before playback starts regardless.
const INIT_FRAME_LIMIT: u32 = 600;
/// Slack for the instruction that overshoots the frame budget, plus a DMA
/// stall and an interrupt entry.
const ACCUMULATOR_SLACK: usize = 64;
/// Status register handed to init and play: interrupts disabled.
const ROUTINE_STATUS: u8 = 0x24;

/// Device state behind the bus.
#[derive(Debug, Clone)]
struct Devices {
    ram: Vec<u8>,
    sram: Vec<u8>,
    prg: Vec<u8>,
    banks: [u8; PRG_BANK_COUNT],
    apu: Apu,
    chips: Vec<Box<dyn ExpansionChip>>,
    acc: Accumulator,
}

impl Devices {
    fn prg_read(&self, addr: u16) -> u8 {
        let slot = (addr - PRG_START) as usize / PRG_BANK_SIZE;
        let offset =
            self.banks[slot] as usize * PRG_BANK_SIZE + (addr as usize & (PRG_BANK_SIZE - 1));
        // Banks past the end of the image read as zero.
        self.prg.get(offset).copied().unwrap_or(0)
    }

    /// Fills the native channels, then every chip in registration order.
    fn fill_all(&mut self) {
        self.apu.fill(&mut self.acc);
        let now = self.apu.now();
        for chip in &mut self.chips {
            chip.fill_up_to(now, &mut self.acc);
        }
    }

    fn rebase(&mut self) {
        self.apu.rebase();
        for chip in &mut self.chips {
            chip.resync_to(0);
        }
    }
}

impl BusTarget<Port> for Devices {
    fn read(&mut self, handler: Port, addr: u16, bus_value: u8) -> u8 {
        match handler {
            Port::Ram => self.ram[(addr & INTERNAL_RAM_MASK) as usize],
            Port::Sram => self.sram[(addr - SRAM_START) as usize],
            Port::Prg => self.prg_read(addr),
            Port::ApuStatus => self.apu.read_status(bus_value),
            Port::Chip(slot) => match self.chips.get_mut(slot as usize) {
                Some(chip) => chip.read(addr, bus_value),
                None => bus_value,
            },
            Port::ApuRegister | Port::BankSelect => bus_value,
        }
    }

    fn write(&mut self, handler: Port, addr: u16, value: u8) {
        match handler {
            Port::Ram => self.ram[(addr & INTERNAL_RAM_MASK) as usize] = value,
            Port::Sram => self.sram[(addr - SRAM_START) as usize] = value,
            Port::ApuRegister => self.apu.write(addr, value, &mut self.acc),
            Port::BankSelect => self.banks[(addr - BANK_SELECT_START) as usize] = value,
            Port::Chip(slot) => {
                let now = self.apu.now();
                if let Some(chip) = self.chips.get_mut(slot as usize) {
                    chip.write(addr, value, now, &mut self.acc);
                }
            }
            Port::Prg | Port::ApuStatus => {}
        }
    }
}

/// The CPU's view of the player: bus dispatch plus the per-instruction
/// hook that clocks the APU and services DMC sample fetches.
struct System<'a> {
    bus: &'a mut Bus<Port>,
    devices: &'a mut Devices,
}

impl CpuBus for System<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        self.bus.read(&mut *self.devices, addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.bus.write(&mut *self.devices, addr, value);
    }

    /// Runs the APU over the reported span, fetching every DMC byte at the
    /// cycle it falls due. Each fetch costs the CPU a stall.
    fn on_cpu_cycles(&mut self, cycles: u32) -> TickResult {
        let mut stall_cycles = 0;
        let mut remaining = cycles;
        loop {
            if let Some(addr) = self.devices.apu.dma_request() {
                for _ in 0..DMA_DUMMY_READS {
                    self.bus.read(&mut *self.devices, addr);
                }
                let value = self.bus.read(&mut *self.devices, addr);
                self.devices.apu.complete_dma(value);
                stall_cycles += DMA_STALL_CYCLES;
            }
            if remaining == 0 {
                break;
            }
            let devices = &mut *self.devices;
            remaining -= devices.apu.run_until_fetch(remaining, &mut devices.acc);
        }
        TickResult {
            irq_lines: self.devices.apu.irq_lines(),
            stall_cycles,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    cpu: Cpu,
    bus: Bus<Port>,
    devices: Devices,
    pipeline: AudioPipeline,

    region: Region,
    init_address: u16,
    play_address: u16,
    initial_banks: [u8; PRG_BANK_COUNT],
    song_count: u8,
    song: u8,

    /// Exact CPU cycles per play period.
    cycles_per_frame: f64,
    /// Fractional cycles carried between frames.
    frame_remainder: f64,
    /// The last init/play call has not returned yet.
    in_routine: bool,
    mask: ChannelMask,
}

impl Player {
    /// Maps `image`, installs its chips, and runs the init routine for its
    /// starting song.
    pub fn new(image: &NsfImage, config: &PlayerConfig) -> Result<Self> {
        image.validate()?;
        if config.sample_rate == 0 {
            return Err(Error::InvalidSampleRate(config.sample_rate));
        }

        let region = config.region.unwrap_or(image.region);
        let pipeline = AudioPipeline::new(
            region.cpu_clock(),
            config.sample_rate,
            config.lowpass.as_deref(),
            config.volume,
        )?;
        let cycles_per_frame = image.play_period_us(region) as f64 * region.cpu_clock() / 1e6;
        // Stalls charged while idling land past the frame budget.
        let max_fetches = (cycles_per_frame / MIN_DMC_BYTE_CYCLES).ceil() as usize + 1;
        let capacity = cycles_per_frame.ceil() as usize
            + pipeline.history()
            + ACCUMULATOR_SLACK
            + max_fetches * DMA_STALL_CYCLES as usize;

        let mut bus = Bus::new();
        bus.set_reader(0x0000..=INTERNAL_RAM_MIRROR_END, Port::Ram);
        bus.set_writer(0x0000..=INTERNAL_RAM_MIRROR_END, Port::Ram);
        bus.set_reader(SRAM_START..=SRAM_END, Port::Sram);
        bus.set_writer(SRAM_START..=SRAM_END, Port::Sram);
        bus.set_reader(PRG_START..=PRG_END, Port::Prg);
        if image.is_bankswitched() {
            bus.set_writer(BANK_SELECT_START..=BANK_SELECT_END, Port::BankSelect);
        }
        Apu::install_handlers(&mut bus);
        let chips = image.chips.install(&mut bus);

        let initial_banks = image.initial_banks();
        let devices = Devices {
            ram: vec![0; INTERNAL_RAM_SIZE],
            sram: vec![0; SRAM_SIZE],
            prg: image.program_rom(),
            banks: initial_banks,
            apu: Apu::new(region),
            chips,
            acc: Accumulator::new(capacity),
        };

        let mut player = Self {
            cpu: Cpu::new(),
            bus,
            devices,
            pipeline,
            region,
            init_address: image.init_address,
            play_address: image.play_address,
            initial_banks,
            song_count: image.song_count,
            song: image.starting_song,
            cycles_per_frame,
            frame_remainder: 0.0,
            in_routine: false,
            mask: config.channel_mask,
        };
        player.start_song(image.starting_song)?;
        Ok(player)
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn song(&self) -> u8 {
        self.song
    }

    pub fn song_count(&self) -> u8 {
        self.song_count
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn chips(&self) -> impl Iterator<Item = ChipKind> + '_ {
        self.devices.chips.iter().map(|chip| chip.kind())
    }

    /// Native channels plus every expansion voice, in mask bit order.
    pub fn channel_count(&self) -> u32 {
        ChannelMask::NATIVE_COUNT
            + self
                .devices
                .chips
                .iter()
                .map(|chip| chip.channel_count())
                .sum::<u32>()
    }

    pub fn channel_mask(&self) -> ChannelMask {
        self.mask
    }

    pub fn set_channel_mask(&mut self, mask: ChannelMask) {
        self.mask = mask;
        self.devices.apu.set_channel_mask(mask);
        let mut first = 0;
        for chip in &mut self.devices.chips {
            let count = chip.channel_count();
            chip.set_channel_mask(mask.expansion_voices(first, count));
            first += count;
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.pipeline.set_volume(volume);
    }

    /// Resets the machine and runs the init routine for `song` (0-based).
    pub fn start_song(&mut self, song: u8) -> Result<()> {
        if song >= self.song_count {
            return Err(Error::SongOutOfRange {
                song,
                count: self.song_count,
            });
        }
        debug!(
            "starting song {}/{} ({}, {:.1} cycles per frame)",
            song + 1,
            self.song_count,
            self.region,
            self.cycles_per_frame
        );
        self.song = song;
        self.power_cycle();

        let mut system = System {
            bus: &mut self.bus,
            devices: &mut self.devices,
        };
        for addr in apu_mem::REGISTER_BASE..=apu_mem::CHANNEL_REGISTER_END {
            system.write(addr, 0);
        }
        system.write(apu_mem::STATUS, 0x00);
        system.write(apu_mem::STATUS, 0x0F);
        system.write(apu_mem::FRAME_COUNTER, 0x40);

        self.cpu.set_registers(CpuRegisters {
            pc: 0,
            a: song,
            x: self.region.init_x(),
            y: 0,
            s: 0xFD,
            p: ROUTINE_STATUS,
        });
        self.cpu.call(&mut system, self.init_address, RETURN_SENTINEL);
        self.run_init();
        Ok(())
    }

    /// Returns every device to power-on state.
    fn power_cycle(&mut self) {
        let devices = &mut self.devices;
        devices.ram.fill(0);
        devices.sram.fill(0);
        devices.banks = self.initial_banks;
        devices.apu = Apu::new(self.region);
        for chip in &mut devices.chips {
            chip.shutdown();
            chip.resync_to(0);
        }
        devices.acc.clear();
        self.bus.reset();
        self.cpu = Cpu::new();
        self.pipeline.reset();
        self.frame_remainder = 0.0;
        self.in_routine = false;
        self.set_channel_mask(self.mask);
    }

    fn run_init(&mut self) {
        let mut discard = Vec::new();
        for frame in 1..=INIT_FRAME_LIMIT {
            let budget = self.next_budget();
            let outcome = self.run_cycles(budget);
            let finished = self.finish_frame(outcome, &mut discard);
            discard.clear();
            if finished {
                return;
            }
            if frame == INIT_FRAME_LIMIT {
                warn!(
                    "init routine still running after {} frames; starting playback",
                    frame
                );
            }
        }
        self.in_routine = false;
    }

    /// Renders one play period and appends its PCM to `out`. Returns the
    /// number of samples produced.
    pub fn render_frame(&mut self, out: &mut Vec<f32>) -> usize {
        if !self.in_routine {
            let mut system = System {
                bus: &mut self.bus,
                devices: &mut self.devices,
            };
            self.cpu
                .call(&mut system, self.play_address, RETURN_SENTINEL);
            self.in_routine = true;
        }
        let budget = self.next_budget();
        let outcome = self.run_cycles(budget);
        let start = out.len();
        self.finish_frame(outcome, out);
        out.len() - start
    }

    /// Idles out a returned or jammed routine, then flushes. Returns true
    /// when the routine is no longer running.
    fn finish_frame(&mut self, outcome: RunOutcome, out: &mut Vec<f32>) -> bool {
        let done = match outcome {
            RunOutcome::Returned => true,
            RunOutcome::Jammed => {
                warn!(
                    "cpu jammed at {:04x}; idling out the frame",
                    self.cpu.registers().pc
                );
                true
            }
            RunOutcome::BudgetExhausted => false,
        };
        if done {
            self.in_routine = false;
            let mut system = System {
                bus: &mut self.bus,
                devices: &mut self.devices,
            };
            self.cpu.idle(&mut system);
        }
        self.flush(out);
        done
    }

    fn next_budget(&mut self) -> i32 {
        let exact = self.cycles_per_frame + self.frame_remainder;
        let whole = exact.floor();
        self.frame_remainder = exact - whole;
        whole as i32
    }

    fn run_cycles(&mut self, budget: i32) -> RunOutcome {
        let mut system = System {
            bus: &mut self.bus,
            devices: &mut self.devices,
        };
        self.cpu.run(&mut system, budget)
    }

    /// Brings every channel up to the CPU's timestamp, mixes and decimates
    /// the frame window, and rebases all clocks to zero.
    fn flush(&mut self, out: &mut Vec<f32>) -> usize {
        let mut system = System {
            bus: &mut self.bus,
            devices: &mut self.devices,
        };
        self.cpu.sync(&mut system);
        debug_assert_eq!(self.cpu.timestamp(), self.devices.apu.now());

        self.devices.fill_all();
        let len = self.cpu.timestamp();
        let produced = self.pipeline.flush(&mut self.devices.acc, len, out);
        self.cpu.rebase_timestamp();
        self.devices.rebase();
        produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::ChipSet;

    /// `LDA #$02; STA $5FF9; RTS` at $8000 and a marker byte per bank.
    fn banked_image() -> NsfImage {
        let mut data = vec![0u8; 0x3000];
        data[..6].copy_from_slice(&[0xA9, 0x02, 0x8D, 0xF9, 0x5F, 0x60]);
        data[0x1000] = 0x11;
        data[0x2000] = 0x22;
        let mut image = NsfImage::new(0x8000, 0x8000, 0x8005, data);
        image.bank_init = [0, 1, 0, 0, 0, 0, 0, 0];
        image
    }

    #[test]
    fn bank_select_remaps_window() {
        let player = Player::new(&banked_image(), &PlayerConfig::default()).unwrap();
        // Init wrote bank 2 into the $9000 slot.
        assert_eq!(player.devices.banks[1], 2);
        assert_eq!(player.devices.prg_read(0x9000), 0x22);
        assert_eq!(player.devices.prg_read(0x8000), 0xA9);
        // Slots left at zero map bank 0.
        assert_eq!(player.devices.prg_read(0xA000), 0xA9);
        // Banks past the end of the image read as zero.
        let mut devices = player.devices.clone();
        devices.banks[2] = 9;
        assert_eq!(devices.prg_read(0xA000), 0);
    }

    #[test]
    fn player_can_move_between_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<Player>();
    }

    #[test]
    fn ram_is_mirrored() {
        let mut player =
            Player::new(&NsfImage::new(0x8000, 0x8000, 0x8000, vec![0x60]), &PlayerConfig::default())
                .unwrap();
        let mut system = System {
            bus: &mut player.bus,
            devices: &mut player.devices,
        };
        system.write(0x0801, 0x5A);
        assert_eq!(system.read(0x0001), 0x5A);
        assert_eq!(system.read(0x1801), 0x5A);
        system.write(0x6000, 0x77);
        assert_eq!(system.read(0x6000), 0x77);
    }

    #[test]
    fn frames_alternate_budget_remainder() {
        let mut player =
            Player::new(&NsfImage::new(0x8000, 0x8000, 0x8000, vec![0x60]), &PlayerConfig::default())
                .unwrap();
        let exact = player.cycles_per_frame;
        let budgets: Vec<i32> = (0..100).map(|_| player.next_budget()).collect();
        assert!(
            budgets
                .iter()
                .all(|&b| b == exact.floor() as i32 || b == exact.ceil() as i32)
        );
        let total: i64 = budgets.iter().map(|&b| b as i64).sum();
        assert!((total as f64 - exact * 100.0).abs() < 1.0);
    }

    #[test]
    fn every_dmc_byte_is_fetched_within_one_span() {
        let mut player =
            Player::new(&NsfImage::new(0x8000, 0x8000, 0x8000, vec![0x60]), &PlayerConfig::default())
                .unwrap();
        let mut system = System {
            bus: &mut player.bus,
            devices: &mut player.devices,
        };
        // Fastest rate, 17 bytes from $C000.
        system.write(0x4010, 0x0F);
        system.write(0x4012, 0x00);
        system.write(0x4013, 0x01);
        system.write(0x4015, 0x10);

        // Enabling the channel fetches the first byte straight away.
        assert_eq!(system.on_cpu_cycles(0).stall_cycles, DMA_STALL_CYCLES);
        assert_ne!(system.read(0x4015) & 0x10, 0);

        // One hook span long enough for the rest of the sample.
        let tick = system.on_cpu_cycles(20 * 8 * 54);
        assert_eq!(tick.stall_cycles, 16 * DMA_STALL_CYCLES);
        assert_eq!(system.read(0x4015) & 0x10, 0);
        assert!(system.devices.apu.dma_request().is_none());
    }

    #[test]
    fn chip_mask_offsets_follow_registration_order() {
        let mut image = NsfImage::new(0x8000, 0x8000, 0x8000, vec![0x60]);
        image.chips = ChipSet::VRC6 | ChipSet::N163;
        let mut player = Player::new(&image, &PlayerConfig::default()).unwrap();
        assert_eq!(player.channel_count(), 5 + 3 + 8);
        assert_eq!(
            player.chips().collect::<Vec<_>>(),
            vec![ChipKind::Vrc6, ChipKind::Namco163]
        );
        player.set_channel_mask(ChannelMask::from_bits_retain(0b0000_0001_0001_1111));
        assert_eq!(player.channel_mask().bits(), 0b0000_0001_0001_1111);
    }
}
