//! Shared definitions for the music-player memory map.
//!
//! Keeping the address layout in one place prevents magic numbers from
//! spreading through the bus wiring, the APU and the expansion chips.

/// CPU memory map details.
pub mod cpu {
    /// First address of the hardware stack page.
    pub const STACK_PAGE_START: u16 = 0x0100;

    /// Size of the CPU internal RAM block (2 KiB mirrored through `$1FFF`).
    pub const INTERNAL_RAM_SIZE: usize = 0x0800;
    /// Last mirrored internal RAM address.
    pub const INTERNAL_RAM_MIRROR_END: u16 = 0x1FFF;
    /// Mask applied to mirror CPU RAM accesses within `$0000-$1FFF`.
    pub const INTERNAL_RAM_MASK: u16 = (INTERNAL_RAM_SIZE as u16) - 1;

    /// Cartridge work RAM window.
    pub const SRAM_START: u16 = 0x6000;
    pub const SRAM_END: u16 = 0x7FFF;
    pub const SRAM_SIZE: usize = (SRAM_END - SRAM_START) as usize + 1;

    /// Program ROM window, split into eight 4 KiB banks.
    pub const PRG_START: u16 = 0x8000;
    pub const PRG_END: u16 = 0xFFFF;
    pub const PRG_BANK_SIZE: usize = 0x1000;
    pub const PRG_BANK_COUNT: usize = 8;

    /// Bank-select registers: `$5FF8` maps `$8000`, ..., `$5FFF` maps `$F000`.
    pub const BANK_SELECT_START: u16 = 0x5FF8;
    pub const BANK_SELECT_END: u16 = 0x5FFF;

    /// Address the player parks the CPU at to detect a routine return. Lies in
    /// the unmapped `$2000-$3FFF` hole, so no music code can live there.
    pub const RETURN_SENTINEL: u16 = 0x3FF8;
}

/// APU register map.
pub mod apu {
    /// Start of the CPU-mapped APU channel registers.
    pub const REGISTER_BASE: u16 = 0x4000;
    /// Final channel register before the status and frame counter ports.
    pub const CHANNEL_REGISTER_END: u16 = 0x4013;
    pub const STATUS: u16 = 0x4015;
    pub const FRAME_COUNTER: u16 = 0x4017;

    /// CPU-visible APU register identifiers.
    #[repr(u16)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Register {
        /// `$4000` - Pulse 1: duty, envelope, length counter halt.
        Pulse1Control = 0x4000,
        /// `$4001` - Pulse 1: sweep unit.
        Pulse1Sweep = 0x4001,
        Pulse1TimerLow = 0x4002,
        /// `$4003` - Pulse 1: timer high 3 bits + length counter load.
        Pulse1TimerHigh = 0x4003,
        Pulse2Control = 0x4004,
        Pulse2Sweep = 0x4005,
        Pulse2TimerLow = 0x4006,
        Pulse2TimerHigh = 0x4007,
        /// `$4008` - Triangle: length counter halt + linear counter reload.
        TriangleControl = 0x4008,
        TriangleTimerLow = 0x400A,
        TriangleTimerHigh = 0x400B,
        NoiseControl = 0x400C,
        /// `$400E` - Noise: mode flag and period index.
        NoiseModeAndPeriod = 0x400E,
        NoiseLength = 0x400F,
        /// `$4010` - DMC: IRQ enable, loop flag, rate index.
        DmcControl = 0x4010,
        /// `$4011` - DMC: direct 7-bit output level load.
        DmcDirectLoad = 0x4011,
        DmcSampleAddress = 0x4012,
        DmcSampleLength = 0x4013,
        /// `$4015` - Channel enables (write) and status (read).
        Status = 0x4015,
        /// `$4017` - Frame counter mode and IRQ inhibit.
        FrameCounter = 0x4017,
    }

    impl Register {
        pub const fn addr(self) -> u16 {
            self as u16
        }

        /// Resolves a CPU address to an APU register. Holes in the range
        /// (`$4009`, `$400D`, `$4014`, `$4016`) have no register.
        pub const fn from_cpu_addr(addr: u16) -> Option<Self> {
            match addr {
                0x4000 => Some(Self::Pulse1Control),
                0x4001 => Some(Self::Pulse1Sweep),
                0x4002 => Some(Self::Pulse1TimerLow),
                0x4003 => Some(Self::Pulse1TimerHigh),
                0x4004 => Some(Self::Pulse2Control),
                0x4005 => Some(Self::Pulse2Sweep),
                0x4006 => Some(Self::Pulse2TimerLow),
                0x4007 => Some(Self::Pulse2TimerHigh),
                0x4008 => Some(Self::TriangleControl),
                0x400A => Some(Self::TriangleTimerLow),
                0x400B => Some(Self::TriangleTimerHigh),
                0x400C => Some(Self::NoiseControl),
                0x400E => Some(Self::NoiseModeAndPeriod),
                0x400F => Some(Self::NoiseLength),
                0x4010 => Some(Self::DmcControl),
                0x4011 => Some(Self::DmcDirectLoad),
                0x4012 => Some(Self::DmcSampleAddress),
                0x4013 => Some(Self::DmcSampleLength),
                0x4015 => Some(Self::Status),
                0x4017 => Some(Self::FrameCounter),
                _ => None,
            }
        }
    }
}

/// Konami VRC6 register map.
pub mod vrc6 {
    pub const PULSE1_START: u16 = 0x9000;
    pub const PULSE1_END: u16 = 0x9002;
    /// Halt and period-shift control shared by all voices.
    pub const FREQUENCY_CONTROL: u16 = 0x9003;
    pub const PULSE2_START: u16 = 0xA000;
    pub const PULSE2_END: u16 = 0xA002;
    pub const SAW_START: u16 = 0xB000;
    pub const SAW_END: u16 = 0xB002;
}

/// Konami VRC7 register map.
pub mod vrc7 {
    /// Register-select latch.
    pub const ADDRESS: u16 = 0x9010;
    /// Data port for the latched register.
    pub const DATA: u16 = 0x9030;
}

/// Namco 163 register map.
pub mod n163 {
    /// Internal RAM data port (read/write).
    pub const DATA_START: u16 = 0x4800;
    pub const DATA_END: u16 = 0x4FFF;
    /// Internal RAM address port; bit 7 enables auto-increment.
    pub const ADDRESS_START: u16 = 0xF800;
    pub const ADDRESS_END: u16 = 0xFFFF;
}
