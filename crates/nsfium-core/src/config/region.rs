use core::fmt;

/// Console timing profile used by the CPU clock and the APU tables.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    /// North American / Japanese NTSC timing.
    #[default]
    Ntsc,
    /// European PAL timing.
    Pal,
}

impl Region {
    /// CPU (and APU) clock in Hz.
    pub const fn cpu_clock(self) -> f64 {
        match self {
            Region::Ntsc => 1_789_773.0,
            Region::Pal => 1_662_607.0,
        }
    }

    /// Frame sequencer step length in CPU half-cycles (~240 Hz).
    pub const fn frame_step_half_cycles(self) -> i32 {
        match self {
            Region::Ntsc => 14915,
            Region::Pal => 16626,
        }
    }

    /// Play-routine period used when the image does not specify one, in µs.
    pub const fn default_play_period_us(self) -> u32 {
        match self {
            Region::Ntsc => 16_639,
            Region::Pal => 19_997,
        }
    }

    /// Value handed to the init routine in X.
    pub const fn init_x(self) -> u8 {
        match self {
            Region::Ntsc => 0,
            Region::Pal => 1,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Region::Ntsc => "ntsc",
            Region::Pal => "pal",
        };
        f.write_str(s)
    }
}
