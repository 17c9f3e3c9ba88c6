use bitflags::bitflags;

bitflags! {
    /// Per-voice mute mask. Bits 0-4 are the native channels; expansion
    /// voices follow from bit 5 in chip registration order.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u32 {
        const PULSE1   = 1 << 0;
        const PULSE2   = 1 << 1;
        const TRIANGLE = 1 << 2;
        const NOISE    = 1 << 3;
        const DMC      = 1 << 4;

        const NATIVE = Self::PULSE1.bits()
            | Self::PULSE2.bits()
            | Self::TRIANGLE.bits()
            | Self::NOISE.bits()
            | Self::DMC.bits();

        const _ = !0;
    }
}

impl ChannelMask {
    /// Number of native APU channels.
    pub const NATIVE_COUNT: u32 = 5;

    /// Expansion voices `first..first + count` as a chip-local mask where bit
    /// 0 is the chip's first voice.
    pub fn expansion_voices(self, first: u32, count: u32) -> u32 {
        let shifted = self.bits().checked_shr(Self::NATIVE_COUNT + first).unwrap_or(0);
        match count {
            0 => 0,
            32.. => shifted,
            n => shifted & ((1 << n) - 1),
        }
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::all()
    }
}
