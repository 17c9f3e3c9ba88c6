//! Length counter used by pulse, triangle, and noise channels.

use super::tables::LENGTH_TABLE;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct LengthCounter {
    value: u8,
}

impl LengthCounter {
    pub(super) fn clear(&mut self) {
        self.value = 0;
    }

    pub(super) fn active(&self) -> bool {
        self.value > 0
    }

    /// Loads from the length table. Ignored while the channel is disabled.
    pub(super) fn load(&mut self, index: u8, enabled: bool) {
        if enabled {
            self.value = LENGTH_TABLE[(index & 0x1F) as usize];
        }
    }

    /// Half-frame clock.
    pub(super) fn clock(&mut self, halt: bool) {
        if self.value > 0 && !halt {
            self.value -= 1;
        }
    }
}
