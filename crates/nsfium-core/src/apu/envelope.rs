//! Volume envelope for the pulse and noise channels.
//!
//! Driven by the low six bits of `$4000`/`$4004`/`$400C`. Bits 0-3 are
//! either a constant volume (bit 4 set) or the decay period; bit 5 loops
//! the decay and halts the length counter.

const LOOP: u8 = 0b0010_0000;
const CONSTANT: u8 = 0b0001_0000;
const PARAM: u8 = 0b0000_1111;

/// Decay counts down from this level after a restart.
const DECAY_TOP: u8 = 15;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Envelope {
    /// Latched control bits, masked to the envelope's six.
    control: u8,
    /// Set by a length write; consumed by the next quarter-frame clock.
    pending_restart: bool,
    /// Clocks left before the next decay step.
    countdown: u8,
    level: u8,
}

impl Envelope {
    pub(super) fn configure(&mut self, value: u8) {
        self.control = value & (LOOP | CONSTANT | PARAM);
    }

    pub(super) fn restart(&mut self) {
        self.pending_restart = true;
    }

    fn param(&self) -> u8 {
        self.control & PARAM
    }

    fn looping(&self) -> bool {
        self.control & LOOP != 0
    }

    /// Quarter-frame clock.
    pub(super) fn clock(&mut self) {
        if std::mem::take(&mut self.pending_restart) {
            self.level = DECAY_TOP;
            self.countdown = self.param();
            return;
        }
        match self.countdown.checked_sub(1) {
            Some(left) => self.countdown = left,
            None => {
                self.countdown = self.param();
                self.level = match self.level {
                    0 if self.looping() => DECAY_TOP,
                    0 => 0,
                    level => level - 1,
                };
            }
        }
    }

    pub(super) fn output(&self) -> u8 {
        if self.control & CONSTANT != 0 {
            self.param()
        } else {
            self.level
        }
    }

    /// Bit 5 also holds the channel's length counter.
    pub(super) fn halt_length(&self) -> bool {
        self.looping()
    }
}
