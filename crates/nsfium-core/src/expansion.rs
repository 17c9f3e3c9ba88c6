//! Cartridge expansion sound chips.
//!
//! A chip registers its own bus handlers when it is constructed, tagged with
//! [`Port::Chip`] and its registration slot, and synthesizes into the linear
//! plane of the shared [`Accumulator`] with the same lazy-fill contract as
//! the native APU channels: it remembers how far it has filled and only
//! catches up when a register write is about to change its output or when
//! the frame is flushed.

pub mod n163;
pub mod vrc6;
pub mod vrc7;

use std::fmt::{self, Debug};

use bitflags::bitflags;
use dyn_clone::DynClone;
use tracing::{debug, warn};

use crate::{
    audio::Accumulator,
    bus::{Bus, Port},
};

pub use n163::Namco163;
pub use vrc6::Vrc6;
pub use vrc7::Vrc7;

bitflags! {
    /// Expansion chips requested by a music image, in the loader's bit order.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChipSet: u8 {
        const VRC6 = 1 << 0;
        const VRC7 = 1 << 1;
        const FDS  = 1 << 2;
        const MMC5 = 1 << 3;
        const N163 = 1 << 4;
        const S5B  = 1 << 5;
    }
}

/// Chips this crate can synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipKind {
    Vrc6,
    Vrc7,
    Namco163,
}

impl fmt::Display for ChipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChipKind::Vrc6 => "Konami VRC6",
            ChipKind::Vrc7 => "Konami VRC7",
            ChipKind::Namco163 => "Namco 163",
        };
        f.write_str(name)
    }
}

/// An expansion sound chip plugged into the player.
///
/// All timestamps are CPU cycles since the last flush, the same time base the
/// APU uses.
pub trait ExpansionChip: Debug + Send + DynClone {
    fn kind(&self) -> ChipKind;

    /// Voices this chip contributes to the channel mask.
    fn channel_count(&self) -> u32;

    /// Services a read routed to this chip. Chips without readable registers
    /// leave the open-bus value alone.
    fn read(&mut self, _addr: u16, bus_value: u8) -> u8 {
        bus_value
    }

    /// Register write at time `now`. The chip fills up to `now` before its
    /// state changes.
    fn write(&mut self, addr: u16, value: u8, now: u32, acc: &mut Accumulator);

    /// Renders the chip's output into `acc` up to `ts`.
    fn fill_up_to(&mut self, ts: u32, acc: &mut Accumulator);

    /// Moves the chip's time origin so that `ts` becomes its current fill
    /// position. The player calls this with 0 after every flush.
    fn resync_to(&mut self, ts: u32);

    /// Chip-local mute mask, bit 0 being the chip's first voice.
    fn set_channel_mask(&mut self, mask: u32);

    /// Silences every voice and returns the chip to its power-on state.
    fn shutdown(&mut self);
}

dyn_clone::clone_trait_object!(ExpansionChip);

impl ChipSet {
    /// Builds every supported chip in this set, in bit order, registering
    /// their handlers on `bus`. Chips this crate cannot synthesize are
    /// skipped with a warning.
    pub fn install(self, bus: &mut Bus<Port>) -> Vec<Box<dyn ExpansionChip>> {
        let unsupported = self & (ChipSet::FDS | ChipSet::MMC5 | ChipSet::S5B);
        if !unsupported.is_empty() {
            warn!("ignoring unsupported expansion chips {:?}", unsupported);
        }

        let mut chips: Vec<Box<dyn ExpansionChip>> = Vec::new();
        for flag in self.iter() {
            let slot = chips.len() as u8;
            let chip: Box<dyn ExpansionChip> = if flag == ChipSet::VRC6 {
                Box::new(Vrc6::new(bus, slot))
            } else if flag == ChipSet::VRC7 {
                Box::new(Vrc7::new(bus, slot))
            } else if flag == ChipSet::N163 {
                Box::new(Namco163::new(bus, slot))
            } else {
                continue;
            };
            debug!(
                "installed {} in slot {} ({} voices)",
                chip.kind(),
                slot,
                chip.channel_count()
            );
            chips.push(chip);
        }
        chips
    }
}
