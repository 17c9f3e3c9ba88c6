//! NES music playback engine: a 2A03 CPU and APU, Konami VRC6/VRC7 and
//! Namco 163 expansion audio, and a decimating output pipeline, driven one
//! play-routine frame at a time by [`Player`].

pub mod apu;
pub mod audio;
pub mod bus;
pub mod config;
pub mod cpu;
pub mod error;
pub mod expansion;
pub mod memory;
pub mod nsf;
pub mod player;

pub use audio::ChannelMask;
pub use config::{PlayerConfig, Region};
pub use cpu::{CpuRegisters, RunOutcome};
pub use error::{Error, Result};
pub use expansion::{ChipKind, ChipSet, ExpansionChip};
pub use nsf::NsfImage;
pub use player::Player;
