//! In-memory description of a music image, as produced by a container
//! loader, and its mapping into the CPU's program window.

use crate::{
    config::Region,
    error::{Error, Result},
    expansion::ChipSet,
    memory::cpu::{PRG_BANK_COUNT, PRG_BANK_SIZE, PRG_START},
};

/// A decoded music image.
///
/// Songs are numbered from 0. A play period of 0 selects the region's
/// default rate (60.1 Hz NTSC, 50 Hz PAL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsfImage {
    pub load_address: u16,
    pub init_address: u16,
    pub play_address: u16,
    pub region: Region,
    pub chips: ChipSet,
    pub data: Vec<u8>,
    /// Initial 4 KiB bank for each slot of `$8000-$FFFF`. Any nonzero entry
    /// makes the image bankswitched.
    pub bank_init: [u8; PRG_BANK_COUNT],
    pub song_count: u8,
    pub starting_song: u8,
    pub ntsc_play_period_us: u16,
    pub pal_play_period_us: u16,
}

impl NsfImage {
    /// A single-song, non-bankswitched NTSC image with no expansion chips.
    pub fn new(load_address: u16, init_address: u16, play_address: u16, data: Vec<u8>) -> Self {
        Self {
            load_address,
            init_address,
            play_address,
            region: Region::Ntsc,
            chips: ChipSet::empty(),
            data,
            bank_init: [0; PRG_BANK_COUNT],
            song_count: 1,
            starting_song: 0,
            ntsc_play_period_us: 0,
            pal_play_period_us: 0,
        }
    }

    pub fn is_bankswitched(&self) -> bool {
        self.bank_init.iter().any(|&b| b != 0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.load_address < PRG_START {
            return Err(Error::InvalidLoadAddress(self.load_address));
        }
        if self.data.is_empty() {
            return Err(Error::EmptyImage);
        }
        Ok(())
    }

    /// Play-routine period for `region`, in microseconds.
    pub fn play_period_us(&self, region: Region) -> u32 {
        let period = match region {
            Region::Ntsc => self.ntsc_play_period_us,
            Region::Pal => self.pal_play_period_us,
        };
        match period {
            0 => region.default_play_period_us(),
            us => us as u32,
        }
    }

    /// Program ROM as whole 4 KiB banks.
    ///
    /// Bankswitched images are padded in front by the load address's offset
    /// within its bank; plain images are placed at the load address in a
    /// 32 KiB window and cut off at `$FFFF`.
    pub(crate) fn program_rom(&self) -> Vec<u8> {
        if self.is_bankswitched() {
            let pad = (self.load_address as usize) & (PRG_BANK_SIZE - 1);
            let len = (pad + self.data.len()).div_ceil(PRG_BANK_SIZE) * PRG_BANK_SIZE;
            let mut rom = vec![0; len];
            rom[pad..pad + self.data.len()].copy_from_slice(&self.data);
            rom
        } else {
            let window = PRG_BANK_SIZE * PRG_BANK_COUNT;
            let offset = (self.load_address - PRG_START) as usize;
            let mut rom = vec![0; window];
            let len = self.data.len().min(window - offset);
            rom[offset..offset + len].copy_from_slice(&self.data[..len]);
            rom
        }
    }

    /// Banks mapped at power-on.
    pub(crate) fn initial_banks(&self) -> [u8; PRG_BANK_COUNT] {
        if self.is_bankswitched() {
            self.bank_init
        } else {
            std::array::from_fn(|i| i as u8)
        }
    }
}
