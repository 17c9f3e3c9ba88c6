#![allow(dead_code)]

use nsfium_core::{ChipSet, NsfImage, Player, PlayerConfig};

pub const LOAD: u16 = 0x8000;
pub const RTS: u8 = 0x60;
/// A KIL opcode; locks the CPU.
pub const JAM: u8 = 0x02;

/// Small 6502 assembler for test routines.
#[derive(Debug, Default, Clone)]
pub struct Program {
    bytes: Vec<u8>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// `LDA #value; STA addr`
    pub fn store(mut self, addr: u16, value: u8) -> Self {
        self.bytes
            .extend_from_slice(&[0xA9, value, 0x8D, addr as u8, (addr >> 8) as u8]);
        self
    }

    /// `LDA #reg; STA $9010; LDA #value; STA $9030`
    pub fn vrc7(self, reg: u8, value: u8) -> Self {
        self.store(0x9010, reg).store(0x9030, value)
    }

    pub fn jsr(mut self, addr: u16) -> Self {
        self.bytes
            .extend_from_slice(&[0x20, addr as u8, (addr >> 8) as u8]);
        self
    }

    pub fn byte(mut self, byte: u8) -> Self {
        self.bytes.push(byte);
        self
    }

    pub fn rts(self) -> Self {
        self.byte(RTS)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Pulse 1 at a constant full volume, 50% duty, around 440 Hz.
pub fn pulse_tone() -> Program {
    Program::new()
        .store(0x4000, 0xBF)
        .store(0x4001, 0x00)
        .store(0x4002, 0xFD)
        .store(0x4003, 0x00)
}

/// Image whose init routine is `init` followed by RTS, and whose play
/// routine is `play` (a lone RTS when empty).
pub fn image(init: Program, play: Program) -> NsfImage {
    let init = init.rts();
    let play = if play.is_empty() { Program::new().rts() } else { play };
    let play_address = LOAD + init.len() as u16;
    let mut data = init.into_bytes();
    data.extend(play.into_bytes());
    NsfImage::new(LOAD, LOAD, play_address, data)
}

pub fn image_with_chips(init: Program, chips: ChipSet) -> NsfImage {
    let mut image = image(init, Program::new());
    image.chips = chips;
    image
}

/// Renders `frames` frames and returns the concatenated PCM.
pub fn render(player: &mut Player, frames: usize) -> Vec<f32> {
    let mut out = Vec::new();
    for _ in 0..frames {
        player.render_frame(&mut out);
    }
    out
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// RMS around the mean, so DC offsets do not count as signal.
pub fn ac_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64;
    let sum: f64 = samples.iter().map(|&s| (s as f64 - mean).powi(2)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

pub fn player(image: &NsfImage) -> anyhow::Result<Player> {
    Ok(Player::new(image, &PlayerConfig::default())?)
}
