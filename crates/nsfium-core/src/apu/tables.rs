//! Constant lookup tables shared by the APU channels.

use crate::config::Region;

/// Length counter load values, indexed by the 5-bit field of `$4003` etc.
pub(super) const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, //
    12, 16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// Pulse duty waveforms: 12.5%, 25%, 50%, 25% negated.
pub(super) const PULSE_DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

pub(super) const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, //
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

/// Noise timer periods in CPU cycles.
const NOISE_PERIOD_NTSC: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];
const NOISE_PERIOD_PAL: [u16; 16] = [
    4, 8, 14, 30, 60, 88, 118, 148, 188, 236, 354, 472, 708, 944, 1890, 3778,
];

/// DMC output-bit periods in CPU cycles.
const DMC_RATE_NTSC: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];
const DMC_RATE_PAL: [u16; 16] = [
    398, 354, 316, 298, 276, 236, 210, 198, 176, 148, 132, 118, 98, 78, 66, 50,
];

pub(super) const DMC_SAMPLE_BASE: u16 = 0xC000;
pub(super) const DMC_SAMPLE_ADDR_STRIDE: u16 = 64;
pub(super) const DMC_SAMPLE_LEN_STRIDE: u16 = 16;

pub(super) const fn noise_periods(region: Region) -> &'static [u16; 16] {
    match region {
        Region::Ntsc => &NOISE_PERIOD_NTSC,
        Region::Pal => &NOISE_PERIOD_PAL,
    }
}

pub(super) const fn dmc_rates(region: Region) -> &'static [u16; 16] {
    match region {
        Region::Ntsc => &DMC_RATE_NTSC,
        Region::Pal => &DMC_RATE_PAL,
    }
}
