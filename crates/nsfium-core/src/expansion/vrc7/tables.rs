//! Precomputed OPLL tables, built once on first use.
//!
//! Attenuation is carried in 0.1875 dB steps (`DB_STEP`) up to `DB_MUTE`;
//! the envelope runs in 0.375 dB steps over 7 bits; phases are 18-bit
//! accumulators whose top 9 bits index the waveform.

use std::{f64::consts::PI, sync::LazyLock};

pub(super) const PG_BITS: u32 = 9;
pub(super) const PG_WIDTH: usize = 1 << PG_BITS;
pub(super) const DP_BITS: u32 = 18;
pub(super) const DP_WIDTH: u32 = 1 << DP_BITS;
pub(super) const DP_BASE_BITS: u32 = DP_BITS - PG_BITS;

const DB_BITS: u32 = 8;
const DB_STEP: f64 = 48.0 / (1 << DB_BITS) as f64;
pub(super) const DB_MUTE: u32 = 1 << DB_BITS;

const EG_STEP: f64 = 0.375;
pub(super) const EG_BITS: u32 = 7;
pub(super) const EG_MUTE: u32 = 1 << EG_BITS;
pub(super) const EG_DP_BITS: u32 = 22;
pub(super) const EG_DP_WIDTH: u32 = 1 << EG_DP_BITS;

const TL_STEP: f64 = 0.75;
const SL_STEP: f64 = 3.0;

const PM_PG_BITS: u32 = 8;
const PM_PG_WIDTH: usize = 1 << PM_PG_BITS;
pub(super) const PM_DP_BITS: u32 = 16;
pub(super) const PM_DP_WIDTH: u32 = 1 << PM_DP_BITS;
pub(super) const PM_AMP_BITS: u32 = 8;
const PM_AMP: f64 = (1 << PM_AMP_BITS) as f64;
/// Vibrato speed in Hz and depth in cents.
const PM_SPEED: f64 = 6.4;
const PM_DEPTH: f64 = 13.75;

const AM_PG_BITS: u32 = 8;
const AM_PG_WIDTH: usize = 1 << AM_PG_BITS;
pub(super) const AM_DP_BITS: u32 = 16;
pub(super) const AM_DP_WIDTH: u32 = 1 << AM_DP_BITS;
/// Tremolo speed in Hz and depth in dB.
const AM_SPEED: f64 = 3.6413;
const AM_DEPTH: f64 = 4.875;

const DB2LIN_AMP_BITS: u32 = 8;

/// Output sample rate of the chip: the 3.58 MHz master clock over 72.
pub(super) const CHIP_RATE: f64 = 3_579_545.0 / 72.0;

/// Multiplier per MULT value, doubled so 1/2 stays integral.
const ML_TABLE: [u32; 16] = [1, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 20, 24, 24, 30, 30];

/// Key-scale attenuation per F-number bucket, in 1/2 dB.
const KL_TABLE: [f64; 16] = [
    0.0, 18.0, 24.0, 27.75, 30.0, 32.25, 33.75, 35.25, 36.0, 37.5, 38.25, 39.0, 39.75, 40.5,
    41.25, 42.0,
];

pub(super) const fn eg2db(eg: u32) -> u32 {
    eg * 2
}

const fn tl2eg(tl: u32) -> u32 {
    tl * 2
}

const fn sl2eg(sl: u32) -> u32 {
    sl * 8
}

pub(super) struct Tables {
    /// Attack curve: linear phase to logarithmic envelope.
    pub(super) ar_adjust: [u32; EG_MUTE as usize],
    /// Attenuation (dB steps) to signed linear amplitude. The second half
    /// holds the negated copy used by the negative half of the sine.
    pub(super) db2lin: Vec<i32>,
    /// Full and half-rectified sine in dB steps.
    pub(super) waves: [Vec<u32>; 2],
    pm: [i32; PM_PG_WIDTH],
    am: [i32; AM_PG_WIDTH],
    pub(super) pm_dphase: u32,
    pub(super) am_dphase: u32,
    /// Phase increment by `[fnum][block][mult]`.
    dphase: Vec<u32>,
    /// Total level + key-scale level by `[fnum >> 5][block][tl][kl]`.
    tll: Vec<u32>,
    /// Key-scale rate by `[fnum >> 8][block][kr]`.
    rks: [[[u32; 2]; 8]; 2],
    /// Envelope increments by `[rate][rks]`.
    pub(super) ar: [[u32; 16]; 16],
    pub(super) dr: [[u32; 16]; 16],
    /// Sustain level thresholds in envelope phase units.
    pub(super) sl: [u32; 16],
}

pub(super) static TABLES: LazyLock<Tables> = LazyLock::new(Tables::build);

impl Tables {
    fn build() -> Self {
        let mut ar_adjust = [0u32; EG_MUTE as usize];
        ar_adjust[0] = EG_MUTE;
        for (i, slot) in ar_adjust.iter_mut().enumerate().skip(1) {
            *slot = (EG_MUTE as f64 - 1.0 - EG_MUTE as f64 * (i as f64).ln() / (EG_MUTE as f64).ln())
                as u32;
        }

        let mute2 = (DB_MUTE * 2) as usize;
        let mut db2lin = vec![0i32; mute2 * 2];
        for i in 0..mute2 {
            let amp = if i < DB_MUTE as usize {
                (((1 << DB2LIN_AMP_BITS) - 1) as f64 * 10f64.powf(-(i as f64) * DB_STEP / 20.0))
                    as i32
            } else {
                0
            };
            db2lin[i] = amp;
            db2lin[i + mute2] = -amp;
        }

        let lin2db = |d: f64| -> u32 {
            if d == 0.0 {
                DB_MUTE - 1
            } else {
                let db = -(20.0 * d.log10() / DB_STEP) as i64;
                db.clamp(0, DB_MUTE as i64 - 1) as u32
            }
        };
        let mut full = vec![0u32; PG_WIDTH];
        for i in 0..PG_WIDTH / 4 {
            full[i] = lin2db((2.0 * PI * i as f64 / PG_WIDTH as f64).sin());
        }
        for i in 0..PG_WIDTH / 4 {
            full[PG_WIDTH / 2 - 1 - i] = full[i];
        }
        for i in 0..PG_WIDTH / 2 {
            full[PG_WIDTH / 2 + i] = DB_MUTE * 2 + full[i];
        }
        let half: Vec<u32> = (0..PG_WIDTH)
            .map(|i| if i < PG_WIDTH / 2 { full[i] } else { full[0] })
            .collect();

        let mut pm = [0i32; PM_PG_WIDTH];
        for (i, slot) in pm.iter_mut().enumerate() {
            let phase = (2.0 * PI * i as f64 / PM_PG_WIDTH as f64).sin();
            *slot = (PM_AMP * 2f64.powf(PM_DEPTH * phase / 1200.0)) as i32;
        }
        let mut am = [0i32; AM_PG_WIDTH];
        for (i, slot) in am.iter_mut().enumerate() {
            let phase = (2.0 * PI * i as f64 / PM_PG_WIDTH as f64).sin();
            *slot = (AM_DEPTH / 2.0 / DB_STEP * (1.0 + phase)) as i32;
        }

        let mut dphase = vec![0u32; 512 * 8 * 16];
        for fnum in 0..512u32 {
            for block in 0..8u32 {
                for (ml, mult) in ML_TABLE.iter().enumerate() {
                    dphase[dphase_index(fnum, block, ml as u32)] =
                        ((fnum * mult) << block) >> (20 - DP_BITS);
                }
            }
        }

        let mut tll = vec![0u32; 16 * 8 * 64 * 4];
        for fnum in 0..16u32 {
            for block in 0..8u32 {
                for tl in 0..64u32 {
                    for kl in 0..4u32 {
                        let value = if kl == 0 {
                            tl2eg(tl)
                        } else {
                            let tmp = (KL_TABLE[fnum as usize] - 6.0 * (7 - block) as f64) as i32;
                            if tmp <= 0 {
                                tl2eg(tl)
                            } else {
                                ((tmp >> (3 - kl)) as f64 / EG_STEP) as u32 + tl2eg(tl)
                            }
                        };
                        tll[tll_index(fnum, block, tl, kl)] = value;
                    }
                }
            }
        }

        let mut rks = [[[0u32; 2]; 8]; 2];
        for (fnum8, by_block) in rks.iter_mut().enumerate() {
            for (block, by_kr) in by_block.iter_mut().enumerate() {
                by_kr[0] = block as u32 >> 1;
                by_kr[1] = ((block as u32) << 1) + fnum8 as u32;
            }
        }

        // Closed-form rate tables: the increment doubles every 4 rate steps,
        // with the low two RKS bits interpolating in quarters.
        let mut ar = [[0u32; 16]; 16];
        let mut dr = [[0u32; 16]; 16];
        for rate in 0..16u32 {
            for rks_value in 0..16u32 {
                let rm = (rate + (rks_value >> 2)).min(15);
                let rl = rks_value & 3;
                ar[rate as usize][rks_value as usize] = match rate {
                    0 | 15 => 0,
                    _ => (3 * (rl + 4)) << (rm + 1),
                };
                dr[rate as usize][rks_value as usize] = match rate {
                    0 => 0,
                    _ => (rl + 4) << (rm - 1),
                };
            }
        }

        let mut sl = [0u32; 16];
        for (i, slot) in sl.iter_mut().enumerate() {
            // 3 dB per step; the top step jumps to 48 dB.
            let db = if i == 15 { 48.0 } else { i as f64 * SL_STEP };
            *slot = sl2eg((db / SL_STEP) as u32) << (EG_DP_BITS - EG_BITS);
        }

        Self {
            ar_adjust,
            db2lin,
            waves: [full, half],
            pm,
            am,
            pm_dphase: (PM_SPEED * PM_DP_WIDTH as f64 / CHIP_RATE) as u32,
            am_dphase: (AM_SPEED * AM_DP_WIDTH as f64 / CHIP_RATE) as u32,
            dphase,
            tll,
            rks,
            ar,
            dr,
            sl,
        }
    }

    pub(super) fn dphase(&self, fnum: u32, block: u32, ml: u32) -> u32 {
        self.dphase[dphase_index(fnum, block, ml)]
    }

    pub(super) fn tll(&self, fnum: u32, block: u32, tl: u32, kl: u32) -> u32 {
        self.tll[tll_index(fnum >> 5, block, tl, kl)]
    }

    pub(super) fn rks(&self, fnum: u32, block: u32, kr: bool) -> u32 {
        self.rks[(fnum >> 8) as usize & 1][block as usize & 7][kr as usize]
    }

    /// Vibrato multiplier (256 = unity) at LFO phase `phase`.
    pub(super) fn lfo_pm(&self, phase: u32) -> i32 {
        self.pm[(phase >> (PM_DP_BITS - PM_PG_BITS)) as usize & (PM_PG_WIDTH - 1)]
    }

    /// Tremolo attenuation in dB steps at LFO phase `phase`.
    pub(super) fn lfo_am(&self, phase: u32) -> u32 {
        self.am[(phase >> (AM_DP_BITS - AM_PG_BITS)) as usize & (AM_PG_WIDTH - 1)] as u32
    }
}

fn dphase_index(fnum: u32, block: u32, ml: u32) -> usize {
    (((fnum & 0x1FF) * 8 + (block & 7)) * 16 + (ml & 15)) as usize
}

fn tll_index(fnum_hi: u32, block: u32, tl: u32, kl: u32) -> usize {
    ((((fnum_hi & 15) * 8 + (block & 7)) * 64 + (tl & 63)) * 4 + (kl & 3)) as usize
}
