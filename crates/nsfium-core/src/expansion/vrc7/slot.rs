//! One FM operator: phase generator, envelope generator, and output stage.

use super::{
    patch::Patch,
    tables::{
        DB_MUTE, DP_BASE_BITS, DP_WIDTH, EG_BITS, EG_DP_BITS, EG_DP_WIDTH, EG_MUTE, PG_WIDTH,
        PM_AMP_BITS, TABLES, eg2db,
    },
};

const EG_SHIFT: u32 = EG_DP_BITS - EG_BITS;

/// Envelope generator state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum EgState {
    /// Fast damp of a still-sounding slot before a retriggered attack.
    Settle,
    Attack,
    Decay,
    /// Held at the sustain level (sustained patches while keyed).
    SusHold,
    /// Decaying at the release rate (percussive patches while keyed).
    Sustain,
    Release,
    #[default]
    Finish,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub(super) struct Slot {
    pub(super) patch: Patch,
    carrier: bool,

    fnum: u32,
    block: u32,
    /// Carrier attenuation in total-level units (channel volume * 4).
    volume: u32,
    /// Channel sustain flag; slows the release of carriers.
    sustain: bool,

    phase: u32,
    dphase: u32,
    pgout: u32,

    state: EgState,
    eg_phase: u32,
    eg_dphase: u32,
    /// Attenuation after envelope, level, and tremolo, in dB steps.
    egout: u32,
    tll: u32,
    rks: u32,

    output: [i32; 2],
    feedback: i32,
}

impl Slot {
    pub(super) fn new(carrier: bool) -> Self {
        Self {
            carrier,
            egout: DB_MUTE - 1,
            ..Self::default()
        }
    }

    pub(super) fn state(&self) -> EgState {
        self.state
    }

    pub(super) fn set_frequency(&mut self, fnum: u32, block: u32) {
        self.fnum = fnum & 0x1FF;
        self.block = block & 7;
    }

    pub(super) fn set_volume(&mut self, volume: u8) {
        self.volume = (volume as u32 & 0x0F) << 2;
    }

    pub(super) fn set_sustain(&mut self, sustain: bool) {
        self.sustain = sustain;
    }

    /// Recomputes every field derived from the patch and the channel's
    /// frequency and volume.
    pub(super) fn refresh(&mut self) {
        let t = &*TABLES;
        let p = self.patch;
        self.dphase = t.dphase(self.fnum, self.block, p.ml as u32);
        let level = if self.carrier {
            self.volume
        } else {
            p.tl as u32
        };
        self.tll = t.tll(self.fnum, self.block, level, p.kl as u32);
        self.rks = t.rks(self.fnum, self.block, p.kr);
        self.eg_dphase = self.eg_rate();
    }

    fn eg_rate(&self) -> u32 {
        let t = &*TABLES;
        let rks = self.rks as usize;
        let p = self.patch;
        match self.state {
            EgState::Attack => t.ar[p.ar as usize][rks],
            EgState::Decay => t.dr[p.dr as usize][rks],
            EgState::SusHold | EgState::Finish => 0,
            EgState::Sustain => t.dr[p.rr as usize][rks],
            EgState::Release if self.sustain => t.dr[5][rks],
            EgState::Release if p.eg => t.dr[p.rr as usize][rks],
            EgState::Release => t.dr[7][rks],
            EgState::Settle => t.dr[15][0],
        }
    }

    fn enter(&mut self, state: EgState) {
        self.state = state;
        self.eg_dphase = self.eg_rate();
    }

    fn start_attack(&mut self) {
        self.eg_phase = 0;
        self.phase = 0;
        self.enter(EgState::Attack);
    }

    /// Converts an attack-curve phase into the linear decay domain.
    fn linearize_attack(&mut self) {
        if self.state == EgState::Attack {
            let level = TABLES.ar_adjust[(self.eg_phase >> EG_SHIFT) as usize];
            self.eg_phase = level << EG_SHIFT;
        }
    }

    pub(super) fn key_on(&mut self) {
        if self.state == EgState::Finish {
            self.start_attack();
        } else {
            self.linearize_attack();
            self.enter(EgState::Settle);
        }
    }

    pub(super) fn key_off(&mut self) {
        self.linearize_attack();
        self.enter(EgState::Release);
    }

    /// Steps the phase and envelope generators by one chip sample.
    pub(super) fn advance(&mut self, lfo_pm: i32, lfo_am: u32) {
        let step = if self.patch.pm {
            ((self.dphase as i64 * lfo_pm as i64) >> PM_AMP_BITS) as u32
        } else {
            self.dphase
        };
        self.phase = self.phase.wrapping_add(step) & (DP_WIDTH - 1);
        self.pgout = self.phase >> DP_BASE_BITS;

        let eg = self.envelope();
        let mut egout = eg2db(eg + self.tll);
        if self.patch.am {
            egout += lfo_am;
        }
        self.egout = match self.state {
            EgState::Finish => DB_MUTE - 1,
            _ => egout.min(DB_MUTE - 1),
        };
    }

    fn envelope(&mut self) -> u32 {
        let level = self.eg_phase >> EG_SHIFT;
        match self.state {
            EgState::Attack => {
                let out = TABLES.ar_adjust[level as usize];
                self.eg_phase += self.eg_dphase;
                if self.eg_phase & EG_DP_WIDTH != 0 || self.patch.ar == 15 {
                    self.eg_phase = 0;
                    self.enter(EgState::Decay);
                    0
                } else {
                    out
                }
            }
            EgState::Decay => {
                self.eg_phase += self.eg_dphase;
                let sl = TABLES.sl[self.patch.sl as usize];
                if self.eg_phase >= sl {
                    self.eg_phase = sl;
                    self.enter(if self.patch.eg {
                        EgState::SusHold
                    } else {
                        EgState::Sustain
                    });
                }
                level
            }
            EgState::SusHold => {
                if !self.patch.eg {
                    self.enter(EgState::Sustain);
                }
                level
            }
            EgState::Sustain | EgState::Release => {
                self.eg_phase += self.eg_dphase;
                if level >= EG_MUTE {
                    self.enter(EgState::Finish);
                    EG_MUTE - 1
                } else {
                    level
                }
            }
            EgState::Settle => {
                self.eg_phase += self.eg_dphase;
                if level >= EG_MUTE {
                    self.start_attack();
                    EG_MUTE - 1
                } else {
                    level
                }
            }
            EgState::Finish => EG_MUTE - 1,
        }
    }

    fn lookup(&self, modulation: i32) -> i32 {
        let t = &*TABLES;
        let wave = &t.waves[self.patch.wf as usize & 1];
        let index = (self.pgout as i32 + modulation) & (PG_WIDTH as i32 - 1);
        t.db2lin[(wave[index as usize] + self.egout) as usize]
    }

    /// Modulator output; also updates the feedback history.
    pub(super) fn modulate(&mut self) -> i32 {
        self.output[1] = self.output[0];
        self.output[0] = if self.egout >= DB_MUTE - 1 {
            0
        } else if self.patch.fb != 0 {
            self.lookup((self.feedback << 2) >> (7 - self.patch.fb))
        } else {
            self.lookup(0)
        };
        self.feedback = (self.output[1] + self.output[0]) >> 1;
        self.feedback
    }

    /// Carrier output for modulator value `fm`, averaged with the previous
    /// sample.
    pub(super) fn carry(&mut self, fm: i32) -> i32 {
        self.output[0] = if self.egout >= DB_MUTE - 1 {
            0
        } else {
            self.lookup(fm << 3)
        };
        self.output[1] = (self.output[1] + self.output[0]) >> 1;
        self.output[1]
    }
}
