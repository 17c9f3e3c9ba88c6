//! Operator patches and the built-in instrument ROM.

/// Parameters of one operator (modulator or carrier).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Patch {
    /// Total level, modulator only (carrier uses the channel volume).
    pub(super) tl: u8,
    /// Feedback depth, modulator only.
    pub(super) fb: u8,
    /// Percussive (false) or sustained (true) envelope.
    pub(super) eg: bool,
    pub(super) ml: u8,
    pub(super) ar: u8,
    pub(super) dr: u8,
    pub(super) sl: u8,
    pub(super) rr: u8,
    pub(super) kr: bool,
    pub(super) kl: u8,
    pub(super) am: bool,
    pub(super) pm: bool,
    /// Waveform: 0 = full sine, 1 = half-rectified.
    pub(super) wf: u8,
}

/// Built-in instruments 1-15; instrument 0 is the custom patch in
/// registers `$00-$07`.
const PRESETS: [[u8; 8]; 15] = [
    [0x03, 0x21, 0x05, 0x06, 0xE8, 0x81, 0x42, 0x27],
    [0x13, 0x41, 0x14, 0x0D, 0xD8, 0xF6, 0x23, 0x12],
    [0x11, 0x11, 0x08, 0x08, 0xFA, 0xB2, 0x20, 0x12],
    [0x31, 0x61, 0x0C, 0x07, 0xA8, 0x64, 0x61, 0x27],
    [0x32, 0x21, 0x1E, 0x06, 0xE1, 0x76, 0x01, 0x28],
    [0x02, 0x01, 0x06, 0x00, 0xA3, 0xE2, 0xF4, 0xF4],
    [0x21, 0x61, 0x1D, 0x07, 0x82, 0x81, 0x11, 0x07],
    [0x23, 0x21, 0x22, 0x17, 0xA2, 0x72, 0x01, 0x17],
    [0x35, 0x11, 0x25, 0x00, 0x40, 0x73, 0x72, 0x01],
    [0xB5, 0x01, 0x0F, 0x0F, 0xA8, 0xA5, 0x51, 0x02],
    [0x17, 0xC1, 0x24, 0x07, 0xF8, 0xF8, 0x22, 0x12],
    [0x71, 0x23, 0x11, 0x06, 0x65, 0x74, 0x18, 0x16],
    [0x01, 0x02, 0xD3, 0x05, 0xC9, 0x95, 0x03, 0x02],
    [0x61, 0x63, 0x0C, 0x00, 0x94, 0xC0, 0x33, 0xF6],
    [0x21, 0x72, 0x0D, 0x00, 0xC1, 0xD5, 0x56, 0x06],
];

/// Decodes an 8-byte instrument dump into `[modulator, carrier]`.
pub(super) fn decode(dump: &[u8; 8]) -> [Patch; 2] {
    let op = |i: usize| Patch {
        am: dump[i] & 0x80 != 0,
        pm: dump[i] & 0x40 != 0,
        eg: dump[i] & 0x20 != 0,
        kr: dump[i] & 0x10 != 0,
        ml: dump[i] & 0x0F,
        kl: dump[2 + i] >> 6,
        wf: (dump[3] >> (3 + i)) & 1,
        ar: dump[4 + i] >> 4,
        dr: dump[4 + i] & 0x0F,
        sl: dump[6 + i] >> 4,
        rr: dump[6 + i] & 0x0F,
        ..Patch::default()
    };
    let mut modulator = op(0);
    modulator.tl = dump[2] & 0x3F;
    modulator.fb = dump[3] & 0x07;
    [modulator, op(1)]
}

/// Decoded instrument table: custom patch first, then the presets.
pub(super) fn bank(custom: &[u8; 8]) -> [[Patch; 2]; 16] {
    let mut bank = [[Patch::default(); 2]; 16];
    bank[0] = decode(custom);
    for (slot, dump) in bank[1..].iter_mut().zip(PRESETS.iter()) {
        *slot = decode(dump);
    }
    bank
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_violin_preset() {
        let [m, c] = decode(&PRESETS[0]);
        assert_eq!((m.ml, m.kr, m.eg, m.am, m.pm), (3, false, false, false, false));
        assert_eq!((c.ml, c.eg), (1, true));
        assert_eq!((m.kl, m.tl), (0, 5));
        assert_eq!((c.kl, m.fb), (0, 6));
        assert_eq!((m.wf, c.wf), (0, 0));
        assert_eq!((m.ar, m.dr, c.ar, c.dr), (0xE, 0x8, 0x8, 0x1));
        assert_eq!((m.sl, m.rr, c.sl, c.rr), (4, 2, 2, 7));
    }

    #[test]
    fn waveform_bits_are_per_operator() {
        let [m, c] = decode(&[0, 0, 0, 0b0001_0000, 0, 0, 0, 0]);
        assert_eq!((m.wf, c.wf), (0, 1));
        let [m, c] = decode(&[0, 0, 0, 0b0000_1000, 0, 0, 0, 0]);
        assert_eq!((m.wf, c.wf), (1, 0));
    }
}
