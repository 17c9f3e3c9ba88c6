//! Nonlinear 2A03 output mixing.
//!
//! The console sums its channels through two resistor networks. Both are
//! modelled by lookup tables indexed by the integer channel sums the
//! accumulator collects.

use std::sync::LazyLock;

/// Largest pulse sum (15 + 15).
pub const SQUARE_MAX: usize = 30;
/// Largest `3*triangle + 2*noise + dmc` sum.
pub const TND_MAX: usize = 3 * 15 + 2 * 15 + 127;

pub static SQUARE_TABLE: LazyLock<[f32; SQUARE_MAX + 1]> = LazyLock::new(|| {
    let mut table = [0.0; SQUARE_MAX + 1];
    for (n, slot) in table.iter_mut().enumerate().skip(1) {
        *slot = (95.52 / (8128.0 / n as f64 + 100.0)) as f32;
    }
    table
});

pub static TND_TABLE: LazyLock<[f32; TND_MAX + 1]> = LazyLock::new(|| {
    let mut table = [0.0; TND_MAX + 1];
    for (n, slot) in table.iter_mut().enumerate().skip(1) {
        *slot = (163.67 / (24329.0 / n as f64 + 100.0)) as f32;
    }
    table
});

/// Mixes one cycle's worth of accumulator slots.
#[inline]
pub fn mix(square: u8, tnd: u16, linear: f32) -> f32 {
    SQUARE_TABLE[square as usize] + TND_TABLE[tnd as usize] + linear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_start_silent_and_rise() {
        assert_eq!(SQUARE_TABLE[0], 0.0);
        assert_eq!(TND_TABLE[0], 0.0);
        assert!(SQUARE_TABLE.windows(2).all(|w| w[1] > w[0]));
        assert!(TND_TABLE.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn full_scale_stays_near_unity() {
        let peak = mix(SQUARE_MAX as u8, TND_MAX as u16, 0.0);
        assert!(peak > 0.95 && peak < 1.01, "{peak}");
        assert!((SQUARE_TABLE[15] - 0.1488).abs() < 1e-3);
    }
}
