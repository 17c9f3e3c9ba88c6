//! Flag-setting arithmetic, logic and shift primitives.
//!
//! Each function takes the status register and operand values explicitly and
//! returns the result, so undocumented opcodes are just compositions such as
//! `cmp(dec(m))` or `adc(ror(m))`.

use crate::cpu::status::Status;

pub(crate) fn adc(p: &mut Status, a: u8, m: u8) -> u8 {
    let carry = p.contains(Status::CARRY) as u16;
    let sum = a as u16 + m as u16 + carry;
    let result = sum as u8;
    p.set(Status::CARRY, sum > 0xFF);
    p.set(Status::OVERFLOW, (!(a ^ m) & (a ^ result) & 0x80) != 0);
    p.update_zn(result);
    result
}

pub(crate) fn sbc(p: &mut Status, a: u8, m: u8) -> u8 {
    adc(p, a, !m)
}

pub(crate) fn compare(p: &mut Status, register: u8, m: u8) {
    let diff = register.wrapping_sub(m);
    p.set(Status::CARRY, register >= m);
    p.update_zn(diff);
}

pub(crate) fn and(p: &mut Status, a: u8, m: u8) -> u8 {
    let r = a & m;
    p.update_zn(r);
    r
}

pub(crate) fn ora(p: &mut Status, a: u8, m: u8) -> u8 {
    let r = a | m;
    p.update_zn(r);
    r
}

pub(crate) fn eor(p: &mut Status, a: u8, m: u8) -> u8 {
    let r = a ^ m;
    p.update_zn(r);
    r
}

pub(crate) fn bit(p: &mut Status, a: u8, m: u8) {
    p.update_zero(a & m);
    p.set(Status::OVERFLOW, m & 0x40 != 0);
    p.set(Status::NEGATIVE, m & 0x80 != 0);
}

pub(crate) fn asl(p: &mut Status, m: u8) -> u8 {
    p.set(Status::CARRY, m & 0x80 != 0);
    let r = m << 1;
    p.update_zn(r);
    r
}

pub(crate) fn lsr(p: &mut Status, m: u8) -> u8 {
    p.set(Status::CARRY, m & 0x01 != 0);
    let r = m >> 1;
    p.update_zn(r);
    r
}

pub(crate) fn rol(p: &mut Status, m: u8) -> u8 {
    let carry_in = p.contains(Status::CARRY) as u8;
    p.set(Status::CARRY, m & 0x80 != 0);
    let r = (m << 1) | carry_in;
    p.update_zn(r);
    r
}

pub(crate) fn ror(p: &mut Status, m: u8) -> u8 {
    let carry_in = (p.contains(Status::CARRY) as u8) << 7;
    p.set(Status::CARRY, m & 0x01 != 0);
    let r = (m >> 1) | carry_in;
    p.update_zn(r);
    r
}

pub(crate) fn inc(p: &mut Status, m: u8) -> u8 {
    let r = m.wrapping_add(1);
    p.update_zn(r);
    r
}

pub(crate) fn dec(p: &mut Status, m: u8) -> u8 {
    let r = m.wrapping_sub(1);
    p.update_zn(r);
    r
}

/// ARR: AND then ROR, with C and V taken from bits 6 and 5 of the result.
pub(crate) fn arr(p: &mut Status, a: u8, m: u8) -> u8 {
    let carry_in = (p.contains(Status::CARRY) as u8) << 7;
    let r = ((a & m) >> 1) | carry_in;
    p.update_zn(r);
    p.set(Status::CARRY, r & 0x40 != 0);
    p.set(Status::OVERFLOW, ((r >> 6) ^ (r >> 5)) & 0x01 != 0);
    r
}

/// SBX: X = (A & X) - m, flags like CMP.
pub(crate) fn sbx(p: &mut Status, a: u8, x: u8, m: u8) -> u8 {
    let ax = a & x;
    compare(p, ax, m);
    ax.wrapping_sub(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adc_sets_overflow_on_signed_wrap() {
        let mut p = Status::new();
        assert_eq!(adc(&mut p, 0x7F, 0x01), 0x80);
        assert!(p.contains(Status::OVERFLOW | Status::NEGATIVE));
        assert!(!p.contains(Status::CARRY));

        let mut p = Status::new();
        assert_eq!(adc(&mut p, 0xFF, 0x01), 0x00);
        assert!(p.contains(Status::CARRY | Status::ZERO));
        assert!(!p.contains(Status::OVERFLOW));
    }

    #[test]
    fn decimal_flag_does_not_change_adc() {
        let mut p = Status::new() | Status::DECIMAL;
        assert_eq!(adc(&mut p, 0x09, 0x01), 0x0A);
    }

    #[test]
    fn sbc_borrows_through_carry() {
        let mut p = Status::new() | Status::CARRY;
        assert_eq!(sbc(&mut p, 0x00, 0x01), 0xFF);
        assert!(!p.contains(Status::CARRY));
        assert!(p.contains(Status::NEGATIVE));
    }

    #[test]
    fn rotates_thread_carry() {
        let mut p = Status::new() | Status::CARRY;
        assert_eq!(rol(&mut p, 0x80), 0x01);
        assert!(p.contains(Status::CARRY));
        assert_eq!(ror(&mut p, 0x00), 0x80);
        assert!(!p.contains(Status::CARRY));
    }

    #[test]
    fn arr_flags() {
        let mut p = Status::new() | Status::CARRY;
        let r = arr(&mut p, 0xFF, 0xC0);
        assert_eq!(r, 0xE0);
        assert!(p.contains(Status::CARRY));
        assert!(!p.contains(Status::OVERFLOW));
    }
}
