use bitflags::bitflags;

bitflags! {
    /// The 6502 processor status register (P).
    ///
    /// Bit layout:
    /// 7 6 5 4 3 2 1 0
    /// N V U B D I Z C
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Status: u8 {
        /// Carry out of bit 7, or no borrow on subtraction.
        const CARRY     = 0b0000_0001;
        const ZERO      = 0b0000_0010;
        /// Masks IRQ when set. Reset ignores it.
        const INTERRUPT = 0b0000_0100;
        /// Stored and restored, but the 2A03 has no BCD unit.
        const DECIMAL   = 0b0000_1000;
        /// Only exists in copies pushed by BRK/PHP.
        const BREAK     = 0b0001_0000;
        /// Always reads back as 1.
        const UNUSED    = 0b0010_0000;
        const OVERFLOW  = 0b0100_0000;
        const NEGATIVE  = 0b1000_0000;
    }
}

impl Status {
    /// Power-up value: IRQ masked, unused bit set.
    pub(crate) fn new() -> Self {
        Status::INTERRUPT | Status::UNUSED
    }

    pub(crate) fn update_zero(&mut self, value: u8) {
        self.set(Status::ZERO, value == 0);
    }

    pub(crate) fn update_negative(&mut self, value: u8) {
        self.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    pub(crate) fn update_zn(&mut self, value: u8) {
        self.update_zero(value);
        self.update_negative(value);
    }

    /// Byte pushed by PHP/BRK (`brk = true`) or by a hardware interrupt.
    pub(crate) fn to_stack_byte(self, brk: bool) -> u8 {
        let mut pushed = self | Status::UNUSED;
        pushed.set(Status::BREAK, brk);
        pushed.bits()
    }

    /// Value loaded by PLP/RTI: B is dropped and U forced on.
    pub(crate) fn from_stack_byte(byte: u8) -> Self {
        (Status::from_bits_truncate(byte) - Status::BREAK) | Status::UNUSED
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
