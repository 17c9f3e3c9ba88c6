use std::fmt::Display;

/// 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Addressing {
    /// No operand (`CLC`, `RTS`).
    Implied,
    /// Operates on A (`ASL A`).
    Accumulator,
    /// Operand is the byte after the opcode (`LDA #$42`).
    Immediate,
    /// Full 16-bit address (`LDA $1234`).
    Absolute,
    /// `address + X`; reads pay one extra cycle on a page cross.
    AbsoluteX,
    /// `address + Y`; reads pay one extra cycle on a page cross.
    AbsoluteY,
    /// `JMP ($xxFF)` keeps the high-byte fetch inside the same page.
    Indirect,
    /// `($zp,X)`: pointer read from zero page after adding X, wrapping in page 0.
    IndirectX,
    /// `($zp),Y`: pointer read from zero page, then Y added.
    IndirectY,
    /// Signed 8-bit branch offset.
    Relative,
    ZeroPage,
    /// Wraps within page 0.
    ZeroPageX,
    /// Wraps within page 0.
    ZeroPageY,
}

impl Display for Addressing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Addressing::Implied => "imp",
            Addressing::Accumulator => "acc",
            Addressing::Immediate => "imm",
            Addressing::Absolute => "abs",
            Addressing::AbsoluteX => "abx",
            Addressing::AbsoluteY => "aby",
            Addressing::Indirect => "ind",
            Addressing::IndirectX => "inx",
            Addressing::IndirectY => "iny",
            Addressing::Relative => "rel",
            Addressing::ZeroPage => "zp",
            Addressing::ZeroPageX => "zpx",
            Addressing::ZeroPageY => "zpy",
        };
        f.write_str(s)
    }
}
