use std::fmt::Display;

/// Every 6502 operation the decode table can produce, documented or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Mnemonic {
    // Load/Store
    LAS,
    LAX,
    LDA,
    LDX,
    LDY,
    LXA,
    SAX,
    SHA,
    SHX,
    SHY,
    STA,
    STX,
    STY,
    // Transfer
    SHS,
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
    // Stack
    PHA,
    PHP,
    PLA,
    PLP,
    // Shift
    ASL,
    LSR,
    ROL,
    ROR,
    // Logic
    AND,
    BIT,
    EOR,
    ORA,
    // Arithmetic
    ADC,
    ANC,
    ARR,
    ASR,
    CMP,
    CPX,
    CPY,
    DCP,
    ISC,
    RLA,
    RRA,
    SBC,
    SBX,
    SLO,
    SRE,
    XAA,
    // Inc/Dec
    DEC,
    DEX,
    DEY,
    INC,
    INX,
    INY,
    // Control flow
    BRK,
    JMP,
    JSR,
    RTI,
    RTS,
    // Branch
    BCC,
    BCS,
    BEQ,
    BMI,
    BNE,
    BPL,
    BVC,
    BVS,
    // Flags
    CLC,
    CLD,
    CLI,
    CLV,
    SEC,
    SED,
    SEI,
    // KIL
    JAM,
    NOP,
}

impl Mnemonic {
    /// Undocumented opcodes whose result depends on analog chip behaviour
    /// (bus capacitance, the high-byte AND glitch). They are emulated with the
    /// commonly observed results and reported when executed.
    pub(crate) const fn is_unstable(&self) -> bool {
        matches!(
            self,
            Mnemonic::XAA
                | Mnemonic::LXA
                | Mnemonic::SHA
                | Mnemonic::SHX
                | Mnemonic::SHY
                | Mnemonic::SHS
        )
    }
}

impl Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
