use std::fmt::Display;

use crate::cpu::{addressing::Addressing, mnemonic::Mnemonic};

/// One decode-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Instruction {
    pub(crate) mnemonic: Mnemonic,
    pub(crate) addressing: Addressing,
}

impl Instruction {
    pub(crate) const fn new(mnemonic: Mnemonic, addressing: Addressing) -> Self {
        Self {
            mnemonic,
            addressing,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.mnemonic, self.addressing)
    }
}
