/// Handler tags installed on the player's [`Bus`](crate::bus::Bus).
///
/// Each tag names the device state it acts on; the state itself lives in the
/// bus target handed to every access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// 2 KiB internal RAM, mirrored through `$1FFF`.
    Ram,
    /// 8 KiB work RAM at `$6000-$7FFF`.
    Sram,
    /// Banked program ROM at `$8000-$FFFF`.
    Prg,
    /// `$4015` status read.
    ApuStatus,
    /// APU register writes.
    ApuRegister,
    /// `$5FF8-$5FFF` bank-select registers.
    BankSelect,
    /// Expansion chip in the given registration slot.
    Chip(u8),
}
