use bitflags::bitflags;

bitflags! {
    /// Pending interrupt sources latched by the CPU.
    ///
    /// All lines are level-triggered: a source stays pending until whoever
    /// raised it lowers it again. `RESET` is synthetic and is consumed when
    /// serviced.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IrqSource: u8 {
        const RESET         = 0b0000_0001;
        /// APU frame sequencer (4-step mode, not inhibited).
        const FRAME_COUNTER = 0b0000_0010;
        /// DMC sample end with IRQ enabled.
        const DMC           = 0b0000_0100;
        /// Any expansion chip.
        const EXPANSION     = 0b0000_1000;
        /// Asserted by the host.
        const EXTERNAL      = 0b0001_0000;
    }
}

impl IrqSource {
    /// Lines whose level is reported by the bus hook after every instruction.
    pub const DEVICE_LINES: IrqSource = IrqSource::FRAME_COUNTER
        .union(IrqSource::DMC)
        .union(IrqSource::EXPANSION);

    /// Lines that request a maskable IRQ.
    pub const MASKABLE: IrqSource = IrqSource::DEVICE_LINES.union(IrqSource::EXTERNAL);
}
