use crate::{
    bus::{CpuBus, TickResult},
    cpu::IrqSource,
};

/// Flat 64 KiB RAM with a recording timing hook, for CPU tests.
#[derive(Debug)]
pub(crate) struct MockBus {
    pub(crate) mem: Vec<u8>,
    pub(crate) hook_calls: Vec<u32>,
    pub(crate) irq_lines: IrqSource,
    pub(crate) stall_per_call: u32,
}

impl Default for MockBus {
    fn default() -> Self {
        Self {
            mem: vec![0; 0x1_0000],
            hook_calls: Vec::new(),
            irq_lines: IrqSource::empty(),
            stall_per_call: 0,
        }
    }
}

impl MockBus {
    /// Copies `program` to `origin` and points the reset vector at it.
    pub(crate) fn with_program(origin: u16, program: &[u8]) -> Self {
        let mut bus = Self::default();
        bus.load(origin, program);
        bus.mem[0xFFFC] = origin as u8;
        bus.mem[0xFFFD] = (origin >> 8) as u8;
        bus
    }

    pub(crate) fn load(&mut self, origin: u16, bytes: &[u8]) {
        let start = origin as usize;
        self.mem[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

impl CpuBus for MockBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.mem[addr as usize] = value;
    }

    fn on_cpu_cycles(&mut self, cycles: u32) -> TickResult {
        self.hook_calls.push(cycles);
        TickResult {
            irq_lines: self.irq_lines,
            stall_cycles: self.stall_per_call,
        }
    }
}
