//! CPU address-space dispatch.
//!
//! [`Bus`] owns one reader slot and one writer chain for every address in the
//! 64 KiB space. Handlers are plain values of a caller-chosen tag type `H`;
//! the state they act on lives in a separate [`BusTarget`] passed to every
//! access, so the tables never capture mutable state.
//!
//! Writer chains are kept head-first: registering a writer on an address that
//! already has one puts the new handler in front, and a write fires the chain
//! from head to tail (most recently registered first). Overlapping register
//! regions rely on that order.

use std::{fmt::Debug, ops::RangeInclusive};

use crate::cpu::IrqSource;

#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod open_bus;
mod port;

pub(crate) use open_bus::OpenBus;
pub use port::Port;

/// Number of addressable bytes on the CPU bus.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// Device state addressed by bus handler tags.
pub trait BusTarget<H> {
    /// Services a read routed to `handler`. `bus_value` is the current
    /// open-bus byte, for handlers that only drive some data lines.
    fn read(&mut self, handler: H, addr: u16, bus_value: u8) -> u8;

    fn write(&mut self, handler: H, addr: u16, value: u8);
}

/// Reader table plus head-first writer chains for the whole address space.
#[derive(Debug, Clone)]
pub struct Bus<H> {
    readers: Box<[Option<H>]>,
    writers: Box<[Vec<H>]>,
    open_bus: OpenBus,
}

impl<H: Copy + Debug> Default for Bus<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Copy + Debug> Bus<H> {
    pub fn new() -> Self {
        Self {
            readers: vec![None; ADDRESS_SPACE].into_boxed_slice(),
            writers: (0..ADDRESS_SPACE).map(|_| Vec::new()).collect(),
            open_bus: OpenBus::new(),
        }
    }

    /// Installs `handler` as the reader for every address in `range`
    /// (inclusive), replacing any previous reader.
    pub fn set_reader(&mut self, range: RangeInclusive<u16>, handler: H) {
        for addr in range {
            self.readers[addr as usize] = Some(handler);
        }
    }

    /// Prepends `handler` to the writer chain of every address in `range`
    /// (inclusive).
    pub fn set_writer(&mut self, range: RangeInclusive<u16>, handler: H) {
        for addr in range {
            self.writers[addr as usize].insert(0, handler);
        }
    }

    pub fn reader(&self, addr: u16) -> Option<H> {
        self.readers[addr as usize]
    }

    /// Writer chain for `addr`, in firing order.
    pub fn writers(&self, addr: u16) -> &[H] {
        &self.writers[addr as usize]
    }

    /// Last value seen on the data bus.
    pub fn open_bus(&self) -> u8 {
        self.open_bus.sample()
    }

    pub fn read<T: BusTarget<H> + ?Sized>(&mut self, target: &mut T, addr: u16) -> u8 {
        let value = match self.readers[addr as usize] {
            Some(handler) => target.read(handler, addr, self.open_bus.sample()),
            None => self.open_bus.sample(),
        };
        self.open_bus.latch(value);
        value
    }

    pub fn write<T: BusTarget<H> + ?Sized>(&mut self, target: &mut T, addr: u16, value: u8) {
        self.open_bus.latch(value);
        for &handler in &self.writers[addr as usize] {
            target.write(handler, addr, value);
        }
    }

    /// Clears the open-bus latch. Handler tables are left untouched.
    pub fn reset(&mut self) {
        self.open_bus.reset();
    }
}

/// What the per-instruction hook hands back to the CPU.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickResult {
    /// Level of every device-driven IRQ line after the hook ran.
    pub irq_lines: IrqSource,
    /// Cycles the CPU was halted for (DMC sample fetches).
    pub stall_cycles: u32,
}

/// The CPU's view of the machine: memory access plus the per-instruction
/// timing hook.
pub trait CpuBus {
    fn read(&mut self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, value: u8);

    /// Called once after every instruction with the cycles it consumed,
    /// before the next opcode fetch.
    fn on_cpu_cycles(&mut self, cycles: u32) -> TickResult;
}
