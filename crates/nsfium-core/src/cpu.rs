//! 2A03 CPU core (6502 without decimal mode).
//!
//! The core executes whole instructions against a [`CpuBus`]. After every
//! instruction it reports the cycles just spent through
//! [`CpuBus::on_cpu_cycles`], so the APU timeline never drifts from the CPU
//! timeline. The hook also returns the current level of the device IRQ lines
//! and any DMA stall, which are folded in before the next fetch.

use tracing::warn;

use crate::bus::CpuBus;
use crate::cpu::{
    addressing::Addressing,
    cycle::{CYCLE_TABLE, Cycle},
    instruction::Instruction,
    lookup::LOOKUP_TABLE,
    mnemonic::Mnemonic,
    status::Status,
};

mod addressing;
mod alu;
mod cycle;
mod instruction;
mod irq;
mod lookup;
mod mnemonic;
mod status;

pub use irq::IrqSource;

/// Base of the hardware stack page.
pub const STACK_PAGE: u16 = 0x0100;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken to enter an interrupt handler.
const INTERRUPT_CYCLES: u32 = 7;
/// Value XAA and LXA OR into A before masking; most 2A03s settle on it.
const UNSTABLE_MAGIC: u8 = 0xEE;

/// Why [`Cpu::run`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The cycle budget reached zero or below.
    BudgetExhausted,
    /// The program counter reached the return sentinel.
    Returned,
    /// A KIL opcode locked the CPU.
    Jammed,
}

/// Register snapshot for hosts and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuRegisters {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub p: u8,
}

#[derive(Debug, Clone)]
pub struct Cpu {
    a: u8,
    x: u8,
    y: u8,
    s: u8,
    p: Status,
    pc: u16,

    /// Pending interrupt sources.
    irq_latch: IrqSource,
    /// Status as it was before the last instruction; IRQ recognition looks
    /// at this copy, which delays the effect of CLI/SEI/PLP by one
    /// instruction.
    prev_p: Status,
    jammed: bool,

    cycle_budget: i32,
    /// Cycles spent but not yet reported to the hook.
    local_cycles: u32,
    /// Cycles since the last audio flush.
    timestamp: u32,

    /// Address that means "the called routine has returned".
    return_sentinel: Option<u16>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Power-on state. The reset vector is not fetched until [`Cpu::reset`]
    /// is asserted and the CPU runs.
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            p: Status::new(),
            pc: 0,
            irq_latch: IrqSource::empty(),
            prev_p: Status::new(),
            jammed: false,
            cycle_budget: 0,
            local_cycles: 0,
            timestamp: 0,
            return_sentinel: None,
        }
    }

    pub fn registers(&self) -> CpuRegisters {
        CpuRegisters {
            pc: self.pc,
            a: self.a,
            x: self.x,
            y: self.y,
            s: self.s,
            p: self.p.bits(),
        }
    }

    pub fn set_registers(&mut self, regs: CpuRegisters) {
        self.pc = regs.pc;
        self.a = regs.a;
        self.x = regs.x;
        self.y = regs.y;
        self.s = regs.s;
        self.p = Status::from_stack_byte(regs.p);
        self.prev_p = self.p;
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    pub fn pending_irq(&self) -> IrqSource {
        self.irq_latch
    }

    /// Remaining (possibly negative) cycle budget.
    pub fn cycle_budget(&self) -> i32 {
        self.cycle_budget
    }

    pub fn set_return_sentinel(&mut self, sentinel: Option<u16>) {
        self.return_sentinel = sentinel;
    }

    /// Asserts the synthetic reset source. It is serviced ahead of anything
    /// else on the next [`Cpu::run`].
    pub fn reset(&mut self) {
        self.irq_latch.insert(IrqSource::RESET);
    }

    pub fn begin_irq(&mut self, source: IrqSource) {
        self.irq_latch.insert(source);
    }

    pub fn end_irq(&mut self, source: IrqSource) {
        self.irq_latch.remove(source);
    }

    /// Prepares a subroutine call into `addr` that ends at the return
    /// sentinel: pushes `sentinel - 1` (RTS adds one) and jumps.
    pub fn call<B: CpuBus>(&mut self, bus: &mut B, addr: u16, sentinel: u16) {
        let ret = sentinel.wrapping_sub(1);
        self.push(bus, (ret >> 8) as u8);
        self.push(bus, ret as u8);
        self.return_sentinel = Some(sentinel);
        self.pc = addr;
        self.jammed = false;
    }

    /// Rebases the timestamp after an audio flush.
    pub fn rebase_timestamp(&mut self) {
        self.timestamp = 0;
    }

    /// Reports any unreported cycles to the hook so the devices catch up
    /// with [`Cpu::timestamp`].
    pub fn sync<B: CpuBus>(&mut self, bus: &mut B) {
        while self.local_cycles > 0 {
            self.report(bus);
        }
    }

    /// Spends the remaining budget without executing anything, as if the CPU
    /// sat in an idle loop.
    pub fn idle<B: CpuBus>(&mut self, bus: &mut B) {
        if self.cycle_budget > 0 {
            self.add_cycles(self.cycle_budget as u32);
            self.report(bus);
        }
    }

    /// Adds `budget` to the cycle budget and executes until it runs out, the
    /// return sentinel is reached, or the CPU jams.
    pub fn run<B: CpuBus>(&mut self, bus: &mut B, budget: i32) -> RunOutcome {
        self.cycle_budget = self.cycle_budget.saturating_add(budget);
        loop {
            if self.irq_latch.contains(IrqSource::RESET) {
                self.service_reset(bus);
            }
            if self.jammed {
                return RunOutcome::Jammed;
            }
            if self.return_sentinel == Some(self.pc) {
                return RunOutcome::Returned;
            }
            if self.cycle_budget <= 0 {
                return RunOutcome::BudgetExhausted;
            }
            if self.irq_latch.intersects(IrqSource::MASKABLE)
                && !self.prev_p.contains(Status::INTERRUPT)
            {
                self.service_irq(bus);
            }

            self.prev_p = self.p;
            let cycles = self.step(bus);
            self.add_cycles(cycles);
            self.report(bus);
        }
    }

    fn add_cycles(&mut self, cycles: u32) {
        self.local_cycles += cycles;
        self.timestamp = self.timestamp.wrapping_add(cycles);
        self.cycle_budget = self.cycle_budget.saturating_sub(cycles as i32);
    }

    fn report<B: CpuBus>(&mut self, bus: &mut B) {
        let cycles = std::mem::take(&mut self.local_cycles);
        let tick = bus.on_cpu_cycles(cycles);
        self.irq_latch = (self.irq_latch - IrqSource::DEVICE_LINES)
            | (tick.irq_lines & IrqSource::DEVICE_LINES);
        if tick.stall_cycles > 0 {
            self.add_cycles(tick.stall_cycles);
        }
    }

    fn service_reset<B: CpuBus>(&mut self, bus: &mut B) {
        self.irq_latch.remove(IrqSource::RESET);
        self.jammed = false;
        self.s = self.s.wrapping_sub(3);
        self.p = Status::new();
        self.prev_p = self.p;
        self.pc = self.read_word(bus, RESET_VECTOR);
        self.add_cycles(INTERRUPT_CYCLES);
    }

    fn service_irq<B: CpuBus>(&mut self, bus: &mut B) {
        self.push(bus, (self.pc >> 8) as u8);
        self.push(bus, self.pc as u8);
        self.push(bus, self.p.to_stack_byte(false));
        self.p.insert(Status::INTERRUPT);
        self.pc = self.read_word(bus, IRQ_VECTOR);
        self.add_cycles(INTERRUPT_CYCLES);
    }

    fn fetch<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        let v = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        v
    }

    fn fetch_word<B: CpuBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus) as u16;
        let hi = self.fetch(bus) as u16;
        (hi << 8) | lo
    }

    fn read_word<B: CpuBus>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Reads a pointer from zero page; the high byte wraps within page 0.
    fn read_zp_word<B: CpuBus>(&mut self, bus: &mut B, zp: u8) -> u16 {
        let lo = bus.read(zp as u16) as u16;
        let hi = bus.read(zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn push<B: CpuBus>(&mut self, bus: &mut B, value: u8) {
        bus.write(STACK_PAGE | self.s as u16, value);
        self.s = self.s.wrapping_sub(1);
    }

    fn pull<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        self.s = self.s.wrapping_add(1);
        bus.read(STACK_PAGE | self.s as u16)
    }

    /// Resolves the effective address. Returns the address and whether an
    /// index pushed it onto another page.
    fn operand_address<B: CpuBus>(&mut self, bus: &mut B, mode: Addressing) -> (u16, bool) {
        let indexed = |base: u16, index: u8| {
            let addr = base.wrapping_add(index as u16);
            (addr, (base & 0xFF00) != (addr & 0xFF00))
        };
        match mode {
            Addressing::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            Addressing::ZeroPage => (self.fetch(bus) as u16, false),
            Addressing::ZeroPageX => (self.fetch(bus).wrapping_add(self.x) as u16, false),
            Addressing::ZeroPageY => (self.fetch(bus).wrapping_add(self.y) as u16, false),
            Addressing::Absolute => (self.fetch_word(bus), false),
            Addressing::AbsoluteX => {
                let base = self.fetch_word(bus);
                indexed(base, self.x)
            }
            Addressing::AbsoluteY => {
                let base = self.fetch_word(bus);
                indexed(base, self.y)
            }
            Addressing::Indirect => {
                let ptr = self.fetch_word(bus);
                let lo = bus.read(ptr) as u16;
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                ((hi << 8) | lo, false)
            }
            Addressing::IndirectX => {
                let zp = self.fetch(bus).wrapping_add(self.x);
                (self.read_zp_word(bus, zp), false)
            }
            Addressing::IndirectY => {
                let zp = self.fetch(bus);
                let base = self.read_zp_word(bus, zp);
                indexed(base, self.y)
            }
            Addressing::Relative => {
                let offset = self.fetch(bus) as i8;
                indexed_relative(self.pc, offset)
            }
            Addressing::Implied | Addressing::Accumulator => (0, false),
        }
    }

    /// Read-modify-write through `op`, returning the written value.
    fn modify<B: CpuBus>(
        &mut self,
        bus: &mut B,
        mode: Addressing,
        addr: u16,
        op: fn(&mut Status, u8) -> u8,
    ) -> u8 {
        if mode == Addressing::Accumulator {
            self.a = op(&mut self.p, self.a);
            return self.a;
        }
        let m = bus.read(addr);
        // The 6502 writes the unmodified value back before the result.
        bus.write(addr, m);
        let r = op(&mut self.p, m);
        bus.write(addr, r);
        r
    }

    /// Value written by SHA/SHX/SHY/TAS: `value & (high byte of base + 1)`.
    /// On a page cross the high byte of the target is replaced by the result.
    fn store_high_and<B: CpuBus>(&mut self, bus: &mut B, addr: u16, index: u8, value: u8) {
        let base = addr.wrapping_sub(index as u16);
        let high = ((base >> 8) as u8).wrapping_add(1);
        let result = value & high;
        let target = if (base & 0xFF00) != (addr & 0xFF00) {
            ((result as u16) << 8) | (addr & 0x00FF)
        } else {
            addr
        };
        bus.write(target, result);
    }

    fn branch(&mut self, condition: bool, target: u16) -> bool {
        if condition {
            self.pc = target;
        }
        condition
    }

    /// Executes one instruction and returns its cycle cost.
    fn step<B: CpuBus>(&mut self, bus: &mut B) -> u32 {
        let opcode_pc = self.pc;
        let opcode = self.fetch(bus);
        let Instruction {
            mnemonic,
            addressing,
        } = LOOKUP_TABLE[opcode as usize];
        let timing: Cycle = CYCLE_TABLE[opcode as usize];

        if mnemonic.is_unstable() {
            warn!(
                "unstable opcode {:02x} ({}) at {:04x}",
                opcode, LOOKUP_TABLE[opcode as usize], opcode_pc
            );
        }

        let (addr, crossed) = self.operand_address(bus, addressing);
        let mut taken = false;

        match mnemonic {
            // Load/store
            Mnemonic::LDA => {
                self.a = bus.read(addr);
                self.p.update_zn(self.a);
            }
            Mnemonic::LDX => {
                self.x = bus.read(addr);
                self.p.update_zn(self.x);
            }
            Mnemonic::LDY => {
                self.y = bus.read(addr);
                self.p.update_zn(self.y);
            }
            Mnemonic::LAX => {
                let m = bus.read(addr);
                self.a = m;
                self.x = m;
                self.p.update_zn(m);
            }
            Mnemonic::LAS => {
                let r = bus.read(addr) & self.s;
                self.a = r;
                self.x = r;
                self.s = r;
                self.p.update_zn(r);
            }
            Mnemonic::STA => bus.write(addr, self.a),
            Mnemonic::STX => bus.write(addr, self.x),
            Mnemonic::STY => bus.write(addr, self.y),
            Mnemonic::SAX => bus.write(addr, self.a & self.x),
            Mnemonic::SHA => {
                let (value, y) = (self.a & self.x, self.y);
                self.store_high_and(bus, addr, y, value);
            }
            Mnemonic::SHX => {
                let (value, y) = (self.x, self.y);
                self.store_high_and(bus, addr, y, value);
            }
            Mnemonic::SHY => {
                let (value, x) = (self.y, self.x);
                self.store_high_and(bus, addr, x, value);
            }
            Mnemonic::SHS => {
                self.s = self.a & self.x;
                let (value, y) = (self.s, self.y);
                self.store_high_and(bus, addr, y, value);
            }

            // Transfers
            Mnemonic::TAX => {
                self.x = self.a;
                self.p.update_zn(self.x);
            }
            Mnemonic::TAY => {
                self.y = self.a;
                self.p.update_zn(self.y);
            }
            Mnemonic::TSX => {
                self.x = self.s;
                self.p.update_zn(self.x);
            }
            Mnemonic::TXA => {
                self.a = self.x;
                self.p.update_zn(self.a);
            }
            Mnemonic::TXS => self.s = self.x,
            Mnemonic::TYA => {
                self.a = self.y;
                self.p.update_zn(self.a);
            }

            // Stack
            Mnemonic::PHA => {
                let a = self.a;
                self.push(bus, a);
            }
            Mnemonic::PHP => {
                let byte = self.p.to_stack_byte(true);
                self.push(bus, byte);
            }
            Mnemonic::PLA => {
                self.a = self.pull(bus);
                self.p.update_zn(self.a);
            }
            Mnemonic::PLP => {
                let byte = self.pull(bus);
                self.p = Status::from_stack_byte(byte);
            }

            // Shifts
            Mnemonic::ASL => {
                self.modify(bus, addressing, addr, alu::asl);
            }
            Mnemonic::LSR => {
                self.modify(bus, addressing, addr, alu::lsr);
            }
            Mnemonic::ROL => {
                self.modify(bus, addressing, addr, alu::rol);
            }
            Mnemonic::ROR => {
                self.modify(bus, addressing, addr, alu::ror);
            }

            // Logic
            Mnemonic::AND => self.a = alu::and(&mut self.p, self.a, bus.read(addr)),
            Mnemonic::ORA => self.a = alu::ora(&mut self.p, self.a, bus.read(addr)),
            Mnemonic::EOR => self.a = alu::eor(&mut self.p, self.a, bus.read(addr)),
            Mnemonic::BIT => alu::bit(&mut self.p, self.a, bus.read(addr)),

            // Arithmetic
            Mnemonic::ADC => self.a = alu::adc(&mut self.p, self.a, bus.read(addr)),
            Mnemonic::SBC => self.a = alu::sbc(&mut self.p, self.a, bus.read(addr)),
            Mnemonic::CMP => alu::compare(&mut self.p, self.a, bus.read(addr)),
            Mnemonic::CPX => alu::compare(&mut self.p, self.x, bus.read(addr)),
            Mnemonic::CPY => alu::compare(&mut self.p, self.y, bus.read(addr)),
            Mnemonic::ANC => {
                self.a = alu::and(&mut self.p, self.a, bus.read(addr));
                self.p.set(Status::CARRY, self.a & 0x80 != 0);
            }
            Mnemonic::ASR => {
                let m = self.a & bus.read(addr);
                self.a = alu::lsr(&mut self.p, m);
            }
            Mnemonic::ARR => self.a = alu::arr(&mut self.p, self.a, bus.read(addr)),
            Mnemonic::SBX => self.x = alu::sbx(&mut self.p, self.a, self.x, bus.read(addr)),
            Mnemonic::XAA => {
                let m = bus.read(addr);
                self.a = alu::and(&mut self.p, (self.a | UNSTABLE_MAGIC) & self.x, m);
            }
            Mnemonic::LXA => {
                let r = alu::and(&mut self.p, self.a | UNSTABLE_MAGIC, bus.read(addr));
                self.a = r;
                self.x = r;
            }

            // Combined read-modify-write + ALU forms.
            Mnemonic::SLO => {
                let m = self.modify(bus, addressing, addr, alu::asl);
                self.a = alu::ora(&mut self.p, self.a, m);
            }
            Mnemonic::RLA => {
                let m = self.modify(bus, addressing, addr, alu::rol);
                self.a = alu::and(&mut self.p, self.a, m);
            }
            Mnemonic::SRE => {
                let m = self.modify(bus, addressing, addr, alu::lsr);
                self.a = alu::eor(&mut self.p, self.a, m);
            }
            Mnemonic::RRA => {
                let m = self.modify(bus, addressing, addr, alu::ror);
                self.a = alu::adc(&mut self.p, self.a, m);
            }
            Mnemonic::DCP => {
                let m = self.modify(bus, addressing, addr, alu::dec);
                alu::compare(&mut self.p, self.a, m);
            }
            Mnemonic::ISC => {
                let m = self.modify(bus, addressing, addr, alu::inc);
                self.a = alu::sbc(&mut self.p, self.a, m);
            }

            // Inc/dec
            Mnemonic::INC => {
                self.modify(bus, addressing, addr, alu::inc);
            }
            Mnemonic::DEC => {
                self.modify(bus, addressing, addr, alu::dec);
            }
            Mnemonic::INX => self.x = alu::inc(&mut self.p, self.x),
            Mnemonic::INY => self.y = alu::inc(&mut self.p, self.y),
            Mnemonic::DEX => self.x = alu::dec(&mut self.p, self.x),
            Mnemonic::DEY => self.y = alu::dec(&mut self.p, self.y),

            // Control flow
            Mnemonic::JMP => self.pc = addr,
            Mnemonic::JSR => {
                let ret = self.pc.wrapping_sub(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                self.pc = addr;
            }
            Mnemonic::RTS => {
                let lo = self.pull(bus) as u16;
                let hi = self.pull(bus) as u16;
                self.pc = ((hi << 8) | lo).wrapping_add(1);
            }
            Mnemonic::RTI => {
                let byte = self.pull(bus);
                self.p = Status::from_stack_byte(byte);
                // RTI restores I immediately; there is no delayed recognition.
                self.prev_p = self.p;
                let lo = self.pull(bus) as u16;
                let hi = self.pull(bus) as u16;
                self.pc = (hi << 8) | lo;
            }
            Mnemonic::BRK => {
                let ret = self.pc.wrapping_add(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                let byte = self.p.to_stack_byte(true);
                self.push(bus, byte);
                self.p.insert(Status::INTERRUPT);
                self.pc = self.read_word(bus, IRQ_VECTOR);
            }

            // Branches
            Mnemonic::BCC => taken = self.branch(!self.p.contains(Status::CARRY), addr),
            Mnemonic::BCS => taken = self.branch(self.p.contains(Status::CARRY), addr),
            Mnemonic::BNE => taken = self.branch(!self.p.contains(Status::ZERO), addr),
            Mnemonic::BEQ => taken = self.branch(self.p.contains(Status::ZERO), addr),
            Mnemonic::BPL => taken = self.branch(!self.p.contains(Status::NEGATIVE), addr),
            Mnemonic::BMI => taken = self.branch(self.p.contains(Status::NEGATIVE), addr),
            Mnemonic::BVC => taken = self.branch(!self.p.contains(Status::OVERFLOW), addr),
            Mnemonic::BVS => taken = self.branch(self.p.contains(Status::OVERFLOW), addr),

            // Flags
            Mnemonic::CLC => self.p.remove(Status::CARRY),
            Mnemonic::SEC => self.p.insert(Status::CARRY),
            Mnemonic::CLD => self.p.remove(Status::DECIMAL),
            Mnemonic::SED => self.p.insert(Status::DECIMAL),
            Mnemonic::CLI => self.p.remove(Status::INTERRUPT),
            Mnemonic::SEI => self.p.insert(Status::INTERRUPT),
            Mnemonic::CLV => self.p.remove(Status::OVERFLOW),

            Mnemonic::NOP => {
                if !matches!(addressing, Addressing::Implied) {
                    bus.read(addr);
                }
            }
            Mnemonic::JAM => {
                warn!("cpu jammed by opcode {:02x} at {:04x}", opcode, opcode_pc);
                self.jammed = true;
                self.pc = opcode_pc;
            }
        }

        timing.total(crossed, taken)
    }
}

/// Branch target and whether it lies on a different page than `pc`.
fn indexed_relative(pc: u16, offset: i8) -> (u16, bool) {
    let target = pc.wrapping_add(offset as i16 as u16);
    (target, (pc & 0xFF00) != (target & 0xFF00))
}
