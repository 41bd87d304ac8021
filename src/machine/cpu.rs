//! The CPU: one ALU, the A and D registers, the program counter, and
//! the decode gate network that ties them together.
//!
//! Every control decision (which register loads, which ALU function
//! runs, whether the counter jumps) is the output of a combinational
//! network evaluated from the instruction word, not a branch in code.
//! The network is wired once at construction; afterwards only signal
//! values and register contents change, once per clock edge.
//!
//! The public surface is the boundary buses, the reset pin and a
//! read-only [`CpuSnapshot`]; the internal gates are private
//! composition.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::code::word::{decode, field, DecodeError, Instruction};
use crate::logic::{Alu, Bus, Circuit, Counter, Register, SignalId, WiringError, WORD_WIDTH};

/// The gate-level CPU.
pub struct Cpu {
    circuit: Circuit,

    // boundary inputs
    instruction: Bus,
    memory_input: Bus,
    reset: SignalId,

    // boundary outputs
    memory_output: Bus,
    memory_address: Bus,
    instruction_address: Bus,
    memory_write: SignalId,

    // kept for the diagnostic snapshot
    a: Register,
    d: Register,
    pc: Counter,
    alu: Alu,
}

/// Read-only diagnostic view of the CPU, taken between edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    /// A register.
    pub a: u16,
    /// D register.
    pub d: u16,
    /// Program counter.
    pub pc: u16,
    /// Settled ALU result for the current inputs.
    pub alu_out: i16,
    /// ALU zero flag.
    pub zero: bool,
    /// ALU negative flag.
    pub negative: bool,
    /// Whether the memory-write signal is asserted.
    pub memory_write: bool,
    /// The instruction word currently on the bus.
    pub instruction: u16,
}

impl fmt::Display for CpuSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instr = match decode(self.instruction) {
            Ok(i) => i.to_string(),
            Err(_) => "???".to_string(),
        };
        write!(
            f,
            "PC={} A={} D={} ALU={} ins={}",
            self.pc, self.a as i16, self.d as i16, self.alu_out, instr
        )
    }
}

impl Cpu {
    /// Build the CPU circuit. The wiring is fixed for the lifetime of
    /// the value.
    pub fn new() -> Result<Self, WiringError> {
        let mut c = Circuit::new();

        let instruction = c.bus(WORD_WIDTH);
        let memory_input = c.bus(WORD_WIDTH);
        let reset = c.signal();

        let a = c.register(WORD_WIDTH);
        let d = c.register(WORD_WIDTH);
        let pc = c.counter(WORD_WIDTH);
        let alu = c.alu(WORD_WIDTH);

        let type_bit = instruction.signal(field::TYPE);
        let a_bit = instruction.signal(field::A);

        // A register input: the instruction word itself for an address
        // instruction, the ALU result for a compute instruction.
        let a_in = c.mux(&instruction, &alu.output, type_bit)?;
        c.connect_bus(&a.input, &a_in)?;

        // ALU operands. The Y mux select is gated with the type bit:
        // an address instruction never consults the a-bit.
        let y_select = c.and_gate(a_bit, type_bit);
        let y_in = c.mux(&a.output, &memory_input, y_select)?;
        c.connect_bus(&alu.x, &d.output)?;
        c.connect_bus(&alu.y, &y_in)?;
        c.connect_bus(&alu.control, &instruction.slice(field::C0..field::C4 + 1))?;

        // Store enables. A loads on every address instruction, or on a
        // compute instruction that names it as a destination.
        let d_load = c.and_gate(type_bit, instruction.signal(field::D1));
        c.connect(d.load, d_load)?;
        let a_store = c.and_gate(type_bit, instruction.signal(field::D2));
        let not_type = c.not_gate(type_bit);
        let a_load = c.or_gate(not_type, a_store);
        c.connect(a.load, a_load)?;

        // Jump decode: the eight conditions over the ALU flags, one
        // selected by the jump field, honored only for compute words.
        let not_zero = c.not_gate(alu.zero);
        let not_negative = c.not_gate(alu.negative);
        let never = c.constant(false);
        let always = c.constant(true);
        let gt = c.and_gate(not_zero, not_negative);
        let ge = c.or_gate(alu.zero, not_negative);
        let le = c.or_gate(alu.zero, alu.negative);
        let conditions = [
            never,
            gt,
            alu.zero,
            ge,
            alu.negative,
            not_zero,
            le,
            always,
        ];
        let jump_field = instruction.slice(field::J0..field::J2 + 1);
        let condition = c.selector(&conditions, &jump_field)?;
        let pc_load = c.and_gate(type_bit, condition);
        c.connect(pc.load, pc_load)?;
        c.connect_bus(&pc.input, &a.output)?;
        c.connect(pc.reset, reset)?;

        // Boundary outputs. MemoryOutput always mirrors the ALU result
        // and MemoryAddress the A register; downstream memory decides
        // whether to honor them based on MemoryWrite.
        let memory_output = c.bus(WORD_WIDTH);
        c.connect_bus(&memory_output, &alu.output)?;
        let memory_address = c.bus(WORD_WIDTH);
        c.connect_bus(&memory_address, &a.output)?;
        let instruction_address = c.bus(WORD_WIDTH);
        c.connect_bus(&instruction_address, &pc.output)?;
        let memory_write = c.signal();
        let write_enable = c.and_gate(type_bit, instruction.signal(field::D0));
        c.connect(memory_write, write_enable)?;

        c.settle();

        Ok(Self {
            circuit: c,
            instruction,
            memory_input,
            reset,
            memory_output,
            memory_address,
            instruction_address,
            memory_write,
            a,
            d,
            pc,
            alu,
        })
    }

    /// Put an instruction word on the bus and let the network settle.
    ///
    /// The word is validated against the decode tables first; a
    /// rejected word drives nothing, so the cycle's latch is suppressed
    /// rather than silently applied. Returns the decoded view.
    pub fn load_instruction(&mut self, word: u16) -> Result<Instruction, DecodeError> {
        let decoded = decode(word)?;
        self.circuit.set_bus(&self.instruction, word);
        self.circuit.settle();
        Ok(decoded)
    }

    /// Present the currently addressed memory cell's value.
    pub fn set_memory_input(&mut self, value: u16) {
        self.circuit.set_bus(&self.memory_input, value);
        self.circuit.settle();
    }

    /// Drive the reset pin. Takes effect at the next edge: the program
    /// counter goes to zero regardless of the jump decode. A, D and
    /// memory are unaffected by reset itself.
    pub fn set_reset(&mut self, on: bool) {
        self.circuit.set(self.reset, on);
        self.circuit.settle();
    }

    /// One clock cycle: the network settles against the current
    /// register outputs, then every register and the counter commit
    /// their next values simultaneously.
    pub fn step(&mut self) {
        self.circuit.clock();
    }

    /// The store-enable output.
    pub fn memory_write(&self) -> bool {
        self.circuit.get(self.memory_write)
    }

    /// The value to store; mirrors the ALU result.
    pub fn memory_output(&self) -> u16 {
        self.circuit.read_bus(&self.memory_output)
    }

    /// The address to store to / load from; mirrors the A register.
    pub fn memory_address(&self) -> u16 {
        self.circuit.read_bus(&self.memory_address)
    }

    /// The next instruction's address; mirrors the program counter.
    pub fn instruction_address(&self) -> u16 {
        self.circuit.read_bus(&self.instruction_address)
    }

    /// Take a diagnostic snapshot of the settled state.
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            a: self.circuit.read_bus(&self.a.output),
            d: self.circuit.read_bus(&self.d.output),
            pc: self.circuit.read_bus(&self.pc.output),
            alu_out: self.circuit.read_bus_signed(&self.alu.output),
            zero: self.circuit.get(self.alu.zero),
            negative: self.circuit.get(self.alu.negative),
            memory_write: self.memory_write(),
            instruction: self.circuit.read_bus(&self.instruction),
        }
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("circuit", &self.circuit)
            .field("state", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::word::{encode, Dest, Jump, YSource};
    use crate::logic::AluOp;

    fn compute(op: AluOp, source: YSource, dest: Dest, jump: Jump) -> u16 {
        encode(&Instruction::Compute {
            op,
            source,
            dest,
            jump,
        })
    }

    fn address(value: u16) -> u16 {
        encode(&Instruction::Address { value })
    }

    #[test]
    fn test_address_instruction_loads_a() {
        let mut cpu = Cpu::new().unwrap();
        cpu.load_instruction(address(5)).unwrap();
        cpu.step();
        let snap = cpu.snapshot();
        assert_eq!(snap.a, 5);
        assert_eq!(snap.d, 0);
        assert_eq!(snap.pc, 1);
    }

    #[test]
    fn test_bump_a_in_place() {
        let mut cpu = Cpu::new().unwrap();
        cpu.load_instruction(address(41)).unwrap();
        cpu.step();
        cpu.load_instruction(compute(AluOp::YPlusOne, YSource::A, Dest::A, Jump::Never))
            .unwrap();
        cpu.step();
        let snap = cpu.snapshot();
        assert_eq!(snap.a, 42);
        assert_eq!(snap.d, 0);
        assert!(!snap.memory_write);
        assert_eq!(snap.pc, 2);
    }

    #[test]
    fn test_jump_on_zero_d() {
        // D holds 0, so D;JEQ must land on the A-register address
        let mut cpu = Cpu::new().unwrap();
        cpu.load_instruction(address(7)).unwrap();
        cpu.step();
        cpu.load_instruction(compute(AluOp::X, YSource::A, Dest::NONE, Jump::Jeq))
            .unwrap();
        cpu.step();
        assert_eq!(cpu.instruction_address(), 7);
    }

    #[test]
    fn test_reset_forces_pc_to_zero_only() {
        let mut cpu = Cpu::new().unwrap();
        cpu.load_instruction(address(9)).unwrap();
        cpu.step();
        cpu.load_instruction(compute(AluOp::One, YSource::A, Dest::D, Jump::Jmp))
            .unwrap();
        cpu.step();
        assert_eq!(cpu.instruction_address(), 9);
        let d_before = cpu.snapshot().d;

        // reset overrides the taken jump; the rest of the cycle's
        // decode still applies to A and D
        cpu.set_reset(true);
        cpu.step();
        cpu.set_reset(false);
        let snap = cpu.snapshot();
        assert_eq!(snap.pc, 0);
        assert_eq!(snap.a, 9);
        assert_eq!(snap.d, d_before);
    }

    #[test]
    fn test_d_register_loads_alu_result() {
        let mut cpu = Cpu::new().unwrap();
        cpu.load_instruction(address(21)).unwrap();
        cpu.step();
        // D = A
        cpu.load_instruction(compute(AluOp::Y, YSource::A, Dest::D, Jump::Never))
            .unwrap();
        cpu.step();
        // D = D + A
        cpu.load_instruction(compute(AluOp::Add, YSource::A, Dest::D, Jump::Never))
            .unwrap();
        cpu.step();
        assert_eq!(cpu.snapshot().d, 42);
    }

    #[test]
    fn test_memory_operand_selected_by_a_bit() {
        let mut cpu = Cpu::new().unwrap();
        cpu.load_instruction(address(3)).unwrap();
        cpu.step();
        cpu.set_memory_input(1000);
        // D = M reads the memory input, not the A register
        cpu.load_instruction(compute(AluOp::Y, YSource::M, Dest::D, Jump::Never))
            .unwrap();
        cpu.step();
        assert_eq!(cpu.snapshot().d, 1000);
        // D = A goes back to the register
        cpu.load_instruction(compute(AluOp::Y, YSource::A, Dest::D, Jump::Never))
            .unwrap();
        cpu.step();
        assert_eq!(cpu.snapshot().d, 3);
    }

    #[test]
    fn test_memory_write_gated_by_type_and_dest() {
        let mut cpu = Cpu::new().unwrap();
        // an address instruction never writes, whatever its low bits say
        cpu.load_instruction(address(0b101_1010_1010_1010)).unwrap();
        assert!(!cpu.memory_write());
        cpu.step();

        cpu.load_instruction(compute(AluOp::One, YSource::A, Dest::M, Jump::Never))
            .unwrap();
        assert!(cpu.memory_write());
        assert_eq!(cpu.memory_output(), 1);
        assert_eq!(cpu.memory_address(), 0b101_1010_1010_1010);
    }

    #[test]
    fn test_rejected_word_latches_nothing() {
        let mut cpu = Cpu::new().unwrap();
        cpu.load_instruction(address(5)).unwrap();
        cpu.step();
        let before = cpu.snapshot();

        // type=1 with unassigned control code 25
        let bad = (1u16 << field::TYPE) | (25u16 << field::C0) | (1u16 << field::D2);
        assert!(cpu.load_instruction(bad).is_err());
        let after = cpu.snapshot();
        assert_eq!(before, after);
    }

    #[test]
    fn test_jump_conditions_against_flags() {
        // d = -1, 0, +1 exercises the three reachable flag patterns
        for (d, zero, negative) in [(-1i16, false, true), (0, true, false), (1, false, false)] {
            for jump in Jump::ALL {
                let mut cpu = Cpu::new().unwrap();
                // D starts at 0; one compute word reaches -1, 0 or +1
                let setup = match d {
                    1 => AluOp::XPlusOne,
                    -1 => AluOp::XMinusOne,
                    _ => AluOp::Zero,
                };
                cpu.load_instruction(compute(setup, YSource::A, Dest::D, Jump::Never))
                    .unwrap();
                cpu.step();
                cpu.load_instruction(address(100)).unwrap();
                cpu.step();
                cpu.load_instruction(compute(AluOp::X, YSource::A, Dest::NONE, jump))
                    .unwrap();
                let snap = cpu.snapshot();
                assert_eq!(snap.zero, zero);
                assert_eq!(snap.negative, negative);
                cpu.step();
                let expected = if jump.taken(zero, negative) { 100 } else { 3 };
                assert_eq!(
                    cpu.instruction_address(),
                    expected,
                    "{jump:?} with D={d}"
                );
            }
        }
    }

    #[test]
    fn test_snapshot_reads_are_idempotent() {
        let mut cpu = Cpu::new().unwrap();
        cpu.load_instruction(address(5)).unwrap();
        let first = cpu.snapshot();
        assert_eq!(cpu.snapshot(), first);
        assert_eq!(cpu.snapshot(), first);
    }
}
