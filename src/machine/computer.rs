//! The whole machine: CPU, instruction ROM, data RAM, clock loop.
//!
//! The CPU owns none of this; it only exposes buses and a reset pin.
//! The computer is the collaborator on the other side: it fetches the
//! next instruction word, presents the addressed RAM cell on the
//! memory-input bus, drives the clock, and honors the store-back
//! signals after each edge.

use thiserror::Error;

use crate::code::word::{DecodeError, Instruction};
use crate::logic::WiringError;
use crate::machine::cpu::Cpu;
use crate::machine::memory::{MemoryError, Ram, DEFAULT_RAM_SIZE};

/// Errors raised while running a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// The fetched word was rejected by the decode tables. Register
    /// state is untouched for that cycle.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    /// The program counter points past the end of the loaded program.
    #[error("no instruction at address {0}")]
    NoInstruction(u16),
}

/// A CPU wired to an instruction ROM and a data RAM.
pub struct Computer {
    cpu: Cpu,
    rom: Vec<u16>,
    ram: Ram,
    cycles: u64,
}

impl Computer {
    /// Build a machine with the default RAM size.
    pub fn new() -> Result<Self, WiringError> {
        Self::with_ram_size(DEFAULT_RAM_SIZE)
    }

    /// Build a machine with `size` RAM cells.
    pub fn with_ram_size(size: usize) -> Result<Self, WiringError> {
        Ok(Self {
            cpu: Cpu::new()?,
            rom: Vec::new(),
            ram: Ram::new(size),
            cycles: 0,
        })
    }

    /// Replace the instruction ROM with a parsed listing.
    pub fn load_program(&mut self, words: &[u16]) {
        self.rom = words.to_vec();
    }

    /// The loaded program.
    pub fn program(&self) -> &[u16] {
        &self.rom
    }

    /// The CPU, for snapshots.
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// The data RAM.
    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    /// Mutable access to the data RAM, for preloading cells.
    pub fn ram_mut(&mut self) -> &mut Ram {
        &mut self.ram
    }

    /// Clock edges executed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Pulse the reset pin across one clock edge: the program counter
    /// restarts at zero; A, D and RAM keep their contents.
    pub fn reset(&mut self) {
        self.cpu.set_reset(true);
        self.cpu.step();
        self.cpu.set_reset(false);
    }

    /// Execute one clock cycle.
    ///
    /// Cells outside the RAM read as zero on the memory-input bus; only
    /// an asserted store to such a cell is an error. Returns the
    /// decoded instruction that was executed.
    pub fn step(&mut self) -> Result<Instruction, MachineError> {
        let pc = self.cpu.instruction_address();
        let word = *self
            .rom
            .get(pc as usize)
            .ok_or(MachineError::NoInstruction(pc))?;
        let instr = self.cpu.load_instruction(word)?;

        // the addressed cell rides the memory-input bus while the
        // network settles against it
        let addr = self.cpu.memory_address();
        let input = self.ram.read(addr).unwrap_or(0);
        self.cpu.set_memory_input(input);

        // capture the store-back signals before the edge commits
        let write = self.cpu.memory_write();
        let output = self.cpu.memory_output();
        self.cpu.step();
        if write {
            self.ram.write(addr, output)?;
        }
        self.cycles += 1;
        Ok(instr)
    }

    /// Run for at most `max_cycles` edges, stopping cleanly when the
    /// program counter walks past the end of the program. Returns the
    /// number of cycles executed.
    pub fn run(&mut self, max_cycles: u64) -> Result<u64, MachineError> {
        let start = self.cycles;
        while self.cycles - start < max_cycles {
            if self.rom.get(self.cpu.instruction_address() as usize).is_none() {
                break;
            }
            self.step()?;
        }
        Ok(self.cycles - start)
    }
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computer")
            .field("cycles", &self.cycles)
            .field("program_words", &self.rom.len())
            .field("ram", &self.ram)
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
    fn test_sum_two_cells() {
        // RAM[2] = RAM[0] + RAM[1]
        let program = [
            address(0),
            compute(AluOp::Y, YSource::M, Dest::D, Jump::Never),
            address(1),
            compute(AluOp::Add, YSource::M, Dest::D, Jump::Never),
            address(2),
            compute(AluOp::X, YSource::A, Dest::M, Jump::Never),
        ];
        let mut machine = Computer::with_ram_size(64).unwrap();
        machine.load_program(&program);
        machine.ram_mut().write(0, 100).unwrap();
        machine.ram_mut().write(1, 15).unwrap();

        let executed = machine.run(100).unwrap();
        assert_eq!(executed, 6);
        assert_eq!(machine.ram().read(2).unwrap(), 115);
    }

    #[test]
    fn test_counting_loop() {
        // forever: RAM[0] += 1
        let program = [
            address(0),
            compute(AluOp::YPlusOne, YSource::M, Dest::M, Jump::Never),
            address(0),
            compute(AluOp::Zero, YSource::A, Dest::NONE, Jump::Jmp),
        ];
        let mut machine = Computer::with_ram_size(16).unwrap();
        machine.load_program(&program);

        let executed = machine.run(40).unwrap();
        assert_eq!(executed, 40);
        assert_eq!(machine.ram().read(0).unwrap(), 10);
    }

    #[test]
    fn test_reset_restarts_program_without_clearing_ram() {
        let program = [
            address(0),
            compute(AluOp::YPlusOne, YSource::M, Dest::M, Jump::Never),
            address(0),
            compute(AluOp::Zero, YSource::A, Dest::NONE, Jump::Jmp),
        ];
        let mut machine = Computer::with_ram_size(16).unwrap();
        machine.load_program(&program);
        machine.run(6).unwrap();
        let counted = machine.ram().read(0).unwrap();
        assert!(counted >= 1);

        machine.reset();
        assert_eq!(machine.cpu().instruction_address(), 0);
        assert_eq!(machine.ram().read(0).unwrap(), counted);
    }

    #[test]
    fn test_straight_line_program_stops_at_rom_end() {
        let program = [address(1), address(2), address(3)];
        let mut machine = Computer::with_ram_size(16).unwrap();
        machine.load_program(&program);
        let executed = machine.run(1000).unwrap();
        assert_eq!(executed, 3);
        assert_eq!(machine.cpu().snapshot().a, 3);
    }

    #[test]
    fn test_step_past_rom_is_an_error() {
        let mut machine = Computer::with_ram_size(16).unwrap();
        machine.load_program(&[address(1)]);
        machine.step().unwrap();
        assert_eq!(machine.step(), Err(MachineError::NoInstruction(1)));
    }

    #[test]
    fn test_rejected_word_reported_per_cycle() {
        // an unassigned control code in the middle of a program
        let bad = 0x8000u16 | (20 << 6);
        let mut machine = Computer::with_ram_size(16).unwrap();
        machine.load_program(&[address(5), bad]);
        machine.step().unwrap();
        let before = machine.cpu().snapshot();
        let err = machine.step();
        assert!(matches!(err, Err(MachineError::Decode(_))));
        // the invalid cycle latched nothing
        let after = machine.cpu().snapshot();
        assert_eq!(before.a, after.a);
        assert_eq!(before.d, after.d);
        assert_eq!(before.pc, after.pc);
    }

    #[test]
    fn test_memory_input_defaults_to_zero_outside_ram() {
        // A points far outside the 16-cell RAM; D = M reads 0
        let program = [
            address(10_000),
            compute(AluOp::YPlusOne, YSource::M, Dest::D, Jump::Never),
        ];
        let mut machine = Computer::with_ram_size(16).unwrap();
        machine.load_program(&program);
        machine.run(2).unwrap();
        assert_eq!(machine.cpu().snapshot().d, 1);
    }
}
