//! The 16-bit machine: the gate-level CPU, its data memory, and the
//! computer that clocks them together.

pub mod computer;
pub mod cpu;
pub mod memory;

pub use computer::{Computer, MachineError};
pub use cpu::{Cpu, CpuSnapshot};
pub use memory::{MemoryError, Ram, DEFAULT_RAM_SIZE};
