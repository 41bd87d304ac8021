//! # Hack-16 Emulator
//!
//! A gate-level simulator of the 16-bit Hack-style computer.
//!
//! The CPU here is not decoded imperatively: it is assembled from wires,
//! buses and boolean gates, and every control decision is the settled
//! output of that combinational network. Registers and the program
//! counter are the only stateful parts, committing once per clock edge.

pub mod code;
pub mod logic;
pub mod machine;

// Re-export commonly used types
pub use code::{
    decode, disassemble, encode, load_listing, parse_listing, parse_word, DecodeError, Dest,
    Instruction, Jump, ListingError, YSource,
};
pub use logic::{Alu, AluOp, Bus, Circuit, Counter, Register, SignalId, WiringError, WORD_WIDTH};
pub use machine::{Computer, Cpu, CpuSnapshot, MachineError, MemoryError, Ram};
