//! Circuit-simulation engine.
//!
//! Leaf-to-root: signals and buses, boolean gate primitives, the N-way
//! selector, the ALU, and the clocked register/counter parts. All of it
//! lives in a [`Circuit`], which separates combinational settling
//! (instant, fixpoint) from sequential state (moves only on a clock
//! edge).

pub mod alu;
pub mod circuit;
pub mod gates;
pub mod seq;
pub mod signal;

pub use alu::{Alu, AluOp, CONTROL_WIDTH};
pub use circuit::{Circuit, WiringError};
pub use seq::{Counter, Register};
pub use signal::{Bus, SignalId, WORD_WIDTH};
