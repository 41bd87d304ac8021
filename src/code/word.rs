//! Instruction word layout and decoding.
//!
//! The 16-bit word is the contract between the CPU and the external
//! assembler. Bit 0 is the least significant bit:
//!
//! | bits  | field                                                 |
//! |-------|-------------------------------------------------------|
//! | 0-2   | jump-condition selector                               |
//! | 3-5   | dest: bit 3 = memory write, 4 = D load, 5 = A load    |
//! | 6-10  | ALU control code                                      |
//! | 11    | a-bit: ALU Y operand, A register (0) or memory (1)    |
//! | 12-14 | spare, ignored                                        |
//! | 15    | type: 0 = address instruction, 1 = compute instruction|
//!
//! The decoded view exists for the boundary: validating a word before
//! it drives the instruction bus, building programs in tests, and
//! mnemonic listings. The CPU itself decodes in gates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::AluOp;

/// Bit positions within an instruction word (bit 0 = LSB).
pub mod field {
    pub const J0: usize = 0;
    pub const J1: usize = 1;
    pub const J2: usize = 2;
    /// Memory-write enable.
    pub const D0: usize = 3;
    /// D-register load enable.
    pub const D1: usize = 4;
    /// A-register load enable.
    pub const D2: usize = 5;
    pub const C0: usize = 6;
    pub const C1: usize = 7;
    pub const C2: usize = 8;
    pub const C3: usize = 9;
    pub const C4: usize = 10;
    /// Y-operand source select.
    pub const A: usize = 11;
    pub const X0: usize = 12;
    pub const X1: usize = 13;
    pub const X2: usize = 14;
    pub const TYPE: usize = 15;
}

/// Errors raised when a word cannot be resolved against the fixed
/// decode tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The 5-bit control field names no ALU function.
    #[error("control code {code:#07b} has no assigned ALU function")]
    UnknownControl { code: u8 },
}

/// Where the ALU's Y operand comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YSource {
    /// The A register.
    A,
    /// The currently addressed memory cell.
    M,
}

/// The three independent store-enable bits of a compute instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dest {
    /// Store the result in the A register.
    pub a: bool,
    /// Store the result in the D register.
    pub d: bool,
    /// Assert the memory-write signal.
    pub m: bool,
}

impl Dest {
    /// No store at all.
    pub const NONE: Dest = Dest {
        a: false,
        d: false,
        m: false,
    };

    /// Store only to the A register.
    pub const A: Dest = Dest {
        a: true,
        d: false,
        m: false,
    };

    /// Store only to the D register.
    pub const D: Dest = Dest {
        a: false,
        d: true,
        m: false,
    };

    /// Store only to memory.
    pub const M: Dest = Dest {
        a: false,
        d: false,
        m: true,
    };
}

/// Jump-condition selector, decoded from the three jump bits against
/// the ALU's zero/negative flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Jump {
    /// Never jump.
    Never = 0,
    /// Result > 0: ¬zero ∧ ¬negative.
    Jgt = 1,
    /// Result = 0: zero.
    Jeq = 2,
    /// Result ≥ 0: zero ∨ ¬negative.
    Jge = 3,
    /// Result < 0: negative.
    Jlt = 4,
    /// Result ≠ 0: ¬zero.
    Jne = 5,
    /// Result ≤ 0: zero ∨ negative.
    Jle = 6,
    /// Always jump.
    Jmp = 7,
}

impl Jump {
    /// All eight conditions, in code order.
    pub const ALL: [Jump; 8] = [
        Jump::Never,
        Jump::Jgt,
        Jump::Jeq,
        Jump::Jge,
        Jump::Jlt,
        Jump::Jne,
        Jump::Jle,
        Jump::Jmp,
    ];

    /// The 3-bit jump code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a 3-bit code. Total: every pattern names a condition.
    pub fn from_code(code: u8) -> Jump {
        Jump::ALL[(code & 0b111) as usize]
    }

    /// Whether the condition holds for the given ALU flags.
    pub fn taken(self, zero: bool, negative: bool) -> bool {
        match self {
            Jump::Never => false,
            Jump::Jgt => !zero && !negative,
            Jump::Jeq => zero,
            Jump::Jge => zero || !negative,
            Jump::Jlt => negative,
            Jump::Jne => !zero,
            Jump::Jle => zero || negative,
            Jump::Jmp => true,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Jump::Never => "",
            Jump::Jgt => ";JGT",
            Jump::Jeq => ";JEQ",
            Jump::Jge => ";JGE",
            Jump::Jlt => ";JLT",
            Jump::Jne => ";JNE",
            Jump::Jle => ";JLE",
            Jump::Jmp => ";JMP",
        }
    }
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// type = 0: load a 15-bit literal address/value into A.
    Address {
        /// The literal; the type bit cannot be part of it.
        value: u16,
    },
    /// type = 1: ALU operation with optional stores and jump.
    Compute {
        op: AluOp,
        source: YSource,
        dest: Dest,
        jump: Jump,
    },
}

/// Decode a 16-bit word.
///
/// Compute words whose control field names no ALU function are rejected;
/// no default is ever substituted. Spare bits 12-14 are ignored.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    if word & (1 << field::TYPE) == 0 {
        return Ok(Instruction::Address {
            value: word & 0x7FFF,
        });
    }
    let code = ((word >> field::C0) & 0b1_1111) as u8;
    let op = AluOp::from_code(code).ok_or(DecodeError::UnknownControl { code })?;
    let source = if word & (1 << field::A) != 0 {
        YSource::M
    } else {
        YSource::A
    };
    let dest = Dest {
        m: word & (1 << field::D0) != 0,
        d: word & (1 << field::D1) != 0,
        a: word & (1 << field::D2) != 0,
    };
    let jump = Jump::from_code((word & 0b111) as u8);
    Ok(Instruction::Compute {
        op,
        source,
        dest,
        jump,
    })
}

/// Encode an instruction back to a 16-bit word, spare bits zero.
///
/// Exact inverse of [`decode`] on the defined subset.
pub fn encode(instr: &Instruction) -> u16 {
    match *instr {
        Instruction::Address { value } => value & 0x7FFF,
        Instruction::Compute {
            op,
            source,
            dest,
            jump,
        } => {
            let mut word = 1u16 << field::TYPE;
            if source == YSource::M {
                word |= 1 << field::A;
            }
            word |= (op.code() as u16) << field::C0;
            if dest.m {
                word |= 1 << field::D0;
            }
            if dest.d {
                word |= 1 << field::D1;
            }
            if dest.a {
                word |= 1 << field::D2;
            }
            word | jump.code() as u16
        }
    }
}

fn op_mnemonic(op: AluOp, source: YSource) -> String {
    let y = match source {
        YSource::A => "A",
        YSource::M => "M",
    };
    match op {
        AluOp::Zero => "0".into(),
        AluOp::One => "1".into(),
        AluOp::X => "D".into(),
        AluOp::Y => y.into(),
        AluOp::NotX => "!D".into(),
        AluOp::NotY => format!("!{y}"),
        AluOp::NegX => "-D".into(),
        AluOp::NegY => format!("-{y}"),
        AluOp::XPlusOne => "D+1".into(),
        AluOp::YPlusOne => format!("{y}+1"),
        AluOp::XMinusOne => "D-1".into(),
        AluOp::YMinusOne => format!("{y}-1"),
        AluOp::Add => format!("D+{y}"),
        AluOp::XMinusY => format!("D-{y}"),
        AluOp::YMinusX => format!("{y}-D"),
        AluOp::Xor => format!("D^{y}"),
        AluOp::And => format!("D&{y}"),
        AluOp::Or => format!("D|{y}"),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Address { value } => write!(f, "@{value}"),
            Instruction::Compute {
                op,
                source,
                dest,
                jump,
            } => {
                if dest != Dest::NONE {
                    if dest.a {
                        write!(f, "A")?;
                    }
                    if dest.d {
                        write!(f, "D")?;
                    }
                    if dest.m {
                        write!(f, "M")?;
                    }
                    write!(f, "=")?;
                }
                write!(f, "{}{}", op_mnemonic(op, source), jump.suffix())
            }
        }
    }
}
